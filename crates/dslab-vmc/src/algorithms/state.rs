use log::info;

use crate::algorithms::archive::ParetoArchive;
use crate::algorithms::clock::Clock;
use crate::algorithms::progress::ProgressLog;
use crate::error::Result;
use crate::model::Allocation;

/// State of a single algorithm run: deadline, best cost per objective and the archive of non-dominated points.
pub struct AlgorithmState {
    pub clock: Clock,
    archive: ParetoArchive,
    best_costs: Vec<f64>,
    progress: Option<ProgressLog>,
    discovered: usize,
}

impl AlgorithmState {
    pub fn new(clock: Clock, progress: Option<ProgressLog>) -> Self {
        Self {
            clock,
            archive: ParetoArchive::new(),
            best_costs: Vec::new(),
            progress,
            discovered: 0,
        }
    }

    /// Records a feasible point, returns true if it entered the archive.
    pub fn record(&mut self, allocation: Allocation, costs: Vec<f64>) -> Result<bool> {
        self.discovered += 1;
        if self.best_costs.is_empty() {
            self.best_costs = costs.clone();
        } else {
            for (best, cost) in self.best_costs.iter_mut().zip(&costs) {
                *best = best.min(*cost);
            }
        }
        let inserted = self.archive.insert(allocation, costs.clone());
        if inserted {
            info!(
                "[{:.3}s] non-dominated point {:?}, archive size {}",
                self.clock.elapsed(),
                costs,
                self.archive.len()
            );
        }
        if let Some(progress) = self.progress.as_mut() {
            progress.point(&costs)?;
        }
        Ok(inserted)
    }

    pub fn found_solution(&self) -> bool {
        self.discovered > 0
    }

    pub fn discovered(&self) -> usize {
        self.discovered
    }

    pub fn best_costs(&self) -> &[f64] {
        &self.best_costs
    }

    pub fn archive(&self) -> &ParetoArchive {
        &self.archive
    }

    /// Returns the archive, the best costs and the progress sink, consuming the state.
    pub fn finish(self) -> (ParetoArchive, Vec<f64>, Option<ProgressLog>) {
        (self.archive, self.best_costs, self.progress)
    }
}
