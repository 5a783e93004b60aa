//! Archive of non-dominated solutions.

use crate::model::Allocation;

#[derive(Clone, Debug, PartialEq)]
pub struct ArchivedPoint {
    pub allocation: Allocation,
    pub costs: Vec<f64>,
}

/// Returns true if `a` is not worse than `b` in every objective and better in at least one.
pub fn dominates(a: &[f64], b: &[f64]) -> bool {
    a.iter().zip(b).all(|(x, y)| x <= y) && a.iter().zip(b).any(|(x, y)| x < y)
}

#[derive(Clone, Debug, Default)]
pub struct ParetoArchive {
    points: Vec<ArchivedPoint>,
}

impl ParetoArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the point unless it is dominated by or equal in costs to an archived one. Archived points dominated by
    /// the new one are dropped.
    pub fn insert(&mut self, allocation: Allocation, costs: Vec<f64>) -> bool {
        if self
            .points
            .iter()
            .any(|p| p.costs == costs || dominates(&p.costs, &costs))
        {
            return false;
        }
        self.points.retain(|p| !dominates(&costs, &p.costs));
        self.points.push(ArchivedPoint { allocation, costs });
        true
    }

    pub fn merge(&mut self, other: ParetoArchive) {
        for point in other.points {
            self.insert(point.allocation, point.costs);
        }
    }

    pub fn points(&self) -> &[ArchivedPoint] {
        &self.points
    }

    pub fn allocations(&self) -> Vec<Allocation> {
        self.points.iter().map(|p| p.allocation.clone()).collect()
    }

    pub fn costs(&self) -> Vec<Vec<f64>> {
        self.points.iter().map(|p| p.costs.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}
