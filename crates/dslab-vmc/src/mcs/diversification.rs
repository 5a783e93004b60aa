//! Diversification paths.
//!
//! A path fixes the values of a prefix of a small set of heavy soft literals. Paths are explored with iterative
//! deepening: all `2^d` paths of depth `d` are visited before depth `d + 1`, so successive searches are directed to
//! different regions of the Pareto front. The current path is kept as an explicit stack of frames, a frame remembers
//! whether both values of its literal were already generated.

use crate::solver::Lit;

#[derive(Clone, Copy, Debug)]
struct Frame {
    lit: Lit,
    both_generated: bool,
}

pub struct DiversificationPaths {
    lits: Vec<Lit>,
    depth: usize,
    stack: Vec<Frame>,
    started: bool,
    dead: Vec<Vec<Lit>>,
    results: Vec<(Vec<Lit>, bool)>,
}

impl DiversificationPaths {
    pub fn new(lits: Vec<Lit>) -> Self {
        Self {
            lits,
            depth: 1,
            stack: Vec::new(),
            started: false,
            dead: Vec::new(),
            results: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the next path which does not extend a dead prefix, `None` when all depths are explored.
    pub fn next_path(&mut self) -> Option<Vec<Lit>> {
        loop {
            if self.depth > self.lits.len() {
                return None;
            }
            if !self.started {
                self.stack.clear();
                self.started = true;
            } else if !self.next_sibling() {
                self.depth += 1;
                self.started = false;
                continue;
            }
            while self.stack.len() < self.depth {
                self.stack.push(Frame {
                    lit: self.lits[self.stack.len()],
                    both_generated: false,
                });
            }
            let path: Vec<Lit> = self.stack.iter().map(|frame| frame.lit).collect();
            if !self.is_dead(&path) {
                return Some(path);
            }
        }
    }

    /// Unsatisfiable prefix, none of its extensions is generated anymore.
    pub fn mark_dead(&mut self, prefix: Vec<Lit>) {
        if !prefix.is_empty() && !self.is_dead(&prefix) {
            self.dead.push(prefix);
        }
    }

    pub fn record(&mut self, path: Vec<Lit>, found: bool) {
        self.results.push((path, found));
    }

    /// Visited paths and whether a solution was found under each of them.
    pub fn results(&self) -> &[(Vec<Lit>, bool)] {
        &self.results
    }

    fn is_dead(&self, path: &[Lit]) -> bool {
        self.dead.iter().any(|prefix| path.starts_with(prefix))
    }

    fn next_sibling(&mut self) -> bool {
        while let Some(frame) = self.stack.pop() {
            if !frame.both_generated {
                self.stack.push(Frame {
                    lit: !frame.lit,
                    both_generated: true,
                });
                return true;
            }
        }
        false
    }
}
