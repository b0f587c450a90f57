//! Bounded budget for consecutive transport fetch failures.

/// Counts down on each consecutive failure; any success refills it.
/// `consume` returns `false` once the budget is already spent, which is the
/// caller's signal to give up.
#[derive(Debug)]
pub struct RetryBudget {
    max: u32,
    left: u32,
}

impl RetryBudget {
    pub fn new(max: u32) -> Self {
        Self { max, left: max }
    }

    pub fn consume(&mut self) -> bool {
        if self.left == 0 {
            return false;
        }
        self.left -= 1;
        true
    }

    pub fn reset(&mut self) {
        self.left = self.max;
    }

    pub fn remaining(&self) -> u32 {
        self.left
    }
}
