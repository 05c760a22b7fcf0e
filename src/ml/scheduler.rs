/// Polynomial learning-rate decay.
///
///   lr(t) = base · (1 − t / T)^power
///
/// `t` counts optimiser steps across the whole run and saturates at
/// `T`, so the rate reaches 0 exactly at the end of training.
#[derive(Debug, Clone)]
pub struct PolyLr {
    base_lr:     f64,
    total_iters: usize,
    power:       f64,
    iter:        usize,
}

impl PolyLr {
    pub const DEFAULT_POWER: f64 = 0.9;

    pub fn new(base_lr: f64, epochs: usize, iters_per_epoch: usize) -> Self {
        Self {
            base_lr,
            total_iters: epochs * iters_per_epoch,
            power:       Self::DEFAULT_POWER,
            iter:        0,
        }
    }

    /// Continue the curve from the first iteration of `epoch`.
    pub fn starting_at(mut self, epoch: usize, iters_per_epoch: usize) -> Self {
        self.iter = (epoch * iters_per_epoch).min(self.total_iters);
        self
    }

    pub fn iteration(&self) -> usize {
        self.iter
    }

    /// Rate for the current iteration
    pub fn lr(&self) -> f64 {
        if self.total_iters == 0 {
            return self.base_lr;
        }
        let progress = self.iter.min(self.total_iters) as f64 / self.total_iters as f64;
        self.base_lr * (1.0 - progress).powf(self.power)
    }

    /// Return the rate for this iteration, then advance.
    pub fn step(&mut self) -> f64 {
        let lr = self.lr();
        self.iter = (self.iter + 1).min(self.total_iters);
        lr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_base_and_decays_to_zero() {
        let mut s = PolyLr::new(0.01, 2, 5);
        assert!((s.step() - 0.01).abs() < 1e-12);

        let mut last = 0.01;
        for _ in 1..10 {
            let lr = s.step();
            assert!(lr < last);
            last = lr;
        }
        assert_eq!(s.iteration(), 10);
        assert_eq!(s.lr(), 0.0);
        assert_eq!(s.step(), 0.0);
    }

    #[test]
    fn test_midpoint_value() {
        let s = PolyLr::new(1.0, 10, 10).starting_at(5, 10);
        assert_eq!(s.iteration(), 50);
        assert!((s.lr() - 0.5f64.powf(0.9)).abs() < 1e-12);
    }

    #[test]
    fn test_resume_clamps_past_end() {
        let s = PolyLr::new(1.0, 3, 4).starting_at(7, 4);
        assert_eq!(s.iteration(), 12);
        assert_eq!(s.lr(), 0.0);
    }

    #[test]
    fn test_empty_schedule_keeps_base_rate() {
        let mut s = PolyLr::new(0.001, 5, 0);
        assert_eq!(s.step(), 0.001);
        assert_eq!(s.lr(), 0.001);
    }
}
