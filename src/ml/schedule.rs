// ============================================================
// Layer 5 — Step-decay learning-rate schedule
// ============================================================
//   lr(epoch) = base_lr × gamma ^ ⌊epoch / step_size⌋
//
// Constant inside an epoch, non-increasing for gamma ≤ 1.

use anyhow::{bail, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepDecay {
    base_lr:   f64,
    step_size: usize,
    gamma:     f64,
}

impl StepDecay {
    pub fn new(base_lr: f64, step_size: usize, gamma: f64) -> Result<Self> {
        if step_size == 0 {
            bail!("scheduler_step_size must be at least 1");
        }
        if !(base_lr > 0.0 && base_lr.is_finite()) {
            bail!("learning rate must be a positive number (got {base_lr})");
        }
        if !(gamma > 0.0 && gamma.is_finite()) {
            bail!("scheduler_gamma must be a positive number (got {gamma})");
        }
        Ok(Self { base_lr, step_size, gamma })
    }

    /// Number of completed decay intervals at `epoch`
    pub fn intervals(&self, epoch: usize) -> usize {
        epoch / self.step_size
    }

    pub fn lr_at(&self, epoch: usize) -> f64 {
        self.base_lr * self.gamma.powi(self.intervals(epoch) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decays_every_step_size_epochs() {
        let s = StepDecay::new(1e-3, 200, 0.5).unwrap();
        assert_eq!(s.lr_at(0), 1e-3);
        assert_eq!(s.lr_at(199), 1e-3);
        assert_eq!(s.lr_at(200), 1e-3 * 0.5);
        assert_eq!(s.lr_at(450), 1e-3 * 0.5f64.powi(2));
    }

    #[test]
    fn k_intervals_is_exact_power() {
        for step in [1usize, 3, 7] {
            let s = StepDecay::new(0.1, step, 0.9).unwrap();
            for k in 0..10 {
                assert_eq!(s.lr_at(k * step), 0.1 * 0.9f64.powi(k as i32));
            }
        }
    }

    #[test]
    fn never_increases() {
        let s = StepDecay::new(2e-4, 2, 0.1).unwrap();
        let lrs: Vec<f64> = (0..20).map(|e| s.lr_at(e)).collect();
        assert!(lrs.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn zero_step_size_is_rejected() {
        assert!(StepDecay::new(1e-3, 0, 0.5).is_err());
    }
}
