//! Linear opacity fade schedule

use std::time::Duration;

/// Fixed-step linear interpolation between two opacity factors
///
/// Purely descriptive: the controller walks `values()` and issues one
/// material update per step. The final step lands exactly on the target, so
/// abandoning a fade early and snapping to `target()` yields the same end
/// state as playing it out.
#[derive(Debug, Clone, PartialEq)]
pub struct FadePlan {
    from: f64,
    to: f64,
    steps: u32,
}

impl FadePlan {
    pub fn new(from: f64, to: f64, steps: u32) -> Self {
        Self {
            from,
            to,
            steps: steps.max(1),
        }
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn target(&self) -> f64 {
        self.to
    }

    /// Factor after `step` increments; saturates at the target
    pub fn value_at(&self, step: u32) -> f64 {
        if step >= self.steps {
            return self.to;
        }
        self.from + (self.to - self.from) * f64::from(step) / f64::from(self.steps)
    }

    /// Even per-step interval for a total fade duration
    pub fn step_interval(&self, total: Duration) -> Duration {
        total / self.steps
    }

    /// Step values in order, ending exactly on the target
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        (1..=self.steps).map(|step| self.value_at(step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midpoint_is_linear() {
        let plan = FadePlan::new(1.0, 0.03, 30);
        let expected = 1.0 + (0.03 - 1.0) * 15.0 / 30.0;
        assert!((plan.value_at(15) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_final_step_hits_target_exactly() {
        let plan = FadePlan::new(1.0, 0.03, 30);
        assert_eq!(plan.value_at(30), 0.03);
        assert_eq!(plan.values().last().unwrap(), 0.03);
    }

    #[test]
    fn test_value_count_matches_steps() {
        let plan = FadePlan::new(0.03, 1.0, 12);
        assert_eq!(plan.values().count(), 12);
    }

    #[test]
    fn test_zero_steps_snap_to_target() {
        let plan = FadePlan::new(1.0, 0.5, 0);
        assert_eq!(plan.steps(), 1);
        assert_eq!(plan.value_at(1), 0.5);
    }

    #[test]
    fn test_step_interval_divides_duration() {
        let plan = FadePlan::new(1.0, 0.0, 30);
        assert_eq!(
            plan.step_interval(Duration::from_millis(600)),
            Duration::from_millis(20)
        );
    }
}
