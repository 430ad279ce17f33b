use {
    crate::aggregator::state::DashboardState,
    log::{info, warn},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertEvent {
    /// Uptime dropped below the threshold.
    Raised { uptime: f64, threshold: f64 },
    /// Uptime is back at or above the threshold.
    Cleared { uptime: f64, threshold: f64 },
}

/// Raises once when uptime crosses below the threshold and clears once it recovers.
#[derive(Debug)]
pub struct UptimeAlert {
    threshold: f64,
    active: bool,
}

impl UptimeAlert {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            active: false,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    pub fn evaluate(&mut self, uptime: f64) -> Option<AlertEvent> {
        let below = uptime < self.threshold;
        match (below, self.active) {
            (true, false) => {
                self.active = true;
                warn!(
                    "ALERT: validator uptime {:.2}% is below threshold {:.2}%",
                    uptime, self.threshold
                );
                Some(AlertEvent::Raised {
                    uptime,
                    threshold: self.threshold,
                })
            }
            (false, true) => {
                self.active = false;
                info!(
                    "Validator uptime recovered to {:.2}% (threshold {:.2}%)",
                    uptime, self.threshold
                );
                Some(AlertEvent::Cleared {
                    uptime,
                    threshold: self.threshold,
                })
            }
            _ => None,
        }
    }

    /// Only evaluates states that carry data for a found validator.
    pub fn observe(&mut self, state: &DashboardState) -> Option<AlertEvent> {
        let validator = state.snapshot.validator.as_ref()?;
        self.evaluate(validator.performance.uptime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raises_once_and_clears() {
        let mut alert = UptimeAlert::new(95.0);

        assert_eq!(alert.evaluate(99.0), None);
        assert_eq!(
            alert.evaluate(90.0),
            Some(AlertEvent::Raised {
                uptime: 90.0,
                threshold: 95.0
            })
        );
        // still below: no repeat
        assert_eq!(alert.evaluate(80.0), None);
        assert!(matches!(alert.evaluate(95.0), Some(AlertEvent::Cleared { .. })));
        assert_eq!(alert.evaluate(96.0), None);
    }

    #[test]
    fn test_state_without_validator_is_ignored() {
        let mut alert = UptimeAlert::new(95.0);
        assert_eq!(alert.observe(&DashboardState::default()), None);
        assert_eq!(alert.evaluate(99.0), None);
    }

    #[test]
    fn test_threshold_change_applies_on_next_evaluation() {
        let mut alert = UptimeAlert::new(90.0);
        assert_eq!(alert.evaluate(92.0), None);
        alert.set_threshold(95.0);
        assert_eq!(alert.threshold(), 95.0);
        assert!(matches!(alert.evaluate(92.0), Some(AlertEvent::Raised { .. })));
    }
}
