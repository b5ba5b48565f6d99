use async_trait::async_trait;
use rand::Rng;

use crate::claim::ClaimData;

/// Source of the damage cost estimate fed into the recommendation step
#[async_trait]
pub trait DamageEstimator: Send + Sync {
    async fn estimate_damage(&self, claim: &ClaimData) -> f64;
}

/// Stand-in estimator that samples uniformly from a plausible repair-cost range.
///
/// Replace with a real estimator (image analysis, repair shop quotes) behind [`DamageEstimator`].
#[derive(Debug, Clone, Copy)]
pub struct UniformDamageEstimator {
    min: f64,
    max: f64,
}

impl UniformDamageEstimator {
    pub fn new(min: f64, max: f64) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min: min.max(0.0),
            max: max.max(0.0),
        }
    }
}

impl Default for UniformDamageEstimator {
    fn default() -> Self {
        Self::new(500.0, 3000.0)
    }
}

#[async_trait]
impl DamageEstimator for UniformDamageEstimator {
    async fn estimate_damage(&self, _claim: &ClaimData) -> f64 {
        if self.min == self.max {
            return self.min;
        }
        rand::rng().random_range(self.min..self.max)
    }
}

/// Always returns the same estimate
#[derive(Debug, Clone, Copy)]
pub struct FixedDamageEstimator(pub f64);

#[async_trait]
impl DamageEstimator for FixedDamageEstimator {
    async fn estimate_damage(&self, _claim: &ClaimData) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn claim() -> ClaimData {
        ClaimData {
            policy_number: "POL-1".to_string(),
            claimant_name: "Jane Smith".to_string(),
            incident_date: Utc::now(),
            incident_description: "Rear bumper dented".to_string(),
        }
    }

    #[tokio::test]
    async fn test_uniform_estimates_stay_in_range() {
        let estimator = UniformDamageEstimator::default();
        let claim = claim();
        for _ in 0..200 {
            let estimate = estimator.estimate_damage(&claim).await;
            assert!((500.0..3000.0).contains(&estimate), "{estimate} out of range");
        }
    }

    #[tokio::test]
    async fn test_degenerate_range_returns_bound() {
        let estimator = UniformDamageEstimator::new(750.0, 750.0);
        assert_eq!(estimator.estimate_damage(&claim()).await, 750.0);
    }

    #[tokio::test]
    async fn test_fixed_estimator() {
        assert_eq!(FixedDamageEstimator(1234.5).estimate_damage(&claim()).await, 1234.5);
    }
}
