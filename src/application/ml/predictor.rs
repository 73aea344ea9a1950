use crate::domain::errors::ModelError;
use crate::domain::ml::feature_registry::FeatureVector;
use std::sync::Arc;
use tracing::{info, warn};

/// Interface for the probability model scoring PO3 candidates
pub trait ProbabilityModel: Send + Sync {
    /// Probability of the candidate hitting its target, in [0, 1]
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError>;

    /// Get model name/type
    fn name(&self) -> &str;

    /// Get model version/id
    fn version(&self) -> &str;
}

/// Outcome of consulting the gate for one candidate
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Approved { probability: f64 },
    Rejected { probability: f64 },
    /// Model missing or misbehaving; the trade is not taken
    Failed { error: ModelError },
}

impl GateDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, GateDecision::Approved { .. })
    }

    pub fn probability(&self) -> Option<f64> {
        match self {
            GateDecision::Approved { probability } | GateDecision::Rejected { probability } => {
                Some(*probability)
            }
            GateDecision::Failed { .. } => None,
        }
    }
}

/// Threshold filter in front of a `ProbabilityModel`. Fails closed.
#[derive(Clone)]
pub struct ProbabilityGate {
    model: Arc<dyn ProbabilityModel>,
    threshold: f64,
}

impl ProbabilityGate {
    pub fn new(model: Arc<dyn ProbabilityModel>, threshold: f64) -> Self {
        info!(
            "ProbabilityGate: using {} {} with threshold {:.2}%",
            model.name(),
            model.version(),
            threshold * 100.0
        );
        Self { model, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn evaluate(&self, features: &FeatureVector) -> GateDecision {
        let probability = match self.model.predict(features) {
            Ok(p) if p.is_finite() && (0.0..=1.0).contains(&p) => p,
            Ok(p) => {
                warn!("ProbabilityGate: {} returned invalid probability {}", self.model.name(), p);
                return GateDecision::Failed {
                    error: ModelError::InvalidProbability { value: p },
                };
            }
            Err(error) => {
                warn!("ProbabilityGate: {} failed: {}", self.model.name(), error);
                return GateDecision::Failed { error };
            }
        };

        if probability >= self.threshold {
            GateDecision::Approved { probability }
        } else {
            GateDecision::Rejected { probability }
        }
    }
}

impl std::fmt::Debug for ProbabilityGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbabilityGate")
            .field("model", &self.model.name())
            .field("threshold", &self.threshold)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::session_clock::SessionClock;
    use crate::domain::ml::feature_registry::{FeatureVectorBuilder, MarketContext};
    use crate::domain::trading::types::Candle;

    struct FixedModel(Result<f64, ModelError>);

    impl ProbabilityModel for FixedModel {
        fn predict(&self, _features: &FeatureVector) -> Result<f64, ModelError> {
            self.0.clone()
        }
        fn name(&self) -> &str {
            "fixed"
        }
        fn version(&self) -> &str {
            "test"
        }
    }

    fn features() -> FeatureVector {
        let candle = Candle {
            symbol: "USTEC".to_string(),
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.5,
            volume: 0.0,
            timestamp: 1_709_650_800_000,
        };
        FeatureVectorBuilder::new(SessionClock::default()).build(
            &candle,
            100.0,
            &MarketContext::default(),
        )
    }

    fn gate(result: Result<f64, ModelError>) -> ProbabilityGate {
        ProbabilityGate::new(Arc::new(FixedModel(result)), 0.70)
    }

    #[test]
    fn test_threshold_is_inclusive() {
        assert!(gate(Ok(0.70)).evaluate(&features()).is_approved());
        let decision = gate(Ok(0.69)).evaluate(&features());
        assert_eq!(decision, GateDecision::Rejected { probability: 0.69 });
    }

    #[test]
    fn test_model_errors_fail_closed() {
        let decision = gate(Err(ModelError::Unavailable {
            reason: "no file".to_string(),
        }))
        .evaluate(&features());
        assert!(!decision.is_approved());
        assert_eq!(decision.probability(), None);
    }

    #[test]
    fn test_nan_and_out_of_range_fail_closed() {
        for bad in [f64::NAN, 1.5, -0.1] {
            let decision = gate(Ok(bad)).evaluate(&features());
            assert!(matches!(decision, GateDecision::Failed { .. }), "{} accepted", bad);
        }
    }
}
