use crate::domain::ml::feature_registry::FEATURE_NAMES;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

pub const DEFAULT_THRESHOLD: f64 = 0.70;

/// Metadata shipped next to a trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub features: Vec<String>,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            features: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ModelConfig {
    /// Load from `path`; a missing file yields the default threshold
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "ModelConfig: {:?} not found, using default threshold {:.2}",
                path, DEFAULT_THRESHOLD
            );
            return Ok(Self::default());
        }

        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse {:?}", path))?;
        config.validate()?;

        info!("ModelConfig: loaded threshold {:.2} from {:?}", config.threshold, path);
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(self.threshold.is_finite() && (0.0..=1.0).contains(&self.threshold)) {
            bail!("Model threshold {} outside [0, 1]", self.threshold);
        }
        // Older configs may omit the list
        if !self.features.is_empty() && self.features.iter().map(String::as_str).ne(FEATURE_NAMES) {
            bail!(
                "Model was trained on features {:?}, expected {:?}",
                self.features,
                FEATURE_NAMES
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_defaults_when_key_missing() {
        let config: ModelConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.threshold, 0.70);
    }

    #[test]
    fn test_reordered_features_are_rejected() {
        let config = ModelConfig {
            threshold: 0.65,
            features: vec![
                "is_ny_session".to_string(),
                "hour".to_string(),
                "distance_to_ema50".to_string(),
                "trend_ema200".to_string(),
                "volatility_shock".to_string(),
            ],
        };
        assert!(config.validate().is_err());
        assert!(ModelConfig::default().validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_default() {
        let config = ModelConfig::load(Path::new("/nonexistent/model_config.json")).unwrap();
        assert_eq!(config, ModelConfig::default());
    }
}
