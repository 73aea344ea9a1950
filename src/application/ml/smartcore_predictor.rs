use super::predictor::ProbabilityModel;
use crate::domain::errors::ModelError;
use crate::domain::ml::feature_registry::FeatureVector;
use smartcore::ensemble::random_forest_regressor::RandomForestRegressor;
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub type ForestModel = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Random forest regressor trained on 0/1 outcome labels; the regression
/// output is read as the win probability.
pub struct SmartCorePredictor {
    model: Option<ForestModel>,
    model_path: PathBuf,
}

impl SmartCorePredictor {
    pub fn new(model_path: PathBuf) -> Self {
        let model = Self::load_model(&model_path);
        Self { model, model_path }
    }

    pub fn from_model(model: ForestModel) -> Self {
        Self {
            model: Some(model),
            model_path: PathBuf::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    fn load_model(path: &Path) -> Option<ForestModel> {
        if !path.exists() {
            warn!(
                "SmartCorePredictor: model file not found at {:?}. Every candidate will be rejected.",
                path
            );
            return None;
        }

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                error!("SmartCorePredictor: failed to open model file: {}", e);
                return None;
            }
        };

        match serde_json::from_reader(BufReader::new(file)) {
            Ok(model) => {
                info!("SmartCorePredictor: loaded model from {:?}", path);
                Some(model)
            }
            Err(e) => {
                error!("SmartCorePredictor: failed to deserialize model: {}", e);
                None
            }
        }
    }
}

impl ProbabilityModel for SmartCorePredictor {
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let Some(model) = &self.model else {
            return Err(ModelError::Unavailable {
                reason: format!("no model loaded from {:?}", self.model_path),
            });
        };

        let input = DenseMatrix::from_2d_vec(&vec![features.to_vec()]).map_err(|e| {
            ModelError::PredictionFailed {
                reason: format!("matrix creation failed: {}", e),
            }
        })?;

        let predictions = model
            .predict(&input)
            .map_err(|e| ModelError::PredictionFailed {
                reason: e.to_string(),
            })?;

        predictions
            .first()
            .copied()
            .ok_or_else(|| ModelError::PredictionFailed {
                reason: "no prediction returned".to_string(),
            })
    }

    fn name(&self) -> &str {
        "SmartCore Random Forest"
    }

    fn version(&self) -> &str {
        "po3-v1"
    }
}
