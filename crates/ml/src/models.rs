// Pre-trained outcome classifier and its on-disk artifacts

use std::fs;
use std::path::Path;

use footy_models::{FeatureVector, FootyError, Outcome, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::features::FEATURE_NAMES;

pub const MODEL_FILE: &str = "best_model.json";
pub const ENCODER_FILE: &str = "outcome_encoder.json";
pub const FEATURE_NAMES_FILE: &str = "feature_names.json";

/// Probability interface of a trained multi-class model.
pub trait Classifier: Send + Sync {
    fn model_name(&self) -> &str;
    /// Input columns in training order.
    fn feature_names(&self) -> &[String];
    /// Output classes in the order `predict_proba` reports them.
    fn classes(&self) -> &[Outcome];
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>>;
}

/// Serialized multinomial logistic regression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticArtifact {
    #[serde(default = "default_model_name")]
    pub name: String,
    /// One row per encoder class, one column per feature.
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
    #[serde(default)]
    pub scaler: Option<ScalerArtifact>,
    #[serde(default)]
    pub reported_accuracy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerArtifact {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderArtifact {
    pub classes: Vec<String>,
}

fn default_model_name() -> String {
    "LogisticRegression".to_string()
}

/// Maps class indices of the model output to outcome labels.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeEncoder {
    classes: Vec<Outcome>,
}

impl OutcomeEncoder {
    pub fn new(classes: Vec<Outcome>) -> Result<Self> {
        if classes.is_empty() {
            return Err(FootyError::ModelArtifact("encoder declares no classes".to_string()));
        }
        for (i, class) in classes.iter().enumerate() {
            if classes[..i].contains(class) {
                return Err(FootyError::ModelArtifact(format!(
                    "encoder declares {} twice",
                    class
                )));
            }
        }
        Ok(Self { classes })
    }

    pub fn from_artifact(artifact: &EncoderArtifact) -> Result<Self> {
        let classes = artifact
            .classes
            .iter()
            .map(|label| {
                label.parse::<Outcome>().map_err(|_| {
                    FootyError::ModelArtifact(format!("unknown encoder class '{}'", label))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(classes)
    }

    pub fn classes(&self) -> &[Outcome] {
        &self.classes
    }
}

#[derive(Debug, Clone)]
struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    fn transform(&self, x: &Array1<f64>) -> Array1<f64> {
        // Constant training columns have scale 0; leave them centred only.
        let scale = self.scale.mapv(|s| if s == 0.0 { 1.0 } else { s });
        (x - &self.mean) / &scale
    }
}

#[derive(Debug, Clone)]
pub struct LogisticRegressionModel {
    name: String,
    feature_names: Vec<String>,
    encoder: OutcomeEncoder,
    coefficients: Array2<f64>,
    intercepts: Array1<f64>,
    scaler: Option<StandardScaler>,
    reported_accuracy: Option<String>,
}

impl LogisticRegressionModel {
    pub fn from_artifacts(
        artifact: LogisticArtifact,
        encoder: OutcomeEncoder,
        feature_names: Vec<String>,
    ) -> Result<Self> {
        let n_classes = encoder.classes().len();
        let n_features = feature_names.len();

        if artifact.coefficients.len() != n_classes {
            return Err(FootyError::ModelArtifact(format!(
                "model has {} coefficient rows but encoder declares {} classes",
                artifact.coefficients.len(),
                n_classes
            )));
        }
        if let Some(row) = artifact.coefficients.iter().find(|row| row.len() != n_features) {
            return Err(FootyError::ModelArtifact(format!(
                "coefficient row has {} entries, expected {}",
                row.len(),
                n_features
            )));
        }
        if artifact.intercepts.len() != n_classes {
            return Err(FootyError::ModelArtifact(format!(
                "model has {} intercepts, expected {}",
                artifact.intercepts.len(),
                n_classes
            )));
        }

        let scaler = match artifact.scaler {
            Some(s) if s.mean.len() != n_features || s.scale.len() != n_features => {
                return Err(FootyError::ModelArtifact(format!(
                    "scaler dimensions {}/{} do not match {} features",
                    s.mean.len(),
                    s.scale.len(),
                    n_features
                )));
            }
            Some(s) => Some(StandardScaler {
                mean: Array1::from(s.mean),
                scale: Array1::from(s.scale),
            }),
            None => None,
        };

        let flat: Vec<f64> = artifact.coefficients.into_iter().flatten().collect();
        let coefficients = Array2::from_shape_vec((n_classes, n_features), flat)
            .map_err(|e| FootyError::ModelArtifact(e.to_string()))?;

        Ok(Self {
            name: artifact.name,
            feature_names,
            encoder,
            coefficients,
            intercepts: Array1::from(artifact.intercepts),
            scaler,
            reported_accuracy: artifact.reported_accuracy,
        })
    }

    /// Loads the three artifact files from `dir` and checks them against the
    /// feature assembler's column order.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let artifact: LogisticArtifact = read_json(&dir.join(MODEL_FILE))?;
        let encoder_artifact: EncoderArtifact = read_json(&dir.join(ENCODER_FILE))?;
        let feature_names: Vec<String> = read_json(&dir.join(FEATURE_NAMES_FILE))?;

        let encoder = OutcomeEncoder::from_artifact(&encoder_artifact)?;
        let model = Self::from_artifacts(artifact, encoder, feature_names)?;
        model.ensure_schema(&FEATURE_NAMES)?;

        info!(
            "Loaded model '{}' from {} ({} features, classes {:?})",
            model.name,
            dir.display(),
            model.feature_names.len(),
            model.encoder.classes()
        );
        Ok(model)
    }

    /// Fails when the model's training columns differ from `expected` in
    /// membership or order.
    pub fn ensure_schema(&self, expected: &[&str]) -> Result<()> {
        let matches = self.feature_names.len() == expected.len()
            && self
                .feature_names
                .iter()
                .zip(expected)
                .all(|(have, want)| have.as_str() == *want);

        if matches {
            Ok(())
        } else {
            Err(FootyError::FeatureMismatch {
                expected: expected.iter().map(|s| (*s).to_string()).collect(),
                found: self.feature_names.clone(),
            })
        }
    }

    pub fn reported_accuracy(&self) -> Option<&str> {
        self.reported_accuracy.as_deref()
    }
}

impl Classifier for LogisticRegressionModel {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn classes(&self) -> &[Outcome] {
        self.encoder.classes()
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>> {
        let aligned = features.len() == self.feature_names.len()
            && features.names().zip(&self.feature_names).all(|(a, b)| a == b.as_str());
        if !aligned {
            return Err(FootyError::FeatureMismatch {
                expected: self.feature_names.clone(),
                found: features.names().map(str::to_string).collect(),
            });
        }

        let mut x = Array1::from(features.values());
        if let Some(scaler) = &self.scaler {
            x = scaler.transform(&x);
        }

        let logits = self.coefficients.dot(&x) + &self.intercepts;
        let probs = softmax(&logits);

        if probs.iter().any(|p| !p.is_finite()) {
            return Err(FootyError::PredictionFailed {
                reason: "non-finite class probability".to_string(),
            });
        }
        Ok(probs.to_vec())
    }
}

fn softmax(logits: &Array1<f64>) -> Array1<f64> {
    let max = logits.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
    let exp = logits.mapv(|v| (v - max).exp());
    let total = exp.sum();
    exp / total
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).map_err(|e| {
        FootyError::ModelArtifact(format!("cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        FootyError::ModelArtifact(format!("cannot parse {}: {}", path.display(), e))
    })
}
