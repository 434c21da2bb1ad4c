//! Pre-trained classifier loading and inference.

use crate::error::ClassifierError;
use crate::types::{Label, ResolvedFeatures};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::RandomForestClassifier;
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fs;
use std::path::Path;
use tracing::info;

/// Random forest over `f64` features with `0`/`1` class labels.
pub type ForestModel = RandomForestClassifier<f64, i32, DenseMatrix<f64>, Vec<i32>>;

/// Interface for binary direction classifiers.
pub trait Classifier: Send + Sync {
    /// Artifact version string.
    fn version(&self) -> &str;

    /// Feature columns, in the order the model was trained with.
    fn feature_names(&self) -> &[String];

    /// Predict the label for one resolved feature row.
    fn predict(&self, features: &ResolvedFeatures) -> Result<Label, ClassifierError>;
}

/// On-disk artifact: the serialized model plus the column layout it was trained on.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact<M> {
    pub version: String,
    pub features: Vec<String>,
    pub model: M,
}

/// smartcore random forest loaded from a JSON artifact.
pub struct RandomForestModel {
    model: ForestModel,
    version: String,
    features: Vec<String>,
}

impl RandomForestModel {
    pub fn new(model: ForestModel, version: String, features: Vec<String>) -> Self {
        Self {
            model,
            version,
            features,
        }
    }

    /// Load an artifact and check it was trained on `expected` columns.
    pub fn load<P: AsRef<Path>>(path: P, expected: &[String]) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ClassifierError::Missing(path.display().to_string()));
        }

        let raw = fs::read_to_string(path)?;
        let artifact: ModelArtifact<ForestModel> =
            serde_json::from_str(&raw).map_err(|e| ClassifierError::Corrupt(e.to_string()))?;

        if artifact.features != expected {
            return Err(ClassifierError::SchemaMismatch {
                expected: artifact.features,
                actual: expected.to_vec(),
            });
        }

        info!(
            "Loaded classifier {} from {:?} ({} features)",
            artifact.version,
            path,
            artifact.features.len()
        );

        Ok(Self::new(artifact.model, artifact.version, artifact.features))
    }

    /// Write this model as an artifact.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ClassifierError> {
        let artifact = ModelArtifact {
            version: self.version.clone(),
            features: self.features.clone(),
            model: &self.model,
        };
        let json =
            serde_json::to_string(&artifact).map_err(|e| ClassifierError::Corrupt(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Classifier for RandomForestModel {
    fn version(&self) -> &str {
        &self.version
    }

    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn predict(&self, features: &ResolvedFeatures) -> Result<Label, ClassifierError> {
        if features.names() != self.features {
            return Err(ClassifierError::Predict(format!(
                "feature columns {:?} do not match model columns {:?}",
                features.names(),
                self.features
            )));
        }

        let matrix = DenseMatrix::from_2d_vec(&vec![features.row()])
            .map_err(|e| ClassifierError::Predict(format!("Matrix creation failed: {}", e)))?;

        let predictions = self
            .model
            .predict(&matrix)
            .map_err(|e| ClassifierError::Predict(e.to_string()))?;

        let class = predictions
            .first()
            .copied()
            .ok_or_else(|| ClassifierError::Predict("No prediction returned".to_string()))?;

        Label::from_class(class as i64)
            .ok_or_else(|| ClassifierError::Predict(format!("unexpected class label {}", class)))
    }
}
