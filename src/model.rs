use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Feature columns a trained model may declare in its schema. Anything else
/// in an artifact's `feat_list` fails deserialization, so an unknown column
/// is a load error rather than a silently zeroed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Year,
    StateEncoded,
    CommodityEncoded,
    Value,
}

#[derive(Deserialize)]
struct ModelArtifact {
    feat_list: Vec<Field>,
    weights: Vec<f64>,
    intercept: f64,
    family: String,
}

/// Pre-trained linear regression for a single climate metric, together with
/// the feature schema it was fitted on and the encoder family its categorical
/// codes come from.
#[derive(Debug)]
pub struct RegressionModel {
    feat_list: Vec<Field>,
    weights: Vec<f64>,
    intercept: f64,
    family: String,
}

impl RegressionModel {
    pub fn load(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path)
            .with_context(|| format!("failed to read model at {}", path.display()))?;
        let artifact: ModelArtifact = serde_json::from_str(&txt)
            .with_context(|| format!("failed to parse model artifact at {}", path.display()))?;
        Self::new(
            artifact.feat_list,
            artifact.weights,
            artifact.intercept,
            artifact.family,
        )
        .with_context(|| format!("invalid model artifact at {}", path.display()))
    }

    pub fn new(
        feat_list: Vec<Field>,
        weights: Vec<f64>,
        intercept: f64,
        family: impl Into<String>,
    ) -> Result<Self> {
        if feat_list.is_empty() {
            bail!("model artifact declares an empty feature schema");
        }
        for (i, field) in feat_list.iter().enumerate() {
            if feat_list[..i].contains(field) {
                bail!("model artifact lists feature {:?} twice", field);
            }
        }
        if weights.len() != feat_list.len() {
            bail!(
                "model artifact has {} weights for {} schema fields",
                weights.len(),
                feat_list.len()
            );
        }
        Ok(Self {
            feat_list,
            weights,
            intercept,
            family: family.into(),
        })
    }

    /// Scalar prediction for one feature row. The row must match the declared
    /// schema in length and order; that contract is between this service and
    /// the artifact producer, not inferred at runtime.
    pub fn predict(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.feat_list.len() {
            bail!(
                "feature length mismatch: got {}, expected {}",
                row.len(),
                self.feat_list.len()
            );
        }
        let mut y = self.intercept;
        for (w, x) in self.weights.iter().zip(row) {
            y += w * x;
        }
        Ok(y)
    }

    pub fn feat_list(&self) -> &[Field] {
        &self.feat_list
    }

    pub fn family(&self) -> &str {
        &self.family
    }
}
