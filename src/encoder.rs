use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use thiserror::Error;

/// A submitted value the fitted encoder has never seen. This is the only
/// request-level validation failure; it aborts the whole submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("value {value:?} is not in the {field} vocabulary")]
pub struct EncodingError {
    pub field: String,
    pub value: String,
}

#[derive(Deserialize)]
struct EncoderArtifact {
    classes: Vec<String>,
}

/// Fitted categorical encoder. Maps each known class to the integer code the
/// models were trained on: its index in the fitted class list.
#[derive(Debug)]
pub struct LabelEncoder {
    field: String,
    codes: HashMap<String, i64>,
}

impl LabelEncoder {
    pub fn load(field: &str, path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path)
            .with_context(|| format!("failed to read {} encoder at {}", field, path.display()))?;
        let artifact: EncoderArtifact = serde_json::from_str(&txt)
            .with_context(|| format!("failed to parse {} encoder at {}", field, path.display()))?;
        Self::from_classes(field, artifact.classes)
    }

    pub fn from_classes(field: &str, classes: Vec<String>) -> Result<Self> {
        if classes.is_empty() {
            bail!("{} encoder artifact has an empty class list", field);
        }
        let mut codes = HashMap::with_capacity(classes.len());
        for (code, class) in classes.into_iter().enumerate() {
            if codes.insert(class.clone(), code as i64).is_some() {
                bail!("{} encoder artifact lists class {:?} twice", field, class);
            }
        }
        Ok(Self {
            field: field.to_string(),
            codes,
        })
    }

    /// Look up the integer code for one value. Pure lookup, no hidden state.
    pub fn transform(&self, value: &str) -> Result<i64, EncodingError> {
        self.codes.get(value).copied().ok_or_else(|| EncodingError {
            field: self.field.clone(),
            value: value.to_string(),
        })
    }

    pub fn vocab_len(&self) -> usize {
        self.codes.len()
    }
}
