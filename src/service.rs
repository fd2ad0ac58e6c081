use std::collections::{HashMap, HashSet};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AppConfig;
use crate::dataset::ClimateHistory;
use crate::encoder::{EncodingError, LabelEncoder};
use crate::model::{Field, RegressionModel};

/// Placeholder for the trained `value` column, which has no meaningful
/// counterpart at prediction time.
pub const FILLER_VALUE: f64 = 0.0;

/// The climate metrics the deployment can serve. Temperatures are °F,
/// precipitation is inches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    AvgTemp,
    MinTemp,
    MaxTemp,
    Precipitation,
}

impl Metric {
    pub fn label(&self) -> &'static str {
        match self {
            Metric::AvgTemp => "Average Temperature",
            Metric::MinTemp => "Minimum Temperature",
            Metric::MaxTemp => "Maximum Temperature",
            Metric::Precipitation => "Precipitation",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Precipitation => "in",
            _ => "°F",
        }
    }

    /// Two decimal places plus unit, e.g. "58.40 °F".
    pub fn format(&self, value: f64) -> String {
        format!("{:.2} {}", value, self.unit())
    }

    pub fn is_min_max(&self) -> bool {
        matches!(self, Metric::MinTemp | Metric::MaxTemp)
    }
}

/// One encoder family: the (state, commodity) encoder pair sharing a
/// consistent encoding scheme.
#[derive(Debug)]
pub struct EncoderPair {
    pub state: LabelEncoder,
    pub commodity: LabelEncoder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub year: i32,
    pub state: String,
    pub crop: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricPrediction {
    pub metric: Metric,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActualObservation {
    pub avg_temp: f64,
    pub min_temp: f64,
    pub max_temp: f64,
    pub precipitation: f64,
}

/// Outcome of the historical lookup: a matching row, or explicitly no data.
#[derive(Debug, Clone, PartialEq)]
pub enum ActualLookup {
    Found(ActualObservation),
    NoData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionOutcome {
    pub predictions: Vec<MetricPrediction>,
    /// `None` when the deployment has the comparison feature disabled.
    pub actual: Option<ActualLookup>,
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("model evaluation failed: {0}")]
    Model(anyhow::Error),
}

#[derive(Debug)]
struct MetricModel {
    metric: Metric,
    model: RegressionModel,
}

/// Stateless per-request transform from a submission to predictions plus an
/// optional actual observation. All artifacts are loaded once at startup and
/// borrowed read-only here.
#[derive(Debug)]
pub struct PredictionService {
    families: HashMap<String, EncoderPair>,
    models: Vec<MetricModel>,
    history: ClimateHistory,
    show_actual: bool,
}

impl PredictionService {
    /// Load every artifact the configuration names. Any missing or corrupt
    /// artifact is fatal; the service never starts with a partial model set.
    pub fn load(cfg: &AppConfig) -> Result<Self> {
        let mut models: Vec<(Metric, RegressionModel)> = Vec::new();
        for entry in &cfg.models {
            if entry.metric.is_min_max() && !cfg.include_min_max {
                tracing::info!("skipping {:?} model (min/max disabled)", entry.metric);
                continue;
            }
            let path = cfg.artifact_dir.join(&entry.path);
            let model = RegressionModel::load(&path)?;
            tracing::info!(
                "loaded {:?} model from {} (family {:?}, {} features)",
                entry.metric,
                path.display(),
                model.family(),
                model.feat_list().len()
            );
            models.push((entry.metric, model));
        }

        let needed: HashSet<&str> = models.iter().map(|(_, m)| m.family()).collect();
        let mut families = HashMap::new();
        for fam in &cfg.families {
            if !needed.contains(fam.name.as_str()) {
                continue;
            }
            let state = LabelEncoder::load("state", &cfg.artifact_dir.join(&fam.state_encoder))?;
            let commodity =
                LabelEncoder::load("commodity", &cfg.artifact_dir.join(&fam.commodity_encoder))?;
            tracing::info!(
                "loaded {:?} encoders: {} states, {} commodities",
                fam.name,
                state.vocab_len(),
                commodity.vocab_len()
            );
            if families
                .insert(fam.name.clone(), EncoderPair { state, commodity })
                .is_some()
            {
                bail!("encoder family {:?} configured twice", fam.name);
            }
        }

        let history = ClimateHistory::load(&cfg.dataset_path)?;
        tracing::info!(
            "loaded {} historical rows from {}",
            history.len(),
            cfg.dataset_path.display()
        );

        Self::new(families, models, history, cfg.show_actual_comparison)
    }

    pub fn new(
        families: HashMap<String, EncoderPair>,
        models: Vec<(Metric, RegressionModel)>,
        history: ClimateHistory,
        show_actual: bool,
    ) -> Result<Self> {
        if models.is_empty() {
            bail!("no models configured");
        }
        for (i, (metric, model)) in models.iter().enumerate() {
            if models[..i].iter().any(|(m, _)| m == metric) {
                bail!("metric {:?} configured twice", metric);
            }
            if !families.contains_key(model.family()) {
                bail!(
                    "{:?} model references unknown encoder family {:?}",
                    metric,
                    model.family()
                );
            }
        }

        let models: Vec<MetricModel> = models
            .into_iter()
            .map(|(metric, model)| MetricModel { metric, model })
            .collect();

        // Probe each model once with a dummy row so schema problems surface
        // at startup instead of on the first real submission.
        for m in &models {
            let row = assemble_row(m.model.feat_list(), 0, 0, 0);
            m.model
                .predict(&row)
                .with_context(|| format!("{:?} model failed warmup prediction", m.metric))?;
        }
        tracing::info!("warmup predictions ok");

        Ok(Self {
            families,
            models,
            history,
            show_actual,
        })
    }

    /// Run one submission to completion: encode the state and crop for every
    /// encoder family the loaded models need, short-circuiting entirely on
    /// any unknown value, then invoke each model with the row assembled for
    /// its own schema, then optionally look up the matching historical row.
    pub fn predict(&self, req: &PredictionRequest) -> Result<PredictionOutcome, PredictError> {
        let mut family_codes: HashMap<&str, (i64, i64)> = HashMap::new();
        for m in &self.models {
            let fam = m.model.family();
            if family_codes.contains_key(fam) {
                continue;
            }
            let pair = self.families.get(fam).ok_or_else(|| {
                PredictError::Model(anyhow::anyhow!(
                    "{:?} model references unknown encoder family {:?}",
                    m.metric,
                    fam
                ))
            })?;
            let state_code = pair.state.transform(&req.state)?;
            let commodity_code = pair.commodity.transform(&req.crop)?;
            family_codes.insert(fam, (state_code, commodity_code));
        }

        let mut predictions = Vec::with_capacity(self.models.len());
        for m in &self.models {
            let (state_code, commodity_code) = family_codes[m.model.family()];
            let row = assemble_row(m.model.feat_list(), req.year, state_code, commodity_code);
            let value = m.model.predict(&row).map_err(PredictError::Model)?;
            predictions.push(MetricPrediction {
                metric: m.metric,
                value,
            });
        }

        let actual = if self.show_actual {
            Some(match self.history.lookup(req.year, &req.state, &req.crop) {
                Some(rec) => ActualLookup::Found(ActualObservation {
                    avg_temp: rec.avg_temp,
                    min_temp: rec.min_temp,
                    max_temp: rec.max_temp,
                    precipitation: rec.precipitation,
                }),
                None => ActualLookup::NoData,
            })
        } else {
            None
        };

        Ok(PredictionOutcome {
            predictions,
            actual,
        })
    }

    pub fn states(&self) -> Vec<String> {
        self.history.states()
    }

    pub fn commodities(&self) -> Vec<String> {
        self.history.commodities()
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn family_count(&self) -> usize {
        self.families.len()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

/// Map a submission onto one model's declared schema, in schema order.
fn assemble_row(feat_list: &[Field], year: i32, state_code: i64, commodity_code: i64) -> Vec<f64> {
    feat_list
        .iter()
        .map(|field| match field {
            Field::Year => f64::from(year),
            Field::StateEncoded => state_code as f64,
            Field::CommodityEncoded => commodity_code as f64,
            Field::Value => FILLER_VALUE,
        })
        .collect()
}
