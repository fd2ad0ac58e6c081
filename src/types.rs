use serde::{Deserialize, Serialize};

use crate::service::{ActualLookup, Metric, PredictionOutcome};

/// One form submission.
#[derive(Debug, Deserialize)]
pub struct PredictParams {
    pub year: i32,
    pub state: String,
    pub crop: String,
}

/// Everything the form needs to render its inputs.
#[derive(Debug, Serialize)]
pub struct ChoicesOut {
    pub year_min: i32,
    pub year_max: i32,
    pub states: Vec<String>,
    pub crops: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MetricOut {
    pub metric: Metric,
    pub label: &'static str,
    pub value: f64,
    pub display: String,
}

/// Historical comparison on the wire. "no_data" is deliberate and distinct
/// from zeros; the key is absent entirely when comparison is disabled.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActualOut {
    Found {
        avg_temp: f64,
        min_temp: f64,
        max_temp: f64,
        precipitation: f64,
    },
    NoData,
}

#[derive(Debug, Serialize)]
pub struct PredictionOut {
    pub t: i64,
    pub year: i32,
    pub state: String,
    pub crop: String,
    pub predictions: Vec<MetricOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<ActualOut>,
}

impl PredictionOut {
    pub fn from_outcome(
        t: i64,
        year: i32,
        state: String,
        crop: String,
        outcome: PredictionOutcome,
    ) -> Self {
        let predictions = outcome
            .predictions
            .into_iter()
            .map(|p| MetricOut {
                metric: p.metric,
                label: p.metric.label(),
                display: p.metric.format(p.value),
                value: p.value,
            })
            .collect();

        let actual = outcome.actual.map(|lookup| match lookup {
            ActualLookup::Found(obs) => ActualOut::Found {
                avg_temp: obs.avg_temp,
                min_temp: obs.min_temp,
                max_temp: obs.max_temp,
                precipitation: obs.precipitation,
            },
            ActualLookup::NoData => ActualOut::NoData,
        });

        Self {
            t,
            year,
            state,
            crop,
            predictions,
            actual,
        }
    }
}
