use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::service::Metric;

fn default_true() -> bool {
    true
}

fn default_year_min() -> i32 {
    1990
}

fn default_year_max() -> i32 {
    2025
}

/// One metric model to load, keyed to its artifact file under `artifact_dir`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelEntry {
    pub metric: Metric,
    pub path: String,
}

/// One encoder family: a consistent (state, commodity) encoding scheme.
#[derive(Debug, Clone, Deserialize)]
pub struct FamilyEntry {
    pub name: String,
    pub state_encoder: String,
    pub commodity_encoder: String,
}

/// Deployment configuration. Which models and encoder families load, whether
/// the min/max metrics and the actual-value comparison are enabled, and the
/// year range the form accepts.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub artifact_dir: PathBuf,
    pub dataset_path: PathBuf,
    #[serde(default = "default_true")]
    pub include_min_max: bool,
    #[serde(default = "default_true")]
    pub show_actual_comparison: bool,
    #[serde(default = "default_year_min")]
    pub year_min: i32,
    #[serde(default = "default_year_max")]
    pub year_max: i32,
    pub families: Vec<FamilyEntry>,
    pub models: Vec<ModelEntry>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("config file not found at {}", path.display()))?;
        let cfg: AppConfig = serde_json::from_str(&data)
            .with_context(|| format!("invalid config JSON at {}", path.display()))?;
        if cfg.year_min > cfg.year_max {
            bail!("year_min {} exceeds year_max {}", cfg.year_min, cfg.year_max);
        }
        Ok(cfg)
    }
}

/// Resolve the config path robustly: prefer an explicit CONFIG_PATH, then
/// workspace-relative candidates, then next to the executable.
pub fn resolve_config_path() -> PathBuf {
    if let Ok(p) = std::env::var("CONFIG_PATH") {
        return PathBuf::from(p);
    }

    let candidates = [
        PathBuf::from("config/predictor.json"),
        PathBuf::from("predictor.json"),
        {
            let mut p = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("."));
            p.pop(); // exe dir
            p.push("predictor.json");
            p
        },
    ];

    for c in candidates {
        if c.exists() {
            return c;
        }
    }

    // Fallback to the default relative path; load() will error.
    PathBuf::from("config/predictor.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_fields_are_omitted() {
        let raw = r#"{
            "artifact_dir": "artifacts",
            "dataset_path": "data/climate_history.csv",
            "families": [],
            "models": []
        }"#;
        let cfg: AppConfig = serde_json::from_str(raw).unwrap();
        assert!(cfg.include_min_max);
        assert!(cfg.show_actual_comparison);
        assert_eq!(cfg.year_min, 1990);
        assert_eq!(cfg.year_max, 2025);
    }

    #[test]
    fn flags_and_bounds_are_overridable() {
        let raw = r#"{
            "artifact_dir": "artifacts",
            "dataset_path": "data/climate_history.csv",
            "include_min_max": false,
            "show_actual_comparison": false,
            "year_min": 2000,
            "year_max": 2010,
            "families": [
                {"name": "main", "state_encoder": "s.json", "commodity_encoder": "c.json"}
            ],
            "models": [
                {"metric": "avg_temp", "path": "avg.json"}
            ]
        }"#;
        let cfg: AppConfig = serde_json::from_str(raw).unwrap();
        assert!(!cfg.include_min_max);
        assert!(!cfg.show_actual_comparison);
        assert_eq!(cfg.year_min, 2000);
        assert_eq!(cfg.models[0].metric, Metric::AvgTemp);
        assert_eq!(cfg.families[0].name, "main");
    }

    #[test]
    fn unknown_metric_name_is_rejected() {
        let raw = r#"{"metric": "humidity", "path": "h.json"}"#;
        assert!(serde_json::from_str::<ModelEntry>(raw).is_err());
    }
}
