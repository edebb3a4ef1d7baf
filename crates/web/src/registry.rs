//! Experiment registry
//!
//! Read-only map of experiment definitions. Built once at startup (from the
//! built-in set or a TOML file) and shared with the handlers through an
//! `Arc`; it goes away with the last server handle.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use splitview_common::{
    Error, Experiment, ExperimentStatus, ExperimentSummary, StyleMap, StylePolicy,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::ApiError;

pub const NOT_FOUND_MESSAGE: &str = "Experiment not found";

#[derive(Debug, Deserialize)]
struct ExperimentFile {
    #[serde(default)]
    experiments: Vec<Experiment>,
}

#[derive(Debug, Clone, Default)]
pub struct ExperimentRegistry {
    experiments: BTreeMap<String, Experiment>,
}

impl ExperimentRegistry {
    /// Registry holding the built-in `title-color-test` experiment.
    pub fn builtin() -> Self {
        let mut variant = StyleMap::new();
        variant.insert("color".to_string(), "#FF0000".to_string());

        let title = Experiment {
            id: "title-color-test".to_string(),
            name: None,
            status: ExperimentStatus::Active,
            target_selector: ".exp-title".to_string(),
            variant,
            variations: BTreeMap::new(),
        };

        Self {
            experiments: BTreeMap::from([(title.id.clone(), title)]),
        }
    }

    /// Build a registry, rejecting duplicate ids, empty selectors and
    /// treatments the style policy would refuse to inject.
    pub fn from_experiments<I>(experiments: I) -> splitview_common::Result<Self>
    where
        I: IntoIterator<Item = Experiment>,
    {
        let policy = StylePolicy::strict();
        let mut map = BTreeMap::new();

        for experiment in experiments {
            if experiment.id.trim().is_empty() {
                return Err(Error::InvalidConfig("experiment id is empty".to_string()));
            }
            if experiment.target_selector.trim().is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "experiment {} has no targetSelector",
                    experiment.id
                )));
            }
            for name in experiment.variation_names() {
                if let Some(styles) = experiment.variation(name) {
                    policy.check_styles(styles).map_err(|e| {
                        Error::InvalidConfig(format!("experiment {} variation {}: {}", experiment.id, name, e))
                    })?;
                }
            }
            if map.contains_key(&experiment.id) {
                return Err(Error::AlreadyExists {
                    kind: "experiment".to_string(),
                    id: experiment.id,
                });
            }
            map.insert(experiment.id.clone(), experiment);
        }

        Ok(Self { experiments: map })
    }

    /// Load experiments from a TOML file.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: ExperimentFile = toml::from_str(&content)?;
        let registry = Self::from_experiments(file.experiments)?;
        info!("Loaded {} experiment(s) from {}", registry.len(), path.display());
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&Experiment> {
        self.experiments.get(id)
    }

    pub fn list(&self) -> Vec<ExperimentSummary> {
        self.experiments.values().map(ExperimentSummary::from).collect()
    }

    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn get_experiment_handler(
    State(registry): State<Arc<ExperimentRegistry>>,
    Path(id): Path<String>,
) -> Result<Json<Experiment>, ApiError> {
    match registry.get(&id) {
        Some(experiment) => Ok(Json(experiment.clone())),
        None => {
            debug!("Unknown experiment {}", id);
            Err(ApiError::NotFound(NOT_FOUND_MESSAGE.to_string()))
        }
    }
}

pub async fn list_experiments_handler(
    State(registry): State<Arc<ExperimentRegistry>>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "experiments": registry.list() }))
}

/// Build the experiment routes
pub fn experiment_routes(registry: Arc<ExperimentRegistry>) -> Router {
    Router::new()
        .route("/experiments", get(list_experiments_handler))
        .route("/experiments/:id", get(get_experiment_handler))
        .with_state(registry)
}
