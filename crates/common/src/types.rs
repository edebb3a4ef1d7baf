//! Core types for Splitview
//!
//! Experiments, variant descriptors and tracking events as they travel over
//! HTTP and the cross-frame message channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// CSS property name to value.
pub type StyleMap = BTreeMap<String, String>;

/// Name under which the primary treatment is addressed.
pub const PRIMARY_VARIATION: &str = "variant";

// ============================================================================
// Experiments
// ============================================================================

/// Experiment lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentStatus {
    Active,
    #[default]
    Inactive,
}

impl std::fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExperimentStatus::Active => write!(f, "active"),
            ExperimentStatus::Inactive => write!(f, "inactive"),
        }
    }
}

/// A static experiment definition.
///
/// `variant` is the primary treatment. Further named treatments, including an
/// explicit `control`, live in `variations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub status: ExperimentStatus,
    pub target_selector: String,
    #[serde(default)]
    pub variant: StyleMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variations: BTreeMap<String, StyleMap>,
}

impl Experiment {
    pub fn is_active(&self) -> bool {
        self.status == ExperimentStatus::Active
    }

    /// Look up a treatment by name. `"variant"` always resolves to the
    /// primary treatment.
    pub fn variation(&self, name: &str) -> Option<&StyleMap> {
        if name == PRIMARY_VARIATION {
            Some(&self.variant)
        } else {
            self.variations.get(name)
        }
    }

    /// Names of all treatments, primary first.
    pub fn variation_names(&self) -> Vec<&str> {
        let mut names = vec![PRIMARY_VARIATION];
        names.extend(
            self.variations
                .keys()
                .map(String::as_str)
                .filter(|n| *n != PRIMARY_VARIATION),
        );
        names
    }
}

/// Short listing entry for an experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub id: String,
    pub status: ExperimentStatus,
}

impl From<&Experiment> for ExperimentSummary {
    fn from(e: &Experiment) -> Self {
        Self {
            id: e.id.clone(),
            status: e.status,
        }
    }
}

// ============================================================================
// Variant descriptors
// ============================================================================

/// One element reference inside a variant descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRef {
    /// Value of the element's stable identifier attribute.
    pub id: String,
    #[serde(default)]
    pub styles: StyleMap,
}

/// Style changes to apply inside a preview frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDescriptor {
    #[serde(default)]
    pub elements: Vec<ElementRef>,
}

impl VariantDescriptor {
    /// Descriptor that sets the same styles on every listed element.
    pub fn uniform<I, S>(ids: I, styles: &StyleMap) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            elements: ids
                .into_iter()
                .map(|id| ElementRef {
                    id: id.into(),
                    styles: styles.clone(),
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.iter().all(|e| e.styles.is_empty())
    }

    /// The `color` carried by the descriptor, if every element that sets one
    /// agrees on it.
    pub fn uniform_color(&self) -> Option<&str> {
        let mut colors = self
            .elements
            .iter()
            .filter_map(|e| e.styles.get("color").map(String::as_str));
        let first = colors.next()?;
        colors.all(|c| c == first).then_some(first)
    }
}

// ============================================================================
// Tracking
// ============================================================================

/// A validated tracking event, ready to forward to the collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub event_type: String,
    pub experiment_id: String,
    pub timestamp: DateTime<Utc>,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title_experiment() -> Experiment {
        serde_json::from_value(serde_json::json!({
            "id": "title-color-test",
            "status": "active",
            "targetSelector": ".exp-title",
            "variant": { "color": "#FF0000" },
            "variations": { "control": { "color": "#000000" } }
        }))
        .unwrap()
    }

    #[test]
    fn test_experiment_wire_shape() {
        let exp = title_experiment();
        assert!(exp.is_active());
        let json = serde_json::to_value(&exp).unwrap();
        assert_eq!(json["targetSelector"], ".exp-title");
        assert_eq!(json["status"], "active");
        assert_eq!(json["variant"]["color"], "#FF0000");
        assert!(json.get("name").is_none());
    }

    #[test]
    fn test_variation_lookup() {
        let exp = title_experiment();
        assert_eq!(exp.variation("variant").unwrap()["color"], "#FF0000");
        assert_eq!(exp.variation("control").unwrap()["color"], "#000000");
        assert!(exp.variation("missing").is_none());
        assert_eq!(exp.variation_names(), vec!["variant", "control"]);
    }

    #[test]
    fn test_status_defaults_to_inactive() {
        let exp: Experiment = serde_json::from_value(serde_json::json!({
            "id": "x",
            "targetSelector": "h1"
        }))
        .unwrap();
        assert_eq!(exp.status, ExperimentStatus::Inactive);
        assert!(exp.variant.is_empty());
    }

    #[test]
    fn test_uniform_color() {
        let mut styles = StyleMap::new();
        styles.insert("color".into(), "#123456".into());
        let d = VariantDescriptor::uniform(["a", "b"], &styles);
        assert_eq!(d.elements.len(), 2);
        assert_eq!(d.uniform_color(), Some("#123456"));

        let mut mixed = d.clone();
        mixed.elements[1].styles.insert("color".into(), "red".into());
        assert_eq!(mixed.uniform_color(), None);
        assert_eq!(VariantDescriptor::default().uniform_color(), None);
    }
}
