//! Test control panel
//!
//! Operator-side state for driving a preview: pick a color (preset, typed or
//! random) and turn it into the descriptor/message sent to the frame.

use crate::error::Result;
use crate::message::FrameMessage;
use crate::style::StylePolicy;
use crate::types::{StyleMap, VariantDescriptor};
use rand::Rng;

/// Swatches offered before any custom color is typed.
pub const PRESET_COLORS: &[&str] = &["#FF0000", "#00A86B", "#0066FF", "#FF8C00", "#8A2BE2", "#000000"];

const MAX_HISTORY: usize = 20;

/// Uniformly random `#RRGGBB` color.
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("#{:06X}", rng.gen_range(0..=0x00FF_FFFFu32))
}

#[derive(Debug, Clone, Default)]
pub struct ControlPanel {
    policy: StylePolicy,
    selected: Option<String>,
    history: Vec<String>,
}

impl ControlPanel {
    pub fn new(policy: StylePolicy) -> Self {
        Self {
            policy,
            selected: None,
            history: Vec::new(),
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Previously selected colors, most recent last.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Select a color. Rejected values leave the current selection alone.
    pub fn pick(&mut self, color: &str) -> Result<&str> {
        let (_, color) = self.policy.check("color", color)?;
        if let Some(previous) = self.selected.replace(color) {
            self.history.push(previous);
            if self.history.len() > MAX_HISTORY {
                self.history.remove(0);
            }
        }
        Ok(self.selected.as_deref().unwrap_or_default())
    }

    /// Select a random color.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<&str> {
        let color = random_color(rng);
        self.pick(&color)
    }

    /// Descriptor setting `color` to the selection on every element id.
    pub fn descriptor_for<I, S>(&self, element_ids: I) -> Option<VariantDescriptor>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let color = self.selected.as_ref()?;
        let mut styles = StyleMap::new();
        styles.insert("color".to_string(), color.clone());
        Some(VariantDescriptor::uniform(element_ids, &styles))
    }

    /// `APPLY_VARIANT` message for the current selection.
    pub fn message_for<I, S>(&self, element_ids: I) -> Option<FrameMessage>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.descriptor_for(element_ids).map(FrameMessage::apply)
    }
}
