//! Variant applicator
//!
//! Runs inside the preview frame. Applies a [`VariantDescriptor`] to the
//! elements whose stable identifier matches, and reports failures to the
//! parent context as `ERROR` messages instead of propagating them.

use crate::dom::Document;
use crate::error::Result;
use crate::message::{FrameMessage, MessageSink};
use crate::style::StylePolicy;
use crate::types::VariantDescriptor;
use tracing::{debug, warn};

/// Outcome of a successful application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Number of style properties written.
    pub properties_set: usize,
    /// Element identifiers with no matching node.
    pub missing: Vec<String>,
}

impl ApplyReport {
    /// True when at least one element referenced by `descriptor` was found.
    pub fn matched_any(&self, descriptor: &VariantDescriptor) -> bool {
        descriptor.elements.iter().any(|e| !self.missing.contains(&e.id))
    }
}

#[derive(Debug, Clone, Default)]
pub struct VariantApplicator {
    policy: StylePolicy,
}

impl VariantApplicator {
    pub fn new(policy: StylePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &StylePolicy {
        &self.policy
    }

    /// Apply a descriptor. The whole descriptor is checked against the style
    /// policy before any element is touched; unmatched identifiers are
    /// skipped.
    pub fn apply<D>(&self, doc: &mut D, descriptor: &VariantDescriptor) -> Result<ApplyReport>
    where
        D: Document + ?Sized,
    {
        let checked = self.policy.check_descriptor(descriptor)?;
        let mut report = ApplyReport::default();

        for element in &checked.elements {
            let node = match doc.find_by_stable_id(&element.id) {
                Some(node) => node,
                None => {
                    debug!("No element for stable id {}", element.id);
                    report.missing.push(element.id.clone());
                    continue;
                }
            };
            for (property, value) in &element.styles {
                doc.set_inline_style(node, property, value)?;
                report.properties_set += 1;
            }
        }

        Ok(report)
    }

    /// Apply a descriptor, posting any failure to `sink`. At most one
    /// attempt is made.
    pub fn apply_reporting<D, S>(
        &self,
        doc: &mut D,
        descriptor: &VariantDescriptor,
        sink: &mut S,
    ) -> Option<ApplyReport>
    where
        D: Document + ?Sized,
        S: MessageSink + ?Sized,
    {
        match self.apply(doc, descriptor) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Variant application failed: {}", e);
                sink.post(FrameMessage::error(e.to_string()));
                None
            }
        }
    }

    /// Handle one raw message from the frame's message channel.
    ///
    /// Returns the report when an `APPLY_VARIANT` message was applied.
    /// Non-protocol messages and inbound `ERROR` messages are ignored.
    pub fn handle_message<D, S>(
        &self,
        doc: &mut D,
        data: &serde_json::Value,
        sink: &mut S,
    ) -> Option<ApplyReport>
    where
        D: Document + ?Sized,
        S: MessageSink + ?Sized,
    {
        match FrameMessage::decode(data) {
            Ok(Some(FrameMessage::ApplyVariant { variant })) => {
                self.apply_reporting(doc, &variant, sink)
            }
            Ok(Some(FrameMessage::Error { .. })) | Ok(None) => None,
            Err(e) => {
                warn!("Dropping malformed frame message: {}", e);
                sink.post(FrameMessage::error(e.to_string()));
                None
            }
        }
    }
}
