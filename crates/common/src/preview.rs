//! Preview frame controller and session
//!
//! [`PreviewFrame`] tracks the frame lifecycle (`loading -> ready | error`)
//! and keeps exactly one reserved `<style>` element in sync with the selected
//! color. [`PreviewSession`] owns the frame document and is the only place
//! the applied variant changes: operator selections and inbound
//! `APPLY_VARIANT` messages both go through it.

use crate::applicator::{ApplyReport, VariantApplicator};
use crate::dom::Document;
use crate::error::Result;
use crate::message::{FrameMessage, MessageSink};
use crate::style::StylePolicy;
use crate::types::VariantDescriptor;
use serde::Serialize;
use tracing::{debug, info, warn};

/// `id` of the injected style element.
pub const PREVIEW_STYLE_ID: &str = "ab-test-preview-styles";

/// Selector the injected rule is scoped to.
pub const PREVIEW_SELECTOR: &str = "h1";

pub const PREVIEW_TRANSITION: &str = "color 0.3s ease";

pub const LOAD_ERROR_MESSAGE: &str = "Failed to load preview. Please check the URL and try again.";

/// Frame lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum FrameState {
    Loading,
    Ready,
    Error(String),
}

impl FrameState {
    pub fn error_message(&self) -> Option<&str> {
        match self {
            FrameState::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl std::fmt::Display for FrameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameState::Loading => write!(f, "loading"),
            FrameState::Ready => write!(f, "ready"),
            FrameState::Error(_) => write!(f, "error"),
        }
    }
}

/// CSS rule injected for a color.
pub fn preview_css(color: &str) -> String {
    format!(
        "{} {{ color: {} !important; transition: {}; }}",
        PREVIEW_SELECTOR, color, PREVIEW_TRANSITION
    )
}

/// Replace the reserved style element with one for `color`.
///
/// The color is checked first; a rejected color leaves the document as it
/// was.
pub fn inject_styles<D>(doc: &mut D, policy: &StylePolicy, color: &str) -> Result<()>
where
    D: Document + ?Sized,
{
    let (_, color) = policy.check("color", color)?;
    if doc.remove_element_by_id(PREVIEW_STYLE_ID)? {
        debug!("Removed previous preview styles");
    }
    doc.append_style_element(PREVIEW_STYLE_ID, &preview_css(&color))?;
    Ok(())
}

/// Preview frame lifecycle and style-tag state.
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    state: FrameState,
    selected: Option<String>,
    policy: StylePolicy,
}

impl Default for PreviewFrame {
    fn default() -> Self {
        Self::new(StylePolicy::strict())
    }
}

impl PreviewFrame {
    pub fn new(policy: StylePolicy) -> Self {
        Self {
            state: FrameState::Loading,
            selected: None,
            policy,
        }
    }

    pub fn state(&self) -> &FrameState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == FrameState::Ready
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Frame finished loading: become ready and inject the selection, if any.
    pub fn on_load<D>(&mut self, doc: &mut D) -> Result<()>
    where
        D: Document + ?Sized,
    {
        self.state = FrameState::Ready;
        match self.selected.clone() {
            Some(color) => inject_styles(doc, &self.policy, &color),
            None => Ok(()),
        }
    }

    pub fn on_error(&mut self) {
        warn!("Preview frame failed to load");
        self.state = FrameState::Error(LOAD_ERROR_MESSAGE.to_string());
    }

    /// Frame is navigating to a new document. The selection is kept.
    pub fn reload(&mut self) {
        self.state = FrameState::Loading;
    }

    /// Record a new selected color, re-injecting when ready. A rejected color
    /// changes nothing.
    pub fn select<D>(&mut self, doc: &mut D, color: &str) -> Result<()>
    where
        D: Document + ?Sized,
    {
        let (_, color) = self.policy.check("color", color)?;
        if self.is_ready() {
            inject_styles(doc, &self.policy, &color)?;
        }
        self.selected = Some(color);
        Ok(())
    }
}

/// The variant currently owned by a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedVariant {
    pub color: Option<String>,
    pub descriptor: Option<VariantDescriptor>,
}

/// Single owner of a preview document and its applied variant.
pub struct PreviewSession<D: Document> {
    document: D,
    frame: PreviewFrame,
    applicator: VariantApplicator,
    applied: AppliedVariant,
}

impl<D: Document> PreviewSession<D> {
    pub fn new(document: D, policy: StylePolicy) -> Self {
        Self {
            document,
            frame: PreviewFrame::new(policy.clone()),
            applicator: VariantApplicator::new(policy),
            applied: AppliedVariant::default(),
        }
    }

    pub fn state(&self) -> &FrameState {
        self.frame.state()
    }

    pub fn applied(&self) -> &AppliedVariant {
        &self.applied
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    /// Frame load event. Replays the owned descriptor and style selection
    /// onto the freshly loaded document.
    pub fn frame_loaded(&mut self) -> Result<Option<ApplyReport>> {
        info!("Preview frame ready");
        self.frame.on_load(&mut self.document)?;
        let descriptor = match self.applied.descriptor.clone() {
            Some(descriptor) => descriptor,
            None => return Ok(None),
        };
        let report = self.applicator.apply(&mut self.document, &descriptor)?;
        self.sync_color(&descriptor, &report)?;
        Ok(Some(report))
    }

    pub fn frame_failed(&mut self) {
        self.frame.on_error();
    }

    /// Navigate the frame to a new document.
    pub fn reload(&mut self, document: D) {
        self.document = document;
        self.frame.reload();
    }

    /// Operator picked a color.
    pub fn select_color(&mut self, color: &str) -> Result<()> {
        self.frame.select(&mut self.document, color)?;
        self.applied.color = self.frame.selected().map(str::to_string);
        Ok(())
    }

    /// Inbound message from the frame's message channel. Failures are posted
    /// to `sink` and never returned.
    pub fn receive_message<S>(&mut self, data: &serde_json::Value, sink: &mut S) -> Option<ApplyReport>
    where
        S: MessageSink + ?Sized,
    {
        let descriptor = match FrameMessage::decode(data) {
            Ok(Some(FrameMessage::ApplyVariant { variant })) => variant,
            Ok(_) => return None,
            Err(e) => {
                sink.post(FrameMessage::error(e.to_string()));
                return None;
            }
        };

        match self.apply_descriptor(descriptor) {
            Ok(report) => report,
            Err(e) => {
                warn!("Variant application failed: {}", e);
                sink.post(FrameMessage::error(e.to_string()));
                None
            }
        }
    }

    fn apply_descriptor(&mut self, descriptor: VariantDescriptor) -> Result<Option<ApplyReport>> {
        let checked = self.applicator.policy().check_descriptor(&descriptor)?;
        if checked.is_empty() {
            debug!("Variant sets no styles, keeping the current one");
            return Ok(None);
        }

        if !self.frame.is_ready() {
            debug!("Frame is {}, deferring variant until load", self.frame.state());
            self.applied.descriptor = Some(checked);
            return Ok(None);
        }

        let report = self.applicator.apply(&mut self.document, &checked)?;
        self.sync_color(&checked, &report)?;
        self.applied.descriptor = Some(checked);
        Ok(Some(report))
    }

    /// A uniform color in an applied descriptor becomes the style-tag
    /// selection too, so both paths show the same value. Nothing changes
    /// when none of the referenced elements exist on the page.
    fn sync_color(&mut self, descriptor: &VariantDescriptor, report: &ApplyReport) -> Result<()> {
        if !report.matched_any(descriptor) {
            debug!("No referenced element on the page, style tag left as is");
            return Ok(());
        }
        if let Some(color) = descriptor.uniform_color().map(str::to_string) {
            self.select_color(&color)?;
        }
        Ok(())
    }
}

impl<D: Document> std::fmt::Debug for PreviewSession<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewSession")
            .field("frame", &self.frame)
            .field("applied", &self.applied)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDocument;
    use serde_json::json;

    fn page() -> MemoryDocument {
        let mut doc = MemoryDocument::new();
        doc.append_tracked("h1", "t1");
        doc
    }

    #[test]
    fn test_initial_state_is_loading() {
        let frame = PreviewFrame::default();
        assert_eq!(frame.state(), &FrameState::Loading);
        assert!(frame.selected().is_none());
    }

    #[test]
    fn test_load_injects_existing_selection() {
        let mut doc = page();
        let mut frame = PreviewFrame::default();
        frame.select(&mut doc, "#FF0000").unwrap();
        assert!(doc.style_elements().is_empty());

        frame.on_load(&mut doc).unwrap();
        assert_eq!(frame.state(), &FrameState::Ready);
        let style = doc.element_by_id(PREVIEW_STYLE_ID).unwrap();
        assert_eq!(
            doc.text(style),
            Some("h1 { color: #FF0000 !important; transition: color 0.3s ease; }")
        );
    }

    #[test]
    fn test_reselect_replaces_single_style_element() {
        let mut doc = page();
        let mut frame = PreviewFrame::default();
        frame.on_load(&mut doc).unwrap();
        assert_eq!(doc.count_by_id(PREVIEW_STYLE_ID), 0);

        for color in ["#111111", "#222222", "#333333"] {
            frame.select(&mut doc, color).unwrap();
            assert_eq!(doc.count_by_id(PREVIEW_STYLE_ID), 1);
        }
        let style = doc.element_by_id(PREVIEW_STYLE_ID).unwrap();
        assert!(doc.text(style).unwrap().contains("#333333"));
        assert_eq!(frame.state(), &FrameState::Ready);
    }

    #[test]
    fn test_rejected_color_keeps_previous_styles() {
        let mut doc = page();
        let mut frame = PreviewFrame::default();
        frame.on_load(&mut doc).unwrap();
        frame.select(&mut doc, "#abcdef").unwrap();

        let err = frame.select(&mut doc, "red } body { display: none").unwrap_err();
        assert!(err.is_style_rejection());
        assert_eq!(frame.selected(), Some("#abcdef"));
        let style = doc.element_by_id(PREVIEW_STYLE_ID).unwrap();
        assert!(doc.text(style).unwrap().contains("#abcdef"));
    }

    #[test]
    fn test_error_records_fixed_message() {
        let mut doc = page();
        let mut frame = PreviewFrame::default();
        frame.on_error();
        frame.select(&mut doc, "#000").unwrap();
        assert_eq!(frame.state(), &FrameState::Error(LOAD_ERROR_MESSAGE.to_string()));
        assert!(doc.style_elements().is_empty());
        assert_eq!(frame.state().error_message(), Some(LOAD_ERROR_MESSAGE));
    }

    #[test]
    fn test_session_defers_message_until_load() {
        let mut session = PreviewSession::new(page(), StylePolicy::strict());
        let mut outbox: Vec<FrameMessage> = Vec::new();

        let msg = json!({
            "type": "APPLY_VARIANT",
            "variant": { "elements": [{ "id": "t1", "styles": { "color": "#000" } }] }
        });
        assert!(session.receive_message(&msg, &mut outbox).is_none());
        assert!(outbox.is_empty());
        assert!(session.applied().color.is_none());

        let report = session.frame_loaded().unwrap().unwrap();
        assert_eq!(report.properties_set, 1);
        assert_eq!(session.applied().color.as_deref(), Some("#000"));
        let doc = session.document();
        let t1 = doc.find_by_stable_id("t1").unwrap();
        assert_eq!(doc.style(t1, "color"), Some("#000"));
        assert_eq!(doc.count_by_id(PREVIEW_STYLE_ID), 1);
    }

    #[test]
    fn test_session_paths_share_one_color() {
        let mut session = PreviewSession::new(page(), StylePolicy::strict());
        session.frame_loaded().unwrap();
        session.select_color("#00FF00").unwrap();

        let mut outbox: Vec<FrameMessage> = Vec::new();
        let msg = json!({
            "type": "APPLY_VARIANT",
            "variant": { "elements": [{ "id": "t1", "styles": { "color": "#0000FF" } }] }
        });
        session.receive_message(&msg, &mut outbox).unwrap();

        assert_eq!(session.applied().color.as_deref(), Some("#0000FF"));
        let doc = session.document();
        let style = doc.element_by_id(PREVIEW_STYLE_ID).unwrap();
        assert!(doc.text(style).unwrap().contains("#0000FF"));
        assert_eq!(doc.count_by_id(PREVIEW_STYLE_ID), 1);
    }

    #[test]
    fn test_session_reports_rejection() {
        let mut session = PreviewSession::new(page(), StylePolicy::strict());
        session.frame_loaded().unwrap();
        let mut outbox: Vec<FrameMessage> = Vec::new();
        let msg = json!({
            "type": "APPLY_VARIANT",
            "variant": { "elements": [{ "id": "t1", "styles": { "position": "fixed" } }] }
        });
        assert!(session.receive_message(&msg, &mut outbox).is_none());
        assert_eq!(
            outbox,
            vec![FrameMessage::error("Style property not allowed: position")]
        );
        assert!(session.applied().descriptor.is_none());
    }

    #[test]
    fn test_reload_replays_on_new_document() {
        let mut session = PreviewSession::new(page(), StylePolicy::strict());
        session.frame_loaded().unwrap();
        session.select_color("#123456").unwrap();

        session.reload(page());
        assert_eq!(session.state(), &FrameState::Loading);
        assert!(session.document().style_elements().is_empty());

        session.frame_loaded().unwrap();
        assert_eq!(session.document().count_by_id(PREVIEW_STYLE_ID), 1);
    }

    #[test]
    fn test_missing_id_leaves_page_untouched() {
        let mut session = PreviewSession::new(page(), StylePolicy::strict());
        session.frame_loaded().unwrap();
        let mut outbox: Vec<FrameMessage> = Vec::new();
        let msg = json!({
            "type": "APPLY_VARIANT",
            "variant": { "elements": [{ "id": "ghost", "styles": { "color": "#fff" } }] }
        });

        let report = session.receive_message(&msg, &mut outbox).unwrap();
        assert_eq!(report.missing, vec!["ghost".to_string()]);
        assert_eq!(report.properties_set, 0);
        assert!(outbox.is_empty());
        assert!(session.applied().color.is_none());
        let doc = session.document();
        assert!(doc.style_elements().is_empty());
        let t1 = doc.find_by_stable_id("t1").unwrap();
        assert_eq!(doc.style(t1, "color"), None);
    }

    #[test]
    fn test_deferred_missing_id_injects_nothing_on_load() {
        let mut session = PreviewSession::new(page(), StylePolicy::strict());
        let mut outbox: Vec<FrameMessage> = Vec::new();
        let msg = json!({
            "type": "APPLY_VARIANT",
            "variant": { "elements": [{ "id": "ghost", "styles": { "color": "#fff" } }] }
        });
        assert!(session.receive_message(&msg, &mut outbox).is_none());

        let report = session.frame_loaded().unwrap().unwrap();
        assert_eq!(report.missing, vec!["ghost".to_string()]);
        assert!(session.document().style_elements().is_empty());
        assert!(session.applied().color.is_none());
    }

    #[test]
    fn test_empty_variant_keeps_current_one() {
        let mut session = PreviewSession::new(page(), StylePolicy::strict());
        session.frame_loaded().unwrap();
        let mut outbox: Vec<FrameMessage> = Vec::new();
        let set = json!({
            "type": "APPLY_VARIANT",
            "variant": { "elements": [{ "id": "t1", "styles": { "color": "#000" } }] }
        });
        session.receive_message(&set, &mut outbox).unwrap();

        let empty = json!({
            "type": "APPLY_VARIANT",
            "variant": { "elements": [{ "id": "t1", "styles": {} }] }
        });
        assert!(session.receive_message(&empty, &mut outbox).is_none());
        assert!(outbox.is_empty());
        let applied = session.applied().descriptor.as_ref().unwrap();
        assert_eq!(applied.uniform_color(), Some("#000"));
    }
}
