//! Control panel -> message channel -> preview session, end to end.

use rand::rngs::StdRng;
use rand::SeedableRng;
use splitview_common::preview::PREVIEW_STYLE_ID;
use splitview_common::{
    ControlPanel, Document, FrameMessage, FrameState, MemoryDocument, PreviewSession, StylePolicy,
};

fn landing_page() -> MemoryDocument {
    let mut doc = MemoryDocument::new();
    let title = doc.append_tracked("h1", "t1");
    doc.set_text(title, "Summer sale");
    let cta = doc.append_tracked("a", "cta");
    doc.set_inline_style(cta, "color", "#333333").unwrap();
    doc
}

/// Round-trip through JSON so the session sees exactly what a frame would.
fn over_the_wire(message: &FrameMessage) -> serde_json::Value {
    serde_json::from_str(&message.to_json().unwrap()).unwrap()
}

#[test]
fn apply_variant_scenario() {
    let mut session = PreviewSession::new(landing_page(), StylePolicy::strict());
    session.frame_loaded().unwrap();

    let message = serde_json::json!({
        "type": "APPLY_VARIANT",
        "variant": { "elements": [{ "id": "t1", "styles": { "color": "#000" } }] }
    });
    let mut outbox: Vec<FrameMessage> = Vec::new();
    session.receive_message(&message, &mut outbox).unwrap();

    let doc = session.document();
    let t1 = doc.find_by_stable_id("t1").unwrap();
    assert_eq!(doc.style(t1, "color"), Some("#000"));
    assert!(outbox.is_empty());
}

#[test]
fn operator_randomizes_and_previews() {
    let mut panel = ControlPanel::new(StylePolicy::strict());
    let mut session = PreviewSession::new(landing_page(), StylePolicy::strict());
    let mut outbox: Vec<FrameMessage> = Vec::new();
    let mut rng = StdRng::seed_from_u64(42);

    assert_eq!(session.state(), &FrameState::Loading);
    session.frame_loaded().unwrap();

    for _ in 0..5 {
        let color = panel.randomize(&mut rng).unwrap().to_string();
        let message = panel.message_for(["t1"]).unwrap();
        let report = session
            .receive_message(&over_the_wire(&message), &mut outbox)
            .unwrap();
        assert_eq!(report.properties_set, 1);

        let doc = session.document();
        let t1 = doc.find_by_stable_id("t1").unwrap();
        assert_eq!(doc.style(t1, "color"), Some(color.as_str()));
        assert_eq!(doc.count_by_id(PREVIEW_STYLE_ID), 1);
        assert_eq!(session.applied().color.as_deref(), Some(color.as_str()));
    }

    let doc = session.document();
    let cta = doc.find_by_stable_id("cta").unwrap();
    assert_eq!(doc.style(cta, "color"), Some("#333333"));
    assert!(outbox.is_empty());
}

#[test]
fn unsafe_message_is_reported_to_parent() {
    let mut session = PreviewSession::new(landing_page(), StylePolicy::strict());
    session.frame_loaded().unwrap();
    session.select_color("#FF0000").unwrap();

    let message = serde_json::json!({
        "type": "APPLY_VARIANT",
        "variant": { "elements": [{ "id": "t1", "styles": { "background": "url(https://evil.example/x.png)" } }] }
    });
    let mut outbox: Vec<FrameMessage> = Vec::new();
    assert!(session.receive_message(&message, &mut outbox).is_none());

    assert_eq!(outbox.len(), 1);
    match &outbox[0] {
        FrameMessage::Error { message } => assert!(message.contains("url(")),
        other => panic!("unexpected {:?}", other),
    }
    let doc = session.document();
    let t1 = doc.find_by_stable_id("t1").unwrap();
    assert_eq!(doc.style(t1, "background"), None);
    assert_eq!(session.applied().color.as_deref(), Some("#FF0000"));
}

#[test]
fn failed_frame_never_injects() {
    let mut session = PreviewSession::new(landing_page(), StylePolicy::strict());
    session.frame_failed();
    session.select_color("#00A86B").unwrap();

    assert_eq!(
        session.state().error_message(),
        Some("Failed to load preview. Please check the URL and try again.")
    );
    assert!(session.document().style_elements().is_empty());
}
