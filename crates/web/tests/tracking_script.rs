//! Runs the served tracking script in an embedded JS engine against a stub
//! page holding one `[data-ab-id="t1"]` element.

use boa_engine::{Context, Source};
use serde_json::{json, Value};
use splitview_web::StaticFiles;

const STUB_PAGE: &str = r#"
var applied = {};
var posted = [];
var listeners = [];
var window = {
  addEventListener: function (type, fn) { if (type === 'message') listeners.push(fn); },
  parent: { postMessage: function (message) { posted.push(message); } },
  location: { href: 'https://example.com/landing' }
};
var CSS = { escape: function (s) { return s; } };
var document = {
  currentScript: null,
  querySelector: function (selector) {
    var m = /data-ab-id="([^"]*)"/.exec(selector);
    if (!m || m[1] !== 't1') return null;
    return { style: { setProperty: function (p, v) { applied[p] = v; } } };
  }
};
function fetch() {}
function dispatch(data) {
  listeners.forEach(function (fn) { fn({ data: data }); });
  return JSON.stringify({ applied: applied, posted: posted });
}
"#;

/// Load the script, deliver `data` as a window message and return what the
/// page saw.
fn deliver(data: &Value) -> Value {
    let files = StaticFiles::new();
    let mut ctx = Context::default();
    ctx.eval(Source::from_bytes(STUB_PAGE)).unwrap();
    ctx.eval(Source::from_bytes(files.tracking_script())).unwrap();

    let call = format!("dispatch({});", data);
    let out = ctx.eval(Source::from_bytes(&call)).unwrap();
    let text = out.as_string().unwrap().to_std_string_escaped();
    serde_json::from_str(&text).unwrap()
}

fn apply_message(styles: Value) -> Value {
    json!({
        "type": "APPLY_VARIANT",
        "variant": { "elements": [{ "id": "t1", "styles": styles }] }
    })
}

#[test]
fn allowed_pairs_are_applied() {
    let out = deliver(&apply_message(json!({ " Color ": " #FF0000 ", "font-weight": "700" })));
    assert_eq!(out["applied"], json!({ "color": "#FF0000", "font-weight": "700" }));
    assert_eq!(out["posted"], json!([]));
}

#[test]
fn disallowed_property_rejects_whole_variant() {
    let out = deliver(&apply_message(json!({
        "color": "#000",
        "position": "fixed",
        "z-index": "99999"
    })));
    assert_eq!(out["applied"], json!({}));
    let posted = out["posted"].as_array().unwrap();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0]["type"], "ERROR");
    assert!(posted[0]["message"].as_str().unwrap().starts_with("Style property not allowed"));
}

#[test]
fn color_property_requires_a_color() {
    let out = deliver(&apply_message(json!({ "color": "not a color" })));
    assert_eq!(out["applied"], json!({}));
    assert_eq!(
        out["posted"],
        json!([{ "type": "ERROR", "message": "Invalid color value: not a color" }])
    );
}

#[test]
fn forbidden_sequence_is_rejected() {
    let out = deliver(&apply_message(json!({ "background": "URL(https://evil.example/x.png)" })));
    assert_eq!(out["applied"], json!({}));
    let message = out["posted"][0]["message"].as_str().unwrap();
    assert!(message.contains("forbidden sequence 'url('"), "{}", message);
}

#[test]
fn functional_colors_are_accepted() {
    let out = deliver(&apply_message(json!({
        "color": "rgba(0 0 0 / 50%)",
        "border-color": "hsl(120deg, 50%, 50%)"
    })));
    assert_eq!(
        out["applied"],
        json!({ "color": "rgba(0 0 0 / 50%)", "border-color": "hsl(120deg, 50%, 50%)" })
    );
    assert_eq!(out["posted"], json!([]));
}

#[test]
fn missing_element_is_skipped() {
    let out = deliver(&json!({
        "type": "APPLY_VARIANT",
        "variant": { "elements": [{ "id": "ghost", "styles": { "color": "#fff" } }] }
    }));
    assert_eq!(out["applied"], json!({}));
    assert_eq!(out["posted"], json!([]));
}

#[test]
fn foreign_messages_are_ignored() {
    let out = deliver(&json!({ "type": "webpackOk" }));
    assert_eq!(out["applied"], json!({}));
    assert_eq!(out["posted"], json!([]));
}
