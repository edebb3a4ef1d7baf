//! Static file serving

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use splitview_common::style::{
    COLOR_FUNCTIONS, COLOR_PROPERTIES, DEFAULT_ALLOWED_PROPERTIES, FORBIDDEN_SEQUENCES,
    MAX_VALUE_LEN,
};
use splitview_common::STABLE_ID_ATTR;

/// Embedded static assets
pub struct StaticFiles {
    tracking_script: String,
}

impl StaticFiles {
    pub fn new() -> Self {
        Self {
            tracking_script: render_tracking_script(),
        }
    }

    /// The tracking script with the style policy tables filled in.
    pub fn tracking_script(&self) -> &str {
        &self.tracking_script
    }

    /// Serve a static file
    pub fn serve(&self, path: &str) -> Response {
        let content_type = guess_content_type(path);

        match path.trim_start_matches('/') {
            "tracking-script.js" => serve_embedded(self.tracking_script.clone(), content_type),
            _ => (StatusCode::NOT_FOUND, "File not found").into_response(),
        }
    }
}

impl Default for StaticFiles {
    fn default() -> Self {
        Self::new()
    }
}

fn guess_content_type(path: &str) -> &'static str {
    if path.ends_with(".js") {
        "application/javascript"
    } else if path.ends_with(".css") {
        "text/css"
    } else if path.ends_with(".html") {
        "text/html"
    } else {
        "application/octet-stream"
    }
}

fn serve_embedded(content: String, content_type: &'static str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        content,
    )
        .into_response()
}

fn js_array(items: &[&str]) -> String {
    serde_json::Value::from(items.to_vec()).to_string()
}

fn render_tracking_script() -> String {
    TRACKING_SCRIPT_TEMPLATE
        .replace("__STABLE_ID_ATTR__", &serde_json::Value::from(STABLE_ID_ATTR).to_string())
        .replace("__ALLOWED_PROPERTIES__", &js_array(DEFAULT_ALLOWED_PROPERTIES))
        .replace("__COLOR_PROPERTIES__", &js_array(COLOR_PROPERTIES))
        .replace("__COLOR_FUNCTIONS__", &js_array(COLOR_FUNCTIONS))
        .replace("__FORBIDDEN_SEQUENCES__", &js_array(FORBIDDEN_SEQUENCES))
        .replace("__MAX_VALUE_LEN__", &MAX_VALUE_LEN.to_string())
}

/// Script injected into previewed pages. Applies `APPLY_VARIANT` messages to
/// `[data-ab-id]` elements and exposes `window.splitview.track`. Every pair
/// goes through the same checks as `StylePolicy::strict` before anything is
/// written; the tables are filled in by [`render_tracking_script`].
const TRACKING_SCRIPT_TEMPLATE: &str = r#"
(function () {
  'use strict';

  var ATTR = __STABLE_ID_ATTR__;
  var ALLOWED = __ALLOWED_PROPERTIES__;
  var COLOR_PROPERTIES = __COLOR_PROPERTIES__;
  var COLOR_FUNCTIONS = __COLOR_FUNCTIONS__;
  var FORBIDDEN = __FORBIDDEN_SEQUENCES__;
  var MAX_VALUE_LEN = __MAX_VALUE_LEN__;
  var VALUE_RE = /^[A-Za-z0-9 #%.,()+\-\/]+$/;
  var NUMBER_RE = /^[+-]?(\d+\.?\d*|\.\d+)(e[+-]?\d+)?$/i;

  function asciiLower(s) {
    return s.replace(/[A-Z]/g, function (c) { return c.toLowerCase(); });
  }

  function isColorNumber(part) {
    return NUMBER_RE.test(part.replace(/(%|deg)$/, ''));
  }

  function isColor(value) {
    if (value.charAt(0) === '#') {
      var hex = value.slice(1);
      return [3, 4, 6, 8].indexOf(hex.length) !== -1 && /^[0-9a-fA-F]+$/.test(hex);
    }
    var open = value.indexOf('(');
    if (open !== -1) {
      if (value.charAt(value.length - 1) !== ')') return false;
      if (COLOR_FUNCTIONS.indexOf(asciiLower(value.slice(0, open).trim())) === -1) return false;
      var parts = value.slice(open + 1, -1).split(/[,\/\s]+/).filter(function (p) {
        return p.length > 0;
      });
      return parts.length >= 3 && parts.length <= 4 && parts.every(isColorNumber);
    }
    return /^[A-Za-z]+$/.test(value);
  }

  function checkPair(property, value) {
    var prop = asciiLower(String(property).trim());
    if (ALLOWED.indexOf(prop) === -1) {
      throw new Error('Style property not allowed: ' + prop);
    }
    function reject(reason) {
      return new Error('Rejected value for style property ' + prop + ': ' + reason);
    }
    if (typeof value !== 'string') throw reject('value is not a string');
    var val = value.trim();
    if (val.length === 0) throw reject('value is empty');
    if (val.length > MAX_VALUE_LEN) throw reject('value is too long');
    var lowered = asciiLower(val);
    for (var i = 0; i < FORBIDDEN.length; i++) {
      if (lowered.indexOf(FORBIDDEN[i]) !== -1) {
        throw reject("contains forbidden sequence '" + FORBIDDEN[i] + "'");
      }
    }
    if (!VALUE_RE.test(val)) throw reject('invalid character');
    if (COLOR_PROPERTIES.indexOf(prop) !== -1 && !isColor(val)) {
      throw new Error('Invalid color value: ' + val);
    }
    return [prop, val];
  }

  function applyVariant(variant) {
    var elements = (variant && variant.elements) || [];
    var checked = elements.map(function (ref) {
      var styles = ref.styles || {};
      return {
        id: String(ref.id),
        pairs: Object.keys(styles).map(function (prop) {
          return checkPair(prop, styles[prop]);
        })
      };
    });
    checked.forEach(function (ref) {
      var node = document.querySelector('[' + ATTR + '="' + CSS.escape(ref.id) + '"]');
      if (!node) return;
      ref.pairs.forEach(function (pair) {
        node.style.setProperty(pair[0], pair[1]);
      });
    });
  }

  window.addEventListener('message', function (event) {
    var data = event.data;
    if (!data || data.type !== 'APPLY_VARIANT') return;
    try {
      applyVariant(data.variant);
    } catch (err) {
      window.parent.postMessage({ type: 'ERROR', message: String(err && err.message || err) }, '*');
    }
  });

  var script = document.currentScript;
  var endpoint = script ? new URL('/track', script.src).toString() : '/track';

  window.splitview = {
    track: function (eventType, experimentId) {
      return fetch(endpoint, {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({
          eventType: eventType,
          experimentId: experimentId,
          timestamp: new Date().toISOString(),
          url: window.location.href
        })
      });
    }
  };
})();
"#;
