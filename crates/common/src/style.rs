//! Style value policy
//!
//! Every CSS property/value pair that reaches a preview document passes
//! through [`StylePolicy`]. Rules:
//! - property must be on the allow-list (compared lowercase)
//! - value is 1-256 bytes of `[A-Za-z0-9 #%.,()+-/]`
//! - no `url(`, `expression(`, `javascript:`, `@import` or comment markers
//! - color properties must hold a parseable color

use crate::error::{Error, Result};
use crate::types::{ElementRef, StyleMap, VariantDescriptor};
use std::collections::BTreeSet;

/// Maximum accepted value length in bytes.
pub const MAX_VALUE_LEN: usize = 256;

/// Properties accepted by [`StylePolicy::strict`].
pub const DEFAULT_ALLOWED_PROPERTIES: &[&str] = &[
    // Color
    "color", "background", "background-color", "opacity",
    // Typography
    "font-size", "font-weight", "font-style", "font-family", "line-height",
    "letter-spacing", "text-align", "text-decoration", "text-decoration-color",
    "text-transform",
    // Box
    "border", "border-color", "border-width", "border-style", "border-radius",
    "outline", "outline-color", "box-shadow", "padding", "margin",
    "width", "height", "max-width", "min-height",
    // Visibility
    "display", "visibility",
    // Motion
    "transition",
];

/// Properties whose value must parse as a color.
pub const COLOR_PROPERTIES: &[&str] = &[
    "color",
    "background-color",
    "border-color",
    "outline-color",
    "text-decoration-color",
];

/// Sequences rejected anywhere in a value, compared lowercase.
pub const FORBIDDEN_SEQUENCES: &[&str] = &["url(", "expression(", "javascript:", "@import", "/*", "*/"];

/// Functional color notations with numeric arguments.
pub const COLOR_FUNCTIONS: &[&str] = &["rgb", "rgba", "hsl", "hsla"];

/// Allow-list policy for injected CSS.
#[derive(Debug, Clone)]
pub struct StylePolicy {
    allowed: BTreeSet<String>,
}

impl Default for StylePolicy {
    fn default() -> Self {
        Self::strict()
    }
}

impl StylePolicy {
    /// Policy with the default allow-list.
    pub fn strict() -> Self {
        Self::with_properties(DEFAULT_ALLOWED_PROPERTIES.iter().copied())
    }

    /// Policy that accepts exactly the given properties.
    pub fn with_properties<I, S>(properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: properties
                .into_iter()
                .map(|p| p.as_ref().trim().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn allows(&self, property: &str) -> bool {
        self.allowed.contains(&property.trim().to_ascii_lowercase())
    }

    /// Check one pair and return it normalized (lowercase property, trimmed
    /// value).
    pub fn check(&self, property: &str, value: &str) -> Result<(String, String)> {
        let property = property.trim().to_ascii_lowercase();
        if !self.allowed.contains(&property) {
            return Err(Error::PropertyNotAllowed(property));
        }

        let value = value.trim();
        check_value_text(&property, value)?;

        if COLOR_PROPERTIES.contains(&property.as_str()) {
            validate_color(value)?;
        }

        Ok((property, value.to_string()))
    }

    pub fn check_styles(&self, styles: &StyleMap) -> Result<StyleMap> {
        styles
            .iter()
            .map(|(property, value)| self.check(property, value))
            .collect()
    }

    /// Check a whole descriptor. Either every pair passes or nothing is
    /// returned.
    pub fn check_descriptor(&self, descriptor: &VariantDescriptor) -> Result<VariantDescriptor> {
        let elements = descriptor
            .elements
            .iter()
            .map(|element| {
                Ok(ElementRef {
                    id: element.id.clone(),
                    styles: self.check_styles(&element.styles)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(VariantDescriptor { elements })
    }
}

fn check_value_text(property: &str, value: &str) -> Result<()> {
    let reject = |reason: String| Error::InvalidStyleValue {
        property: property.to_string(),
        reason,
    };

    if value.is_empty() {
        return Err(reject("value is empty".to_string()));
    }
    if value.len() > MAX_VALUE_LEN {
        return Err(reject(format!(
            "value is {} bytes, limit is {}",
            value.len(),
            MAX_VALUE_LEN
        )));
    }

    let lowered = value.to_ascii_lowercase();
    if let Some(seq) = FORBIDDEN_SEQUENCES.iter().find(|s| lowered.contains(*s)) {
        return Err(reject(format!("contains forbidden sequence '{}'", seq)));
    }

    if let Some((position, c)) = value.char_indices().find(|(_, c)| !is_value_char(*c)) {
        return Err(reject(format!(
            "invalid character '{}' at position {}",
            c.escape_default(),
            position
        )));
    }

    Ok(())
}

fn is_value_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ' ' | '#' | '%' | '.' | ',' | '(' | ')' | '-' | '+' | '/')
}

/// Accepts `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, numeric
/// `rgb()`/`rgba()`/`hsl()`/`hsla()` and alphabetic names such as `red` or
/// `transparent`.
pub fn validate_color(value: &str) -> Result<()> {
    let value = value.trim();
    let invalid = || Error::InvalidColor(value.to_string());

    if let Some(hex) = value.strip_prefix('#') {
        let ok = matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
        return if ok { Ok(()) } else { Err(invalid()) };
    }

    if let Some(open) = value.find('(') {
        let func = value[..open].trim().to_ascii_lowercase();
        let args = value[open + 1..].strip_suffix(')').ok_or_else(invalid)?;
        if !COLOR_FUNCTIONS.contains(&func.as_str()) {
            return Err(invalid());
        }
        let parts: Vec<&str> = args
            .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        if !(3..=4).contains(&parts.len()) || !parts.iter().all(|p| is_color_number(p)) {
            return Err(invalid());
        }
        return Ok(());
    }

    if !value.is_empty() && value.chars().all(|c| c.is_ascii_alphabetic()) {
        return Ok(());
    }

    Err(invalid())
}

fn is_color_number(part: &str) -> bool {
    let number = part
        .strip_suffix('%')
        .or_else(|| part.strip_suffix("deg"))
        .unwrap_or(part);
    number.parse::<f64>().map(|n| n.is_finite()).unwrap_or(false)
}
