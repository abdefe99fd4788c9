//! Allow-list and noise filtering for computed styles.

use std::collections::BTreeMap;

use crate::types::StyleMap;

/// Computed properties read for every element (camelCase, as exposed by
/// `CSSStyleDeclaration`).
pub const STYLE_PROPERTIES: &[&str] = &[
    "display",
    "position",
    "zIndex",
    "top",
    "right",
    "bottom",
    "left",
    "transform",
    "flexDirection",
    "flexWrap",
    "justifyContent",
    "alignItems",
    "gap",
    "gridTemplateColumns",
    "width",
    "maxWidth",
    "minHeight",
    "paddingTop",
    "paddingRight",
    "paddingBottom",
    "paddingLeft",
    "marginTop",
    "marginBottom",
    "fontFamily",
    "fontSize",
    "fontWeight",
    "lineHeight",
    "letterSpacing",
    "textAlign",
    "color",
    "backgroundColor",
    "backgroundImage",
    "borderRadius",
    "border",
    "boxShadow",
    "opacity",
    "mixBlendMode",
    "objectFit",
];

/// Values that carry no information for any property. Compared with
/// whitespace removed.
pub const NOISE_VALUES: &[&str] = &[
    "none",
    "normal",
    "auto",
    "0px",
    "transparent",
    "rgba(0,0,0,0)",
    "rgb(0,0,0)",
    "start",
    "stretch",
];

/// Per-property initial values that are equally uninformative.
pub const PROPERTY_DEFAULTS: &[(&str, &str)] = &[
    ("position", "static"),
    ("opacity", "1"),
    ("flexDirection", "row"),
    ("flexWrap", "nowrap"),
    ("mixBlendMode", "normal"),
    ("objectFit", "fill"),
    ("border", "0pxnonergb(0,0,0)"),
];

fn squash(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase()
}

pub fn is_noise(property: &str, value: &str) -> bool {
    let squashed = squash(value);
    squashed.is_empty()
        || NOISE_VALUES.contains(&squashed.as_str())
        || PROPERTY_DEFAULTS
            .iter()
            .any(|(p, d)| *p == property && *d == squashed)
}

/// First family of a `font-family` list, unquoted.
pub fn first_font(value: &str) -> String {
    value
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string()
}

/// Trims, collapses whitespace runs and turns double quotes into single
/// quotes so values embed cleanly in `style="..."`.
pub fn normalize_value(property: &str, value: &str) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    let quoted = collapsed.replace('"', "'");
    if property == "fontFamily" {
        first_font(&quoted)
    } else {
        quoted
    }
}

/// Filters a raw computed-style map down to allow-listed, non-noise values.
pub fn normalize_styles(raw: &BTreeMap<String, String>) -> StyleMap {
    raw.iter()
        .filter(|(property, _)| STYLE_PROPERTIES.contains(&property.as_str()))
        .filter(|(property, value)| !is_noise(property, value))
        .map(|(property, value)| (property.clone(), normalize_value(property, value)))
        .filter(|(_, value)| !value.is_empty())
        .collect()
}

/// `backgroundColor` → `background-color`.
pub fn kebab_case(property: &str) -> String {
    let mut out = String::with_capacity(property.len() + 4);
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
