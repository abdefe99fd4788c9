//! Responsive style classification.
//!
//! Per-viewport root styles become coalesced [`StyleDiff`]s, and those
//! become breakpoint-prefixed utility class tokens: no prefix for the mobile
//! base, `md:` for tablet, `lg:` for desktop.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{StyleDiff, StyleMap};
use crate::viewport::ViewportName;

/// Property → (computed value → token).
pub const KEYWORD_TOKENS: &[(&str, &[(&str, &str)])] = &[
    (
        "display",
        &[
            ("flex", "flex"),
            ("grid", "grid"),
            ("block", "block"),
            ("inline-block", "inline-block"),
            ("inline-flex", "inline-flex"),
            ("inline", "inline"),
            ("none", "hidden"),
        ],
    ),
    (
        "flexDirection",
        &[
            ("row", "flex-row"),
            ("column", "flex-col"),
            ("row-reverse", "flex-row-reverse"),
            ("column-reverse", "flex-col-reverse"),
        ],
    ),
    (
        "justifyContent",
        &[
            ("center", "justify-center"),
            ("flex-start", "justify-start"),
            ("start", "justify-start"),
            ("flex-end", "justify-end"),
            ("end", "justify-end"),
            ("space-between", "justify-between"),
            ("space-around", "justify-around"),
            ("space-evenly", "justify-evenly"),
        ],
    ),
    (
        "alignItems",
        &[
            ("center", "items-center"),
            ("flex-start", "items-start"),
            ("start", "items-start"),
            ("flex-end", "items-end"),
            ("end", "items-end"),
            ("baseline", "items-baseline"),
            ("stretch", "items-stretch"),
        ],
    ),
    (
        "textAlign",
        &[
            ("left", "text-left"),
            ("center", "text-center"),
            ("right", "text-right"),
            ("justify", "text-justify"),
        ],
    ),
    (
        "flexWrap",
        &[("wrap", "flex-wrap"), ("nowrap", "flex-nowrap")],
    ),
    (
        "position",
        &[
            ("static", "static"),
            ("relative", "relative"),
            ("absolute", "absolute"),
            ("fixed", "fixed"),
            ("sticky", "sticky"),
        ],
    ),
];

/// Spacing scale steps; one step is 4px.
pub const SPACING_STEPS: &[f64] = &[
    0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 14.0,
    16.0, 20.0, 24.0, 28.0, 32.0, 36.0, 40.0, 44.0, 48.0, 52.0, 56.0, 60.0, 64.0, 72.0, 80.0, 96.0,
];

/// Spacing property → class prefix.
pub const SPACING_PREFIXES: &[(&str, &str)] = &[
    ("paddingTop", "pt"),
    ("paddingRight", "pr"),
    ("paddingBottom", "pb"),
    ("paddingLeft", "pl"),
    ("marginTop", "mt"),
    ("marginBottom", "mb"),
    ("gap", "gap"),
];

/// Named font-size buckets (px).
pub const FONT_SIZES: &[(&str, f64)] = &[
    ("xs", 12.0),
    ("sm", 14.0),
    ("base", 16.0),
    ("lg", 18.0),
    ("xl", 20.0),
    ("2xl", 24.0),
    ("3xl", 30.0),
    ("4xl", 36.0),
    ("5xl", 48.0),
    ("6xl", 60.0),
    ("7xl", 72.0),
    ("8xl", 96.0),
    ("9xl", 128.0),
];

pub const FONT_WEIGHTS: &[(u32, &str)] = &[
    (100, "thin"),
    (200, "extralight"),
    (300, "light"),
    (400, "normal"),
    (500, "medium"),
    (600, "semibold"),
    (700, "bold"),
    (800, "extrabold"),
    (900, "black"),
];

/// Coalesced diffs for every property whose value is not the same at every
/// captured viewport. An override is kept only where the value differs from
/// the previous captured breakpoint's.
pub fn style_diffs(styles: &BTreeMap<ViewportName, StyleMap>) -> Vec<StyleDiff> {
    let properties: BTreeSet<&String> = styles.values().flat_map(|map| map.keys()).collect();

    properties
        .into_iter()
        .filter_map(|property| {
            let values: Vec<(ViewportName, Option<&String>)> = styles
                .iter()
                .map(|(name, map)| (*name, map.get(property)))
                .collect();
            let first = values.first().map(|(_, v)| *v)?;
            if values.iter().all(|(_, v)| *v == first) {
                return None;
            }

            let mut diff = StyleDiff {
                property: property.clone(),
                base: None,
                tablet: None,
                desktop: None,
            };
            let mut previous: Option<&String> = None;
            for (index, (name, value)) in values.into_iter().enumerate() {
                let changed = index == 0 || value != previous;
                if changed {
                    let slot = match name {
                        ViewportName::Mobile => &mut diff.base,
                        ViewportName::Tablet => &mut diff.tablet,
                        ViewportName::Desktop => &mut diff.desktop,
                    };
                    *slot = value.cloned();
                }
                previous = value;
            }
            Some(diff)
        })
        .collect()
}

fn px(value: &str) -> Option<f64> {
    value.trim().strip_suffix("px")?.trim().parse().ok()
}

fn nearest<T: Copy>(items: &[T], target: f64, key: impl Fn(T) -> f64) -> Option<T> {
    items.iter().copied().min_by(|a, b| {
        (key(*a) - target)
            .abs()
            .total_cmp(&(key(*b) - target).abs())
    })
}

fn format_step(step: f64) -> String {
    if step.fract() == 0.0 {
        format!("{}", step as i64)
    } else {
        format!("{step}")
    }
}

/// Nearest spacing step for a pixel value, e.g. `24px` → `6`.
pub fn spacing_step(value: &str) -> Option<String> {
    let px = px(value)?;
    nearest(SPACING_STEPS, px / 4.0, |s| s).map(format_step)
}

pub fn font_size_token(value: &str) -> Option<String> {
    let px = px(value)?;
    nearest(FONT_SIZES, px, |(_, size)| size).map(|(name, _)| format!("text-{name}"))
}

pub fn font_weight_token(value: &str) -> Option<String> {
    let weight: f64 = match value.trim() {
        "normal" => 400.0,
        "bold" => 700.0,
        other => other.parse().ok()?,
    };
    nearest(FONT_WEIGHTS, weight, |(w, _)| w as f64).map(|(_, name)| format!("font-{name}"))
}

/// Column count from `repeat(n, ...)`, then `fr` units, then whitespace
/// separated tracks.
pub fn grid_columns(value: &str) -> Option<usize> {
    let value = value.trim();
    if value.is_empty() || value == "none" {
        return None;
    }
    if let Some(rest) = value.strip_prefix("repeat(") {
        if let Some(n) = rest
            .split(',')
            .next()
            .and_then(|n| n.trim().parse::<usize>().ok())
        {
            return Some(n);
        }
    }
    let fr = value
        .split(|c: char| c.is_whitespace() || c == '(' || c == ')' || c == ',')
        .filter(|t| t.ends_with("fr") && t[..t.len() - 2].parse::<f64>().is_ok())
        .count();
    if fr > 0 {
        return Some(fr);
    }
    Some(value.split_whitespace().count())
}

fn keyword_token(property: &str, value: &str) -> Option<String> {
    let (_, table) = KEYWORD_TOKENS.iter().find(|(p, _)| *p == property)?;
    table
        .iter()
        .find(|(v, _)| *v == value.trim())
        .map(|(_, token)| token.to_string())
}

/// Class token for one property value, without breakpoint prefix.
pub fn token_for(property: &str, value: &str) -> Option<String> {
    if let Some(token) = keyword_token(property, value) {
        return Some(token);
    }
    if let Some((_, prefix)) = SPACING_PREFIXES.iter().find(|(p, _)| *p == property) {
        return spacing_step(value).map(|step| format!("{prefix}-{step}"));
    }
    match property {
        "fontSize" => font_size_token(value),
        "fontWeight" => font_weight_token(value),
        "gridTemplateColumns" => grid_columns(value).map(|n| format!("grid-cols-{n}")),
        _ => None,
    }
}

fn prefix(name: ViewportName) -> &'static str {
    match name {
        ViewportName::Mobile => "",
        ViewportName::Tablet => "md:",
        ViewportName::Desktop => "lg:",
    }
}

fn breakpoint_values(diff: &StyleDiff) -> [(ViewportName, Option<&String>); 3] {
    [
        (ViewportName::Mobile, diff.base.as_ref()),
        (ViewportName::Tablet, diff.tablet.as_ref()),
        (ViewportName::Desktop, diff.desktop.as_ref()),
    ]
}

/// Paired paddings with identical breakpoint values collapse into one axis
/// token (`px-`, `py-`), and all four into `p-`.
fn axis_groups(diffs: &[StyleDiff]) -> (Vec<(&'static str, Vec<&StyleDiff>)>, BTreeSet<String>) {
    let find = |property: &str| diffs.iter().find(|d| d.property == property);
    let same = |a: &StyleDiff, b: &StyleDiff| {
        a.base == b.base && a.tablet == b.tablet && a.desktop == b.desktop
    };

    let mut groups = Vec::new();
    let mut consumed = BTreeSet::new();
    let sides = (
        find("paddingTop"),
        find("paddingRight"),
        find("paddingBottom"),
        find("paddingLeft"),
    );
    if let (Some(t), Some(r), Some(b), Some(l)) = sides {
        if same(t, r) && same(t, b) && same(t, l) {
            groups.push(("p", vec![t]));
            consumed.extend([t, r, b, l].map(|d| d.property.clone()));
            return (groups, consumed);
        }
    }
    if let (Some(l), Some(r)) = (sides.3, sides.1) {
        if same(l, r) {
            groups.push(("px", vec![l]));
            consumed.extend([l, r].map(|d| d.property.clone()));
        }
    }
    if let (Some(t), Some(b)) = (sides.0, sides.2) {
        if same(t, b) {
            groups.push(("py", vec![t]));
            consumed.extend([t, b].map(|d| d.property.clone()));
        }
    }
    (groups, consumed)
}

/// Breakpoint-prefixed class tokens for a section's diffs, deduplicated in
/// first-seen order.
pub fn design_classes(diffs: &[StyleDiff]) -> Vec<String> {
    let mut classes: Vec<String> = Vec::new();
    let mut push = |class: String| {
        if !classes.contains(&class) {
            classes.push(class);
        }
    };

    let (groups, consumed) = axis_groups(diffs);
    for (axis, members) in &groups {
        for diff in members {
            for (name, value) in breakpoint_values(diff) {
                if let Some(step) = value.and_then(|v| spacing_step(v)) {
                    push(format!("{}{axis}-{step}", prefix(name)));
                }
            }
        }
    }

    for diff in diffs.iter().filter(|d| !consumed.contains(&d.property)) {
        for (name, value) in breakpoint_values(diff) {
            if let Some(token) = value.and_then(|v| token_for(&diff.property, v)) {
                push(format!("{}{token}", prefix(name)));
            }
        }
    }
    classes
}
