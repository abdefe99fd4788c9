//! HTML and JSX renderings of a styled section tree.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::normalize::kebab_case;
use crate::types::StyleMap;

/// Elements that never have children or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Attributes carried over into markup, in output order.
const KEPT_ATTRIBUTES: &[&str] = &["id", "class", "href", "src", "alt"];

/// An element with its normalized styles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyledNode {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub text: Option<String>,
    pub styles: StyleMap,
    pub children: Vec<StyledNode>,
}

impl StyledNode {
    /// Every `src` in the subtree.
    pub fn image_sources(&self, out: &mut Vec<String>) {
        if let Some(src) = self.attributes.get("src") {
            out.push(src.clone());
        }
        for child in &self.children {
            child.image_sources(out);
        }
    }
}

fn safe_tag(tag: &str) -> &str {
    let valid = !tag.is_empty()
        && tag.starts_with(|c: char| c.is_ascii_lowercase())
        && tag
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        tag
    } else {
        "div"
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_jsx_text(text: &str) -> String {
    escape_html(text).replace('{', "&#123;").replace('}', "&#125;")
}

fn escape_js_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

pub fn render_html(node: &StyledNode) -> String {
    let mut out = String::new();
    write_html(node, &mut out);
    out
}

fn write_html(node: &StyledNode, out: &mut String) {
    let tag = safe_tag(&node.tag);
    out.push('<');
    out.push_str(tag);
    for name in KEPT_ATTRIBUTES {
        if let Some(value) = node.attributes.get(*name) {
            let _ = write!(out, " {}=\"{}\"", name, escape_html(value));
        }
    }
    if !node.styles.is_empty() {
        let declarations: Vec<String> = node
            .styles
            .iter()
            .map(|(property, value)| format!("{}: {}", kebab_case(property), value))
            .collect();
        let _ = write!(out, " style=\"{}\"", escape_html(&declarations.join("; ")));
    }
    out.push('>');
    if VOID_ELEMENTS.contains(&tag) {
        return;
    }
    if let Some(text) = &node.text {
        out.push_str(&escape_html(text));
    }
    for child in &node.children {
        write_html(child, out);
    }
    let _ = write!(out, "</{}>", tag);
}

pub fn render_jsx(node: &StyledNode) -> String {
    let mut out = String::new();
    write_jsx(node, &mut out);
    out
}

fn write_jsx(node: &StyledNode, out: &mut String) {
    let tag = safe_tag(&node.tag);
    out.push('<');
    out.push_str(tag);
    for name in KEPT_ATTRIBUTES {
        if let Some(value) = node.attributes.get(*name) {
            let name = if *name == "class" { "className" } else { *name };
            let _ = write!(out, " {}=\"{}\"", name, escape_html(value));
        }
    }
    if !node.styles.is_empty() {
        let entries: Vec<String> = node
            .styles
            .iter()
            .map(|(property, value)| format!("{}: '{}'", property, escape_js_string(value)))
            .collect();
        let _ = write!(out, " style={{{{ {} }}}}", entries.join(", "));
    }
    if VOID_ELEMENTS.contains(&tag) {
        out.push_str(" />");
        return;
    }
    out.push('>');
    if let Some(text) = &node.text {
        out.push_str(&escape_jsx_text(text));
    }
    for child in &node.children {
        write_jsx(child, out);
    }
    let _ = write!(out, "</{}>", tag);
}
