//! Named in-page JavaScript probes.
//!
//! Probes only measure and report; every heuristic decision (coverage,
//! overlap, noise filtering, background inheritance) is made in Rust over the
//! JSON they return. Arguments are embedded as JSON literals.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Attribute stamped on elements a probe reports, so later probes can find
/// the same element again.
pub const ELEMENT_MARKER: &str = "data-pagecap-ref";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageScript {
    pub name: &'static str,
    pub source: String,
}

impl PageScript {
    fn call(name: &'static str, function: &str, args: &[Value]) -> Self {
        let args = args
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            name,
            source: format!("({function})({args})"),
        }
    }
}

/// Shared helpers prepended to probes that measure or tag elements.
const HELPERS: &str = r#"
  const measure = (el) => {
    const r = el.getBoundingClientRect();
    const s = window.getComputedStyle(el);
    const visible = r.width > 0 && r.height > 0 && s.display !== 'none' && s.visibility !== 'hidden';
    return {
      visible,
      box: { x: r.left + window.scrollX, y: r.top + window.scrollY, width: r.width, height: r.height }
    };
  };
  const tag = (el) => {
    if (!el.hasAttribute(marker)) {
      window.__pagecapCounter = (window.__pagecapCounter || 0) + 1;
      el.setAttribute(marker, 'r' + window.__pagecapCounter);
    }
    return el.getAttribute(marker);
  };
"#;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetrics {
    pub page_height: f64,
    pub page_width: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    #[serde(default)]
    pub scroll_y: f64,
}

pub fn page_metrics() -> PageScript {
    PageScript::call(
        "page_metrics",
        r#"() => {
  const doc = document.documentElement;
  const body = document.body;
  return {
    pageHeight: Math.max(doc.scrollHeight, body ? body.scrollHeight : 0, doc.offsetHeight),
    pageWidth: Math.max(doc.scrollWidth, body ? body.scrollWidth : 0),
    viewportWidth: window.innerWidth,
    viewportHeight: window.innerHeight,
    scrollY: window.scrollY
  };
}"#,
        &[],
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollState {
    pub scroll_y: f64,
    pub scroll_height: f64,
}

pub fn scroll_step(distance: f64) -> PageScript {
    PageScript::call(
        "scroll_step",
        r#"(distance) => {
  window.scrollBy(0, distance);
  const body = document.body;
  return {
    scrollY: window.scrollY,
    scrollHeight: Math.max(document.documentElement.scrollHeight, body ? body.scrollHeight : 0)
  };
}"#,
        &[json!(distance)],
    )
}

pub fn scroll_to(y: f64) -> PageScript {
    PageScript::call(
        "scroll_to",
        r#"(y) => {
  window.scrollTo(0, y);
  return window.scrollY;
}"#,
        &[json!(y)],
    )
}

pub fn pending_images() -> PageScript {
    PageScript::call(
        "pending_images",
        r#"() => Array.from(document.images).filter((img) => {
  const src = img.currentSrc || img.getAttribute('src') || '';
  return src !== '' && !src.startsWith('data:') && !img.complete;
}).length"#,
        &[],
    )
}

pub fn fonts_ready() -> PageScript {
    PageScript::call(
        "fonts_ready",
        r#"async () => {
  if (document.fonts && document.fonts.ready) {
    await document.fonts.ready;
  }
  return true;
}"#,
        &[],
    )
}

pub fn running_animations() -> PageScript {
    PageScript::call(
        "running_animations",
        r#"() => {
  if (typeof document.getAnimations !== 'function') return 0;
  return document.getAnimations()
    .filter((a) => a.playState === 'running' || a.playState === 'pending').length;
}"#,
        &[],
    )
}

/// Elements still at opacity 0 while occupying space: entrance animations
/// that have not played yet.
pub fn hidden_entrance_count() -> PageScript {
    PageScript::call(
        "hidden_entrance_count",
        r#"() => {
  let count = 0;
  for (const el of document.querySelectorAll('body *')) {
    if (window.getComputedStyle(el).opacity !== '0') continue;
    const r = el.getBoundingClientRect();
    if (r.width > 0 && r.height > 0) count++;
  }
  return count;
}"#,
        &[],
    )
}

/// `null` when the page has no h1-like heading.
pub fn hero_heading_visible() -> PageScript {
    PageScript::call(
        "hero_heading_visible",
        r#"() => {
  const el = document.querySelector('h1') || document.querySelector('[role="heading"][aria-level="1"]');
  if (!el) return null;
  const s = window.getComputedStyle(el);
  const r = el.getBoundingClientRect();
  return s.display !== 'none' && s.visibility !== 'hidden' && parseFloat(s.opacity || '1') > 0.1 && r.height > 0;
}"#,
        &[],
    )
}

/// Clicks the first visible consent control; returns what matched or `null`.
pub fn dismiss_consent(selectors: &[&str], texts: &[&str]) -> PageScript {
    PageScript::call(
        "dismiss_consent",
        r#"(selectors, texts) => {
  const visible = (el) => {
    const r = el.getBoundingClientRect();
    const s = window.getComputedStyle(el);
    return r.width > 0 && r.height > 0 && s.display !== 'none' && s.visibility !== 'hidden';
  };
  for (const selector of selectors) {
    let el = null;
    try {
      el = Array.from(document.querySelectorAll(selector)).find(visible) || null;
    } catch (e) {
      continue;
    }
    if (!el) continue;
    try {
      el.click();
      return selector;
    } catch (e) {
      continue;
    }
  }
  const controls = Array.from(document.querySelectorAll('button, a, [role="button"]')).filter(visible);
  for (const text of texts) {
    const el = controls.find((c) => (c.textContent || '').trim().toLowerCase() === text);
    if (!el) continue;
    try {
      el.click();
      return 'text:' + text;
    } catch (e) {
      continue;
    }
  }
  return null;
}"#,
        &[json!(selectors), json!(texts)],
    )
}

/// One selector-table entry as sent to the page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeEntry {
    #[serde(rename = "type")]
    pub section_type: String,
    pub candidates: Vec<ProbeCandidate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProbeCandidate {
    /// A CSS selector; malformed selectors are skipped in-page.
    Css(String),
    /// Section containing an h1-h3 whose text includes one of the patterns.
    Heading(Vec<String>),
}

pub fn selector_probe(entries: &[ProbeEntry], per_selector_limit: usize) -> PageScript {
    let function = format!(
        r#"(entries, limit, marker) => {{
{HELPERS}
  const hits = [];
  const headingMatches = (patterns) => {{
    const found = [];
    for (const h of document.querySelectorAll('h1, h2, h3')) {{
      const text = (h.textContent || '').trim().toLowerCase();
      if (!patterns.some((p) => text.includes(p))) continue;
      const section = h.closest('section, [class*="section"], [class*="Section"]');
      if (section && !found.includes(section)) found.push(section);
    }}
    return found;
  }};
  for (const entry of entries) {{
    for (const candidate of entry.candidates) {{
      let nodes = [];
      let label = '';
      try {{
        if (candidate.css !== undefined) {{
          label = candidate.css;
          nodes = Array.from(document.querySelectorAll(candidate.css));
        }} else {{
          label = 'heading:' + candidate.heading.join('|');
          nodes = headingMatches(candidate.heading);
        }}
      }} catch (e) {{
        continue;
      }}
      for (const el of nodes.slice(0, limit)) {{
        try {{
          const m = measure(el);
          hits.push({{ type: entry.type, selector: label, ref: tag(el), visible: m.visible, box: m.box }});
        }} catch (e) {{
          continue;
        }}
      }}
    }}
  }}
  return hits;
}}"#
    );
    PageScript::call(
        "selector_probe",
        &function,
        &[json!(entries), json!(per_selector_limit), json!(ELEMENT_MARKER)],
    )
}

pub fn named_region_probe(attributes: &[String]) -> PageScript {
    let function = format!(
        r#"(attrs, marker) => {{
{HELPERS}
  const nameOf = (el) => attrs.map((a) => el.getAttribute(a)).find(Boolean) || '';
  const out = {{ regions: [], sticky: [] }};
  let nodes = [];
  try {{
    nodes = Array.from(document.querySelectorAll(attrs.map((a) => '[' + a + ']').join(',')));
  }} catch (e) {{
    nodes = [];
  }}
  for (const el of nodes) {{
    const m = measure(el);
    if (!m.visible) continue;
    const s = window.getComputedStyle(el);
    out.regions.push({{
      ref: tag(el), name: nameOf(el), box: m.box,
      backgroundColor: s.backgroundColor, backgroundImage: s.backgroundImage
    }});
  }}
  for (const el of document.querySelectorAll('body *')) {{
    const s = window.getComputedStyle(el);
    if (s.position !== 'sticky' || !el.parentElement) continue;
    const m = measure(el);
    if (!m.visible) continue;
    const parent = el.parentElement;
    out.sticky.push({{
      ref: tag(parent), name: nameOf(el) || nameOf(parent), box: m.box,
      parentBox: measure(parent).box,
      backgroundColor: s.backgroundColor, backgroundImage: s.backgroundImage
    }});
  }}
  return out;
}}"#
    );
    PageScript::call(
        "named_region_probe",
        &function,
        &[json!(attributes), json!(ELEMENT_MARKER)],
    )
}

pub fn fixed_nav_probe() -> PageScript {
    PageScript::call(
        "fixed_nav_probe",
        r#"() => {
  const candidates = [];
  for (const el of document.querySelectorAll('body *')) {
    const s = window.getComputedStyle(el);
    if (s.position !== 'fixed' && s.position !== 'sticky') continue;
    const r = el.getBoundingClientRect();
    if (r.width === 0 || r.height === 0) continue;
    candidates.push({
      viewportTop: r.top,
      links: el.querySelectorAll('a').length,
      box: { x: r.left + window.scrollX, y: r.top + window.scrollY, width: r.width, height: r.height }
    });
  }
  return { viewportWidth: window.innerWidth, candidates };
}"#,
        &[],
    )
}

pub fn section_snapshot(
    element_ref: Option<&str>,
    band: &crate::types::BoundingBox,
    max_depth: usize,
    max_children: usize,
    properties: &[&str],
) -> PageScript {
    PageScript::call(
        "section_snapshot",
        r#"(ref, band, maxDepth, maxChildren, props, marker) => {
  const skipped = ['SCRIPT', 'STYLE', 'NOSCRIPT', 'TEMPLATE', 'LINK', 'META'];
  const boxOf = (el) => {
    const r = el.getBoundingClientRect();
    return { x: r.left + window.scrollX, y: r.top + window.scrollY, width: r.width, height: r.height };
  };
  const locate = () => {
    if (ref) {
      const el = document.querySelector('[' + marker + '="' + ref + '"]');
      if (el) return el;
    }
    let best = null;
    let bestScore = 0;
    for (const el of document.querySelectorAll('body *')) {
      const b = boxOf(el);
      if (b.width < window.innerWidth * 0.9) continue;
      const overlap = Math.min(b.y + b.height, band.y + band.height) - Math.max(b.y, band.y);
      if (overlap <= 0) continue;
      const score = overlap / Math.max(b.height, band.height);
      if (score > bestScore) {
        best = el;
        bestScore = score;
      }
    }
    return best;
  };
  const readStyle = (el) => {
    const s = window.getComputedStyle(el);
    const out = {};
    for (const p of props) {
      const v = s[p];
      if (v !== undefined && v !== null && v !== '') out[p] = String(v);
    }
    return out;
  };
  function walk(el, depth) {
    let text = null;
    for (const child of el.childNodes) {
      if (child.nodeType !== Node.TEXT_NODE) continue;
      const t = child.textContent.trim();
      if (t) text = text ? text + ' ' + t : t;
    }
    const attributes = {};
    for (const name of ['src', 'alt', 'href', 'class', 'id']) {
      const v = el.getAttribute(name);
      if (v) attributes[name] = v;
    }
    if (el.tagName === 'IMG' && el.currentSrc) attributes.src = el.currentSrc;
    const children = [];
    if (depth < maxDepth) {
      const kids = Array.from(el.children).filter((k) => !skipped.includes(k.tagName)).slice(0, maxChildren);
      for (const kid of kids) children.push(walk(kid, depth + 1));
    }
    return { tag: el.tagName.toLowerCase(), attributes, text, box: boxOf(el), style: readStyle(el), children };
  }
  const layer = (el) => {
    const s = window.getComputedStyle(el);
    return { width: el.getBoundingClientRect().width, backgroundColor: s.backgroundColor, backgroundImage: s.backgroundImage };
  };
  const images = Array.from(document.images).map((img) => ({
    src: img.currentSrc || img.getAttribute('src') || '',
    alt: img.getAttribute('alt') || '',
    box: boxOf(img)
  }));
  const root = locate();
  if (!root) return { tree: null, backdrop: null, images };
  const children = Array.from(root.children).slice(0, 5).map((child) =>
    Object.assign(layer(child), { children: Array.from(child.children).slice(0, 3).map(layer) }));
  const ancestors = [];
  for (let p = root.parentElement; p && p !== document.documentElement; p = p.parentElement) {
    ancestors.push(layer(p));
  }
  return { tree: walk(root, 0), backdrop: { root: layer(root), children, ancestors }, images };
}"#,
        &[
            json!(element_ref),
            json!(band),
            json!(max_depth),
            json!(max_children),
            json!(properties),
            json!(ELEMENT_MARKER),
        ],
    )
}

/// Waits for images intersecting the viewport, each capped at `timeout_ms`;
/// returns how many were still loading when called.
pub fn settle_viewport_images(timeout_ms: u64) -> PageScript {
    PageScript::call(
        "settle_viewport_images",
        r#"async (timeoutMs) => {
  const vh = window.innerHeight;
  const pending = Array.from(document.images).filter((img) => {
    const r = img.getBoundingClientRect();
    return r.bottom > 0 && r.top < vh && !img.complete;
  });
  await Promise.all(pending.map((img) => Promise.race([
    new Promise((resolve) => {
      img.addEventListener('load', resolve, { once: true });
      img.addEventListener('error', resolve, { once: true });
    }),
    new Promise((resolve) => setTimeout(resolve, timeoutMs))
  ])));
  return pending.length;
}"#,
        &[json!(timeout_ms)],
    )
}

pub fn raw_page_data(element_limit: usize) -> PageScript {
    PageScript::call(
        "raw_page_data",
        r#"(limit) => {
  const colors = [];
  const typography = [];
  const spacing = [];
  const effects = [];
  let seen = 0;
  for (const el of document.querySelectorAll('body *')) {
    if (seen++ >= limit) break;
    const r = el.getBoundingClientRect();
    if (r.width === 0 || r.height === 0) continue;
    const s = window.getComputedStyle(el);
    if (s.display === 'none' || s.visibility === 'hidden') continue;
    colors.push(s.color, s.backgroundColor, s.borderTopColor);
    const hasText = Array.from(el.childNodes).some((n) => n.nodeType === Node.TEXT_NODE && n.textContent.trim());
    if (hasText) {
      typography.push({ fontFamily: s.fontFamily, fontSize: s.fontSize, fontWeight: s.fontWeight, lineHeight: s.lineHeight });
    }
    spacing.push(s.paddingTop, s.paddingRight, s.paddingBottom, s.paddingLeft, s.marginTop, s.marginBottom, s.gap);
    if (s.boxShadow && s.boxShadow !== 'none') effects.push({ kind: 'boxShadow', value: s.boxShadow });
    if (s.borderRadius && s.borderRadius !== '0px') effects.push({ kind: 'borderRadius', value: s.borderRadius });
    if (s.filter && s.filter !== 'none') effects.push({ kind: 'filter', value: s.filter });
  }
  return { colors, typography, spacing, effects };
}"#,
        &[json!(element_limit)],
    )
}
