//! CSS color parsing for computed style values.
//!
//! Computed styles report colors as `rgb(r, g, b)` / `rgba(r, g, b, a)`;
//! hex literals show up in inline styles and configs.

use std::str::FromStr;

use palette::{Srgb, Srgba};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CssColor(pub Srgba<u8>);

impl CssColor {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        if value == "transparent" {
            return Some(Self(Srgba::new(0, 0, 0, 0)));
        }
        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex);
        }
        let inner = value
            .strip_prefix("rgba(")
            .or_else(|| value.strip_prefix("rgb("))?
            .strip_suffix(')')?;
        let parts: Vec<&str> = inner
            .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() != 3 && parts.len() != 4 {
            return None;
        }
        let channel = |p: &str| -> Option<u8> {
            let v: f32 = p.parse().ok()?;
            Some(v.round().clamp(0.0, 255.0) as u8)
        };
        let alpha = match parts.get(3) {
            Some(a) => {
                let a = match a.strip_suffix('%') {
                    Some(pct) => pct.parse::<f32>().ok()? / 100.0,
                    None => a.parse::<f32>().ok()?,
                };
                (a.clamp(0.0, 1.0) * 255.0).round() as u8
            }
            None => 255,
        };
        Some(Self(Srgba::new(
            channel(parts[0])?,
            channel(parts[1])?,
            channel(parts[2])?,
            alpha,
        )))
    }

    pub fn is_transparent(&self) -> bool {
        self.0.alpha == 0
    }

    /// `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let c = self.0;
        if c.alpha == 255 {
            format!("#{:02x}{:02x}{:02x}", c.red, c.green, c.blue)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", c.red, c.green, c.blue, c.alpha)
        }
    }
}

fn parse_hex(hex: &str) -> Option<CssColor> {
    match hex.len() {
        3 | 6 => Srgb::<u8>::from_str(hex)
            .ok()
            .map(|rgb| CssColor(Srgba::new(rgb.red, rgb.green, rgb.blue, 255))),
        8 => {
            let rgb = Srgb::<u8>::from_str(&hex[..6]).ok()?;
            let alpha = u8::from_str_radix(&hex[6..], 16).ok()?;
            Some(CssColor(Srgba::new(rgb.red, rgb.green, rgb.blue, alpha)))
        }
        _ => None,
    }
}

/// True when `value` paints something: an opaque-ish color.
pub fn is_painted(value: &str) -> bool {
    CssColor::parse(value).is_some_and(|c| !c.is_transparent())
}
