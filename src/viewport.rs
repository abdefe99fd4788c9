use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1440,
            height: 900,
        }
    }
}

#[derive(Debug, Error)]
pub enum ViewportParseError {
    #[error("Invalid viewport format: expected WIDTHxHEIGHT (e.g., 1440x900)")]
    InvalidFormat,
    #[error("Invalid width: {0}")]
    InvalidWidth(String),
    #[error("Invalid height: {0}")]
    InvalidHeight(String),
    #[error("Width must be positive")]
    ZeroWidth,
    #[error("Height must be positive")]
    ZeroHeight,
    #[error("Unknown viewport name '{0}': expected mobile, tablet or desktop")]
    UnknownName(String),
}

impl FromStr for Viewport {
    type Err = ViewportParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('x').collect();
        if parts.len() != 2 {
            return Err(ViewportParseError::InvalidFormat);
        }

        let width: u32 = parts[0]
            .trim()
            .parse()
            .map_err(|_| ViewportParseError::InvalidWidth(parts[0].to_string()))?;

        let height: u32 = parts[1]
            .trim()
            .parse()
            .map_err(|_| ViewportParseError::InvalidHeight(parts[1].to_string()))?;

        if width == 0 {
            return Err(ViewportParseError::ZeroWidth);
        }
        if height == 0 {
            return Err(ViewportParseError::ZeroHeight);
        }

        Ok(Viewport { width, height })
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One of the three fixed breakpoints used for responsive capture.
///
/// Ordering follows the mobile-first cascade, so `BTreeMap<ViewportName, _>`
/// iterates mobile → tablet → desktop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewportName {
    Mobile,
    Tablet,
    Desktop,
}

impl ViewportName {
    pub const ALL: [ViewportName; 3] = [
        ViewportName::Mobile,
        ViewportName::Tablet,
        ViewportName::Desktop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewportName::Mobile => "mobile",
            ViewportName::Tablet => "tablet",
            ViewportName::Desktop => "desktop",
        }
    }

    pub fn config(&self) -> ViewportConfig {
        match self {
            ViewportName::Mobile => ViewportConfig {
                name: ViewportName::Mobile,
                width: 375,
                height: 812,
                is_base: true,
            },
            ViewportName::Tablet => ViewportConfig {
                name: ViewportName::Tablet,
                width: 768,
                height: 1024,
                is_base: false,
            },
            ViewportName::Desktop => ViewportConfig {
                name: ViewportName::Desktop,
                width: 1440,
                height: 900,
                is_base: false,
            },
        }
    }
}

impl fmt::Display for ViewportName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewportName {
    type Err = ViewportParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mobile" => Ok(ViewportName::Mobile),
            "tablet" => Ok(ViewportName::Tablet),
            "desktop" => Ok(ViewportName::Desktop),
            other => Err(ViewportParseError::UnknownName(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportConfig {
    pub name: ViewportName,
    pub width: u32,
    pub height: u32,
    /// Mobile-first: the base viewport's values are emitted without a
    /// breakpoint prefix.
    pub is_base: bool,
}

impl ViewportConfig {
    pub fn standard() -> [ViewportConfig; 3] {
        ViewportName::ALL.map(|name| name.config())
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.width,
            height: self.height,
        }
    }
}
