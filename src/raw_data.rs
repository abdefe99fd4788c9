//! Design-token raw material: every color, type style, spacing value and
//! effect in use on the page, with usage counts.

use serde::Deserialize;

use crate::browser::{evaluate_as, scripts, PageDriver};
use crate::color::CssColor;
use crate::style::normalize::{first_font, is_noise};
use crate::types::{ColorUsage, EffectKind, EffectUsage, RawPageData, TypographyUsage, ValueUsage};
use crate::Result;

/// Elements inspected by the probe, in document order.
pub const ELEMENT_LIMIT: usize = 5000;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProbe {
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub typography: Vec<RawTypography>,
    #[serde(default)]
    pub spacing: Vec<String>,
    #[serde(default)]
    pub effects: Vec<RawEffect>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTypography {
    pub font_family: String,
    pub font_size: String,
    pub font_weight: String,
    pub line_height: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEffect {
    pub kind: EffectKind,
    pub value: String,
}

pub async fn collect(page: &mut dyn PageDriver) -> Result<RawPageData> {
    let probe: RawProbe = evaluate_as(page, &scripts::raw_page_data(ELEMENT_LIMIT)).await?;
    Ok(aggregate(probe))
}

/// Counts occurrences, most used first; ties keep first-seen order.
fn tally<K: PartialEq>(items: impl IntoIterator<Item = K>) -> Vec<(K, usize)> {
    let mut counts: Vec<(K, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(k, _)| *k == item) {
            Some((_, n)) => *n += 1,
            None => counts.push((item, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

pub fn aggregate(probe: RawProbe) -> RawPageData {
    let colors = tally(
        probe
            .colors
            .iter()
            .filter_map(|c| CssColor::parse(c))
            .filter(|c| !c.is_transparent())
            .map(|c| c.to_hex()),
    )
    .into_iter()
    .map(|(hex, count)| ColorUsage { hex, count })
    .collect();

    let typography = tally(probe.typography.into_iter().map(|t| {
        (
            first_font(&t.font_family),
            t.font_size,
            t.font_weight,
            t.line_height,
        )
    }))
    .into_iter()
    .map(
        |((font_family, font_size, font_weight, line_height), count)| TypographyUsage {
            font_family,
            font_size,
            font_weight,
            line_height,
            count,
        },
    )
    .collect();

    let spacing = tally(
        probe
            .spacing
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !is_noise("spacing", v)),
    )
    .into_iter()
    .map(|(value, count)| ValueUsage { value, count })
    .collect();

    let effects = tally(probe.effects.into_iter().map(|e| (e.kind, e.value)))
        .into_iter()
        .map(|((kind, value), count)| EffectUsage { kind, value, count })
        .collect();

    RawPageData {
        colors,
        typography,
        spacing,
        effects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::ScriptedPage;
    use serde_json::json;

    #[tokio::test]
    async fn colors_are_hex_counted_and_transparent_skipped() {
        let mut page = ScriptedPage::new().returning(
            "raw_page_data",
            json!({
                "colors": ["rgb(17, 17, 17)", "rgba(0, 0, 0, 0)", "rgb(17, 17, 17)", "rgb(255, 255, 255)", "bogus"],
                "typography": [],
                "spacing": [],
                "effects": []
            }),
        );
        let data = collect(&mut page).await.unwrap();
        assert_eq!(data.colors.len(), 2);
        assert_eq!(data.colors[0].hex, "#111111");
        assert_eq!(data.colors[0].count, 2);
        assert_eq!(data.colors[1].hex, "#ffffff");
    }

    #[test]
    fn typography_groups_by_first_font() {
        let typo = |family: &str| RawTypography {
            font_family: family.into(),
            font_size: "16px".into(),
            font_weight: "400".into(),
            line_height: "24px".into(),
        };
        let data = aggregate(RawProbe {
            typography: vec![typo("Inter, sans-serif"), typo("\"Inter\""), typo("Georgia")],
            ..RawProbe::default()
        });
        assert_eq!(data.typography[0].font_family, "Inter");
        assert_eq!(data.typography[0].count, 2);
        assert_eq!(data.typography[1].font_family, "Georgia");
    }

    #[test]
    fn zero_spacing_is_dropped() {
        let data = aggregate(RawProbe {
            spacing: vec!["0px".into(), "24px".into(), "normal".into(), "24px".into(), "8px".into()],
            ..RawProbe::default()
        });
        let values: Vec<_> = data.spacing.iter().map(|v| (v.value.as_str(), v.count)).collect();
        assert_eq!(values, vec![("24px", 2), ("8px", 1)]);
    }

    #[test]
    fn effects_keep_kind() {
        let data = aggregate(RawProbe {
            effects: vec![
                RawEffect { kind: EffectKind::BorderRadius, value: "8px".into() },
                RawEffect { kind: EffectKind::BoxShadow, value: "8px".into() },
            ],
            ..RawProbe::default()
        });
        assert_eq!(data.effects.len(), 2);
        assert_eq!(data.effects[0].kind, EffectKind::BorderRadius);
    }
}
