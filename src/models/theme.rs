//! Site colour themes
//!
//! Each theme is a fixed palette. Front ends receive the palette as hex
//! values and as CSS custom properties in `"H S% L%"` form.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SiteTheme {
    #[default]
    Purple,
    Orange,
    Green,
    Orange2,
    Bordeaux,
    Blue,
    Yellow,
    NeonBlue,
    BordeauxGray,
    BlackAndWhite,
}

/// The ten colours of a theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Palette {
    pub primary100: &'static str,
    pub primary200: &'static str,
    pub primary300: &'static str,
    pub accent100: &'static str,
    pub accent200: &'static str,
    pub text100: &'static str,
    pub text200: &'static str,
    pub bg100: &'static str,
    pub bg200: &'static str,
    pub bg300: &'static str,
}

const fn palette(colors: [&'static str; 10]) -> Palette {
    Palette {
        primary100: colors[0],
        primary200: colors[1],
        primary300: colors[2],
        accent100: colors[3],
        accent200: colors[4],
        text100: colors[5],
        text200: colors[6],
        bg100: colors[7],
        bg200: colors[8],
        bg300: colors[9],
    }
}

impl SiteTheme {
    pub const ALL: [SiteTheme; 10] = [
        SiteTheme::Purple,
        SiteTheme::Orange,
        SiteTheme::Green,
        SiteTheme::Orange2,
        SiteTheme::Bordeaux,
        SiteTheme::Blue,
        SiteTheme::Yellow,
        SiteTheme::NeonBlue,
        SiteTheme::BordeauxGray,
        SiteTheme::BlackAndWhite,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SiteTheme::Purple => "purple",
            SiteTheme::Orange => "orange",
            SiteTheme::Green => "green",
            SiteTheme::Orange2 => "orange2",
            SiteTheme::Bordeaux => "bordeaux",
            SiteTheme::Blue => "blue",
            SiteTheme::Yellow => "yellow",
            SiteTheme::NeonBlue => "neonBlue",
            SiteTheme::BordeauxGray => "bordeauxGray",
            SiteTheme::BlackAndWhite => "blackAndWhite",
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            SiteTheme::Purple => palette([
                "#6c35de", "#a364ff", "#ffc7ff", "#cb80ff", "#373737", "#ffffff", "#e0e0e0",
                "#241b35", "#342a45", "#4d425f",
            ]),
            SiteTheme::Orange => palette([
                "#2C3A4F", "#56647b", "#b4c2dc", "#FF4D4D", "#ffecda", "#FFFFFF", "#e0e0e0",
                "#1A1F2B", "#292e3b", "#414654",
            ]),
            SiteTheme::Green => palette([
                "#2E8B57", "#61bc84", "#c6ffe6", "#8FBC8F", "#345e37", "#FFFFFF", "#e0e0e0",
                "#1E1E1E", "#2d2d2d", "#454545",
            ]),
            SiteTheme::Orange2 => palette([
                "#FF6600", "#ff983f", "#ffffa1", "#F5F5F5", "#929292", "#1d1f21", "#444648",
                "#ffffff", "#f5f5f5", "#cccccc",
            ]),
            SiteTheme::Bordeaux => palette([
                "#bb2649", "#f35d74", "#ffc3d4", "#ffadad", "#ffd6a5", "#4b4f5d", "#6a738b",
                "#ffffff", "#f5f5f5", "#cccccc",
            ]),
            SiteTheme::Blue => palette([
                "#0077C2", "#59a5f5", "#c8ffff", "#00BFFF", "#00619a", "#333333", "#5c5c5c",
                "#FFFFFF", "#f5f5f5", "#cccccc",
            ]),
            SiteTheme::Yellow => palette([
                "#FFD700", "#ddb900", "#917800", "#c49216", "#5e3b00", "#dcdcdc", "#929292",
                "#1E1E1E", "#2d2d2d", "#454545",
            ]),
            SiteTheme::NeonBlue => palette([
                "#FF6B6B", "#dd4d51", "#8f001a", "#00FFFF", "#00999b", "#FFFFFF", "#e0e0e0",
                "#0F0F0F", "#1f1f1f", "#353535",
            ]),
            SiteTheme::BordeauxGray => palette([
                "#8B0000", "#c2402a", "#feded3", "#FF6347", "#8d0000", "#000000", "#565656",
                "#E9E9E9", "#dfdfdf", "#b7b7b7",
            ]),
            SiteTheme::BlackAndWhite => palette([
                "#FFFFFF", "#e0e0e0", "#9b9b9b", "#7F7F7F", "#ffffff", "#FFFFFF", "#777777",
                "#000000", "#161616", "#2c2c2c",
            ]),
        }
    }

    /// CSS custom properties for this theme, keyed by variable name
    pub fn css_variables(&self) -> BTreeMap<&'static str, String> {
        let p = self.palette();
        let pairs = [
            ("--background", p.bg100),
            ("--foreground", p.text100),
            ("--card", p.bg200),
            ("--card-foreground", p.text100),
            ("--popover", p.bg200),
            ("--popover-foreground", p.text100),
            ("--primary", p.primary100),
            ("--primary-foreground", p.text100),
            ("--secondary", p.bg200),
            ("--secondary-foreground", p.text100),
            ("--muted", p.bg300),
            ("--muted-foreground", p.text200),
            ("--accent", p.accent100),
            ("--accent-foreground", p.text100),
            ("--border", p.bg300),
            ("--input", p.bg200),
            ("--ring", p.primary200),
        ];

        pairs
            .into_iter()
            .filter_map(|(name, hex)| hex_to_hsl(hex).map(|hsl| (name, hsl)))
            .collect()
    }
}

impl fmt::Display for SiteTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SiteTheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SiteTheme::ALL
            .into_iter()
            .find(|theme| theme.name() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown theme: {}", s))
    }
}

/// Convert `#rrggbb` to `"H S% L%"` with rounded components.
/// Returns `None` for anything that is not six hex digits.
pub fn hex_to_hsl(hex: &str) -> Option<String> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |range: std::ops::Range<usize>| -> Option<f64> {
        u8::from_str_radix(&hex[range], 16)
            .ok()
            .map(|v| f64::from(v) / 255.0)
    };
    let (r, g, b) = (channel(0..2)?, channel(2..4)?, channel(4..6)?);

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let (mut h, mut s) = (0.0, 0.0);

    if max != min {
        let d = max - min;
        s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        h /= 6.0;
    }

    Some(format!(
        "{} {}% {}%",
        (h * 360.0).round() as i64,
        (s * 100.0).round() as i64,
        (l * 100.0).round() as i64
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_hsl_known_values() {
        assert_eq!(hex_to_hsl("#ffffff").as_deref(), Some("0 0% 100%"));
        assert_eq!(hex_to_hsl("#000000").as_deref(), Some("0 0% 0%"));
        assert_eq!(hex_to_hsl("#FF0000").as_deref(), Some("0 100% 50%"));
        assert_eq!(hex_to_hsl("#00ff00").as_deref(), Some("120 100% 50%"));
        assert_eq!(hex_to_hsl("0000ff").as_deref(), Some("240 100% 50%"));
    }

    #[test]
    fn test_hex_to_hsl_rejects_garbage() {
        assert_eq!(hex_to_hsl("#fff"), None);
        assert_eq!(hex_to_hsl("#gggggg"), None);
    }

    #[test]
    fn test_theme_names_round_trip() {
        for theme in SiteTheme::ALL {
            assert_eq!(theme.name().parse::<SiteTheme>().unwrap(), theme);
            assert_eq!(
                serde_json::to_value(theme).unwrap(),
                serde_json::Value::String(theme.name().to_string())
            );
        }
        assert!("magenta".parse::<SiteTheme>().is_err());
    }

    #[test]
    fn test_every_theme_produces_all_variables() {
        for theme in SiteTheme::ALL {
            assert_eq!(theme.css_variables().len(), 17, "{}", theme);
        }
        assert_eq!(SiteTheme::default(), SiteTheme::Purple);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn hsl_components_stay_in_range(r: u8, g: u8, b: u8) {
                let hsl = hex_to_hsl(&format!("#{:02x}{:02x}{:02x}", r, g, b)).unwrap();
                let parts: Vec<i64> = hsl
                    .split(' ')
                    .map(|p| p.trim_end_matches('%').parse().unwrap())
                    .collect();
                prop_assert_eq!(parts.len(), 3);
                prop_assert!((0..=360).contains(&parts[0]));
                prop_assert!((0..=100).contains(&parts[1]));
                prop_assert!((0..=100).contains(&parts[2]));
            }
        }
    }
}
