// Driver display colours with fallbacks for placeholder provider colours

use std::collections::HashMap;

pub const PLACEHOLDER_COLOR: &str = "#FFFFFF";
/// Substituted when both compared drivers end up with the same colour
pub const DISTINCT_PAIR: (&str, &str) = ("#1E41FF", "#E10600");

const TEAM_COLORS_FALLBACK: [(&str, &str); 19] = [
    ("Red Bull Racing", "#1E41FF"),
    ("Red Bull", "#3671C6"),
    ("Mercedes", "#00D2BE"),
    ("McLaren", "#FF8700"),
    ("Ferrari", "#DC0000"),
    ("Alpine", "#0090FF"),
    ("Alpine F1 Team", "#0090FF"),
    ("AlphaTauri", "#2B4562"),
    ("RB", "#6692FF"),
    ("Aston Martin", "#006F62"),
    ("Williams", "#005AFF"),
    ("Alfa Romeo", "#900000"),
    ("Alfa Romeo Racing", "#900000"),
    ("Kick Sauber", "#52E252"),
    ("Sauber", "#52E252"),
    ("Haas F1 Team", "#B6BABD"),
    ("Racing Point", "#F596C8"),
    ("Renault", "#FFF500"),
    ("Toro Rosso", "#469BFF"),
];

/// Whether a provider colour is the white placeholder some seasons report.
pub fn is_placeholder(color: &str) -> bool {
    let color = color.trim();
    color.eq_ignore_ascii_case("#FFFFFF") || color.eq_ignore_ascii_case("#FFF")
}

/// Static fallback colour for a team, if it is a known one.
pub fn team_fallback(team: &str) -> Option<&'static str> {
    TEAM_COLORS_FALLBACK
        .iter()
        .find(|(name, _)| *name == team)
        .map(|(_, color)| *color)
}

/// Resolves driver colours from provider-supplied values.
#[derive(Clone, Debug, Default)]
pub struct ColorPalette {
    provider: HashMap<String, String>,
}

impl ColorPalette {
    pub fn new(provider: HashMap<String, String>) -> Self {
        Self {
            provider: provider
                .into_iter()
                .map(|(driver, color)| (driver.to_uppercase(), color))
                .collect(),
        }
    }

    /// Colour for a driver: the provider colour unless it is missing or the
    /// white placeholder, then the team fallback, then the placeholder.
    pub fn color_for(&self, driver: &str, team: &str) -> String {
        match self.provider.get(&driver.to_uppercase()) {
            Some(color) if !is_placeholder(color) => color.clone(),
            _ => team_fallback(team).unwrap_or(PLACEHOLDER_COLOR).to_string(),
        }
    }

    /// Colours for a compared pair, guaranteed to differ.
    pub fn pair_for(&self, driver1: (&str, &str), driver2: (&str, &str)) -> (String, String) {
        distinct_pair(
            self.color_for(driver1.0, driver1.1),
            self.color_for(driver2.0, driver2.1),
        )
    }
}

/// Replace identical colours with a fixed distinguishable pair.
pub fn distinct_pair(color1: String, color2: String) -> (String, String) {
    if color1.eq_ignore_ascii_case(&color2) {
        (DISTINCT_PAIR.0.to_string(), DISTINCT_PAIR.1.to_string())
    } else {
        (color1, color2)
    }
}
