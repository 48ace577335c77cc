use serde::{Deserialize, Serialize};

/// Canonical sky-state classification shared by every provider.
///
/// Variant order is significant: it is the tie-break order used when picking
/// a predominant condition over a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    #[default]
    Sunny,
    Cloudy,
    Rainy,
    Windy,
    Stormy,
    Snowy,
}

impl Condition {
    pub const ALL: [Condition; 6] = [
        Condition::Sunny,
        Condition::Cloudy,
        Condition::Rainy,
        Condition::Windy,
        Condition::Stormy,
        Condition::Snowy,
    ];

    /// Classify an OpenWeather-style numeric condition id.
    ///
    /// Unknown ids fall back to [`Condition::Sunny`].
    pub fn from_code(code: i64) -> Self {
        match code {
            200..=299 => Condition::Stormy,
            300..=399 | 500..=599 => Condition::Rainy,
            600..=699 => Condition::Snowy,
            700..=799 => Condition::Cloudy,
            800 => Condition::Sunny,
            801..=899 => Condition::Cloudy,
            _ => Condition::Sunny,
        }
    }

    /// Classify a free-text description such as "Patchy light drizzle".
    ///
    /// Keyword groups are checked in priority order, so "thundery showers"
    /// is stormy rather than rainy.
    pub fn from_description(text: &str) -> Self {
        const RULES: &[(&[&str], Condition)] = &[
            (&["thunder", "storm"], Condition::Stormy),
            (&["rain", "drizzle", "shower"], Condition::Rainy),
            (&["snow", "sleet", "blizzard", "ice"], Condition::Snowy),
            (&["cloud", "overcast", "fog", "mist"], Condition::Cloudy),
            (&["sunny", "clear"], Condition::Sunny),
            (&["wind", "gale"], Condition::Windy),
        ];

        let lower = text.to_lowercase();

        RULES
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(_, condition)| *condition)
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Sunny => "sunny",
            Condition::Cloudy => "cloudy",
            Condition::Rainy => "rainy",
            Condition::Windy => "windy",
            Condition::Stormy => "stormy",
            Condition::Snowy => "snowy",
        }
    }

    /// Position in [`Condition::ALL`].
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}
