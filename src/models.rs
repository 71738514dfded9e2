//! Data models for the dashboard.
//!
//! This module contains the display records produced by the API clients
//! and consumed by the report generators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Weather condition, used to pick an icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Sunny,
    ClearNight,
    PartlyCloudy,
    PartlyCloudyNight,
    Cloudy,
    ModerateRain,
    LightDrizzle,
    LightRain,
    HeavyRain,
    PatchyLightRain,
    PatchyLightRainNight,
    Thunderstorm,
    CloudWithLightning,
    SmallClouds,
    SunBehindCloud,
    SunWithSmallCloud,
    SunnyWithWind,
    StrongWind,
    VeryHotSunny,
    /// Anything the classifier does not recognise.
    Unknown,
}

impl Condition {
    pub const ALL: [Condition; 20] = [
        Condition::Sunny,
        Condition::ClearNight,
        Condition::PartlyCloudy,
        Condition::PartlyCloudyNight,
        Condition::Cloudy,
        Condition::ModerateRain,
        Condition::LightDrizzle,
        Condition::LightRain,
        Condition::HeavyRain,
        Condition::PatchyLightRain,
        Condition::PatchyLightRainNight,
        Condition::Thunderstorm,
        Condition::CloudWithLightning,
        Condition::SmallClouds,
        Condition::SunBehindCloud,
        Condition::SunWithSmallCloud,
        Condition::SunnyWithWind,
        Condition::StrongWind,
        Condition::VeryHotSunny,
        Condition::Unknown,
    ];

    /// Configuration key, e.g. `partly_cloudy_night`.
    pub fn key(&self) -> &'static str {
        match self {
            Condition::Sunny => "sunny",
            Condition::ClearNight => "clear_night",
            Condition::PartlyCloudy => "partly_cloudy",
            Condition::PartlyCloudyNight => "partly_cloudy_night",
            Condition::Cloudy => "cloudy",
            Condition::ModerateRain => "moderate_rain",
            Condition::LightDrizzle => "light_drizzle",
            Condition::LightRain => "light_rain",
            Condition::HeavyRain => "heavy_rain",
            Condition::PatchyLightRain => "patchy_light_rain",
            Condition::PatchyLightRainNight => "patchy_light_rain_night",
            Condition::Thunderstorm => "thunderstorm",
            Condition::CloudWithLightning => "cloud_with_lightning",
            Condition::SmallClouds => "small_clouds",
            Condition::SunBehindCloud => "sun_behind_cloud",
            Condition::SunWithSmallCloud => "sun_with_small_cloud",
            Condition::SunnyWithWind => "sunny_with_wind",
            Condition::StrongWind => "strong_wind",
            Condition::VeryHotSunny => "very_hot_sunny",
            Condition::Unknown => "unknown",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| c.key() == key)
    }

    /// Classify a provider's condition text. First matching rule wins.
    pub fn classify(text: &str, is_day: bool) -> Self {
        let text = text.to_lowercase();
        let has = |needle: &str| text.contains(needle);

        if has("sunny") || has("clear") {
            if is_day {
                Condition::Sunny
            } else {
                Condition::ClearNight
            }
        } else if has("partly cloudy") {
            if is_day {
                Condition::PartlyCloudy
            } else {
                Condition::PartlyCloudyNight
            }
        } else if has("cloudy") || has("overcast") {
            Condition::Cloudy
        } else if has("rain") && !has("light") {
            Condition::HeavyRain
        } else if has("light rain") || has("drizzle") {
            Condition::LightRain
        } else if has("thunderstorm") {
            Condition::Thunderstorm
        } else if has("snow") {
            Condition::SmallClouds
        } else if has("mist") || has("fog") || has("haze") {
            Condition::SunBehindCloud
        } else if has("wind") {
            Condition::StrongWind
        } else {
            Condition::Unknown
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Condition::Sunny => "Sunny",
            Condition::ClearNight => "Clear (night)",
            Condition::PartlyCloudy => "Partly cloudy",
            Condition::PartlyCloudyNight => "Partly cloudy (night)",
            Condition::Cloudy => "Cloudy",
            Condition::ModerateRain => "Moderate rain",
            Condition::LightDrizzle => "Light drizzle",
            Condition::LightRain => "Light rain",
            Condition::HeavyRain => "Heavy rain",
            Condition::PatchyLightRain => "Patchy light rain",
            Condition::PatchyLightRainNight => "Patchy light rain (night)",
            Condition::Thunderstorm => "Thunderstorm",
            Condition::CloudWithLightning => "Cloud with lightning",
            Condition::SmallClouds => "Small clouds",
            Condition::SunBehindCloud => "Sun behind a cloud",
            Condition::SunWithSmallCloud => "Sun with a small cloud",
            Condition::SunnyWithWind => "Sunny with wind",
            Condition::StrongWind => "Strong wind",
            Condition::VeryHotSunny => "Very hot",
            Condition::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// Maps conditions to display assets (emoji by default, or asset paths).
#[derive(Debug, Clone, PartialEq)]
pub struct IconTable {
    /// Asset for conditions missing from the table, including `Unknown`.
    pub fallback: String,
    icons: HashMap<Condition, String>,
}

impl Default for IconTable {
    fn default() -> Self {
        let icons = [
            (Condition::Sunny, "☀️"),
            (Condition::ClearNight, "🌙"),
            (Condition::PartlyCloudy, "⛅"),
            (Condition::PartlyCloudyNight, "☁️🌙"),
            (Condition::Cloudy, "☁️"),
            (Condition::ModerateRain, "🌧️"),
            (Condition::LightDrizzle, "🌦️"),
            (Condition::LightRain, "🌦️"),
            (Condition::HeavyRain, "🌧️"),
            (Condition::PatchyLightRain, "🌦️"),
            (Condition::PatchyLightRainNight, "🌧️🌙"),
            (Condition::Thunderstorm, "⛈️"),
            (Condition::CloudWithLightning, "🌩️"),
            (Condition::SmallClouds, "🌥️"),
            (Condition::SunBehindCloud, "🌤️"),
            (Condition::SunWithSmallCloud, "🌤️"),
            (Condition::SunnyWithWind, "🌬️"),
            (Condition::StrongWind, "💨"),
            (Condition::VeryHotSunny, "🔥"),
        ]
        .into_iter()
        .map(|(condition, icon)| (condition, icon.to_string()))
        .collect();

        Self {
            fallback: "☀️".to_string(),
            icons,
        }
    }
}

impl IconTable {
    /// Replace individual entries. `Unknown` always resolves to the fallback.
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = (Condition, String)>) -> Self {
        for (condition, icon) in overrides {
            if condition != Condition::Unknown {
                self.icons.insert(condition, icon);
            }
        }
        self
    }

    /// Resolve the asset for a condition.
    pub fn icon(&self, condition: Condition) -> &str {
        self.icons
            .get(&condition)
            .map(String::as_str)
            .unwrap_or(&self.fallback)
    }
}

/// Temperatures in whole degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub temperature: i32,
    pub high: i32,
    pub low: i32,
}

impl Reading {
    /// Derive the reading from a raw temperature, with the high/low band
    /// `spread` degrees either side.
    pub fn from_celsius(temp_c: f64, spread: f64) -> Self {
        Self {
            temperature: round_half_up(temp_c),
            high: round_half_up(temp_c + spread),
            low: round_half_up(temp_c - spread),
        }
    }
}

/// Halves round towards positive infinity, so -1.5 becomes -1.
fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

/// One city's card on the weather dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city: String,
    pub condition: Condition,
    /// Provider's condition text.
    pub summary: String,
    /// `None` when the city could not be fetched.
    pub reading: Option<Reading>,
}

impl WeatherReport {
    /// Placeholder for a city whose request failed.
    pub fn unavailable(city: &str) -> Self {
        Self {
            city: city.to_string(),
            condition: Condition::Unknown,
            summary: "Unavailable".to_string(),
            reading: None,
        }
    }

    #[allow(dead_code)]
    pub fn is_available(&self) -> bool {
        self.reading.is_some()
    }
}

/// A weather dashboard run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub generated_at: DateTime<Utc>,
    pub reports: Vec<WeatherReport>,
    /// Cities that fell back to a placeholder.
    pub failed: Vec<String>,
}

/// A quote from the quote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: u64,
    pub quote: String,
    pub author: String,
}

/// An ordered set of quotes with a wrap-around cursor.
#[derive(Debug, Clone, Default)]
pub struct QuoteDeck {
    quotes: Vec<Quote>,
    position: usize,
}

impl QuoteDeck {
    pub fn new(quotes: Vec<Quote>) -> Self {
        Self {
            quotes,
            position: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn current(&self) -> Option<&Quote> {
        self.quotes.get(self.position)
    }

    /// Jump to `index`, wrapping past the end.
    pub fn seek(&mut self, index: usize) -> Option<&Quote> {
        if self.quotes.is_empty() {
            return None;
        }
        self.position = index % self.quotes.len();
        self.current()
    }

    pub fn next(&mut self) -> Option<&Quote> {
        if self.quotes.is_empty() {
            return None;
        }
        self.position = (self.position + 1) % self.quotes.len();
        self.current()
    }

    pub fn previous(&mut self) -> Option<&Quote> {
        if self.quotes.is_empty() {
            return None;
        }
        let len = self.quotes.len();
        self.position = (self.position + len - 1) % len;
        self.current()
    }
}

/// Rendered body of a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", content = "content", rename_all = "lowercase")]
pub enum PostBody {
    Markdown(String),
    Plain(Vec<String>),
    Empty,
}

impl PostBody {
    /// Classify flattened content text.
    pub fn from_text(text: &str) -> Self {
        if text.trim().is_empty() {
            PostBody::Empty
        } else if text.contains("**") || text.contains('*') || text.contains('#') {
            PostBody::Markdown(text.to_string())
        } else {
            PostBody::Plain(text.lines().map(String::from).collect())
        }
    }
}

/// A news post ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub slug: String,
    pub author: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    /// Short teaser shown on feed cards.
    pub excerpt: String,
    pub body: PostBody,
}

/// One page of the news feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub page: u32,
    pub page_count: u32,
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

/// Result of looking up one post among several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PostView {
    Found(Post),
    Missing { reference: String, reason: String },
}

const EXCERPT_CHARS: usize = 150;

/// Card teaser: the post's own excerpt, else the start of its content.
pub fn excerpt(own: Option<&str>, content: &str) -> String {
    if let Some(own) = own.map(str::trim).filter(|e| !e.is_empty()) {
        return own.to_string();
    }

    let text = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return "No excerpt available".to_string();
    }

    let mut teaser: String = text.chars().take(EXCERPT_CHARS).collect();
    teaser.push_str("...");
    teaser
}

/// Build a URL slug from a post title.
///
/// Whitespace runs become `-`, then anything outside `[a-z0-9-]` is dropped.
pub fn slugify(title: Option<&str>, id: u64) -> String {
    let Some(title) = title else {
        return format!("post-{}", id);
    };

    let mut slug = String::with_capacity(title.len());
    let mut in_space = false;
    for c in title.to_lowercase().chars() {
        if c.is_whitespace() {
            if !in_space {
                slug.push('-');
                in_space = true;
            }
            continue;
        }
        in_space = false;
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            slug.push(c);
        }
    }
    slug
}
