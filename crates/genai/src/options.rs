/// Generation options exposed to the user: aspect ratio, output type,
/// video duration and animation style.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "3:4")]
    Tall,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Landscape,
        AspectRatio::Portrait,
        AspectRatio::Standard,
        AspectRatio::Tall,
    ];

    /// Ratio as sent to the backend, e.g. `16:9`
    pub fn value(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Standard => "4:3",
            Self::Tall => "3:4",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Square => "Square (1:1)",
            Self::Landscape => "Landscape (16:9)",
            Self::Portrait => "Portrait (9:16)",
            Self::Standard => "Standard (4:3)",
            Self::Tall => "Tall (3:4)",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ratio| ratio.value() == s.trim())
            .ok_or_else(|| format!("unknown aspect ratio '{s}' (expected one of 1:1, 16:9, 9:16, 4:3, 3:4)"))
    }
}

/// Kind of design the user wants to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputType {
    #[default]
    CinematicPoster,
    WeddingCard,
    BirthdayCard,
    Flier,
    PinterestPin,
    FacebookPost,
    Banner,
}

impl OutputType {
    pub const ALL: [OutputType; 7] = [
        OutputType::CinematicPoster,
        OutputType::WeddingCard,
        OutputType::BirthdayCard,
        OutputType::Flier,
        OutputType::PinterestPin,
        OutputType::FacebookPost,
        OutputType::Banner,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::CinematicPoster => "cinematic-poster",
            Self::WeddingCard => "wedding-card",
            Self::BirthdayCard => "birthday-card",
            Self::Flier => "flier",
            Self::PinterestPin => "pinterest-pin",
            Self::FacebookPost => "facebook-post",
            Self::Banner => "banner",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::CinematicPoster => "Cinematic Poster",
            Self::WeddingCard => "Wedding Card",
            Self::BirthdayCard => "Birthday Card",
            Self::Flier => "Flier",
            Self::PinterestPin => "Pinterest Pin",
            Self::FacebookPost => "Facebook Post",
            Self::Banner => "Banner",
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for OutputType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.key() == needle || kind.label().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("unknown output type '{s}'"))
    }
}

/// Camera/motion style applied when animating an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnimationStyle {
    #[default]
    SubtleParallax,
    GentleMotion,
    CinematicZoomIn,
    CinematicZoomOut,
    DollyLeft,
    DollyRight,
    PanUp,
    PanDown,
}

impl AnimationStyle {
    pub const ALL: [AnimationStyle; 8] = [
        AnimationStyle::SubtleParallax,
        AnimationStyle::GentleMotion,
        AnimationStyle::CinematicZoomIn,
        AnimationStyle::CinematicZoomOut,
        AnimationStyle::DollyLeft,
        AnimationStyle::DollyRight,
        AnimationStyle::PanUp,
        AnimationStyle::PanDown,
    ];

    /// Phrase used inside the video prompt
    pub fn phrase(&self) -> &'static str {
        match self {
            Self::SubtleParallax => "subtle parallax",
            Self::GentleMotion => "gentle motion",
            Self::CinematicZoomIn => "cinematic zoom in",
            Self::CinematicZoomOut => "cinematic zoom out",
            Self::DollyLeft => "dolly left",
            Self::DollyRight => "dolly right",
            Self::PanUp => "pan up",
            Self::PanDown => "pan down",
        }
    }
}

impl fmt::Display for AnimationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.phrase())
    }
}

impl FromStr for AnimationStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().replace('-', " ");
        Self::ALL
            .into_iter()
            .find(|style| style.phrase().eq_ignore_ascii_case(&needle))
            .ok_or_else(|| format!("unknown animation style '{s}'"))
    }
}

/// Video length in whole seconds, bounded to what the video model accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct VideoDuration(u32);

impl VideoDuration {
    pub const MIN_SECS: u32 = 2;
    pub const MAX_SECS: u32 = 10;

    pub fn new(secs: u32) -> Result<Self, String> {
        if (Self::MIN_SECS..=Self::MAX_SECS).contains(&secs) {
            Ok(Self(secs))
        } else {
            Err(format!(
                "video duration must be between {} and {} seconds, got {secs}",
                Self::MIN_SECS,
                Self::MAX_SECS
            ))
        }
    }

    pub fn secs(&self) -> u32 {
        self.0
    }
}

impl Default for VideoDuration {
    fn default() -> Self {
        Self(4)
    }
}

impl TryFrom<u32> for VideoDuration {
    type Error = String;

    fn try_from(secs: u32) -> Result<Self, Self::Error> {
        Self::new(secs)
    }
}

impl From<VideoDuration> for u32 {
    fn from(duration: VideoDuration) -> Self {
        duration.0
    }
}

impl fmt::Display for VideoDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}
