// Emotion - the closed label set predicted by the classifier
//
// Labels come from the two-digit emotion code embedded in RAVDESS-style
// filenames. Codes outside the table map to `Unknown` rather than failing,
// so a stray file never aborts a labeling run.

use std::fmt;
use std::str::FromStr;

/// Emotion label for a speech clip
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Emotion {
    Neutral,
    Calm,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgust,
    Surprised,
    /// Emotion code not in the lookup table
    Unknown,
}

impl Emotion {
    /// The eight labels with a filename code, in code order
    pub const KNOWN: [Emotion; 8] = [
        Emotion::Neutral,
        Emotion::Calm,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Fearful,
        Emotion::Disgust,
        Emotion::Surprised,
    ];

    /// Map a two-digit filename code ("01".."08") to its label
    pub fn from_code(code: &str) -> Self {
        match code {
            "01" => Emotion::Neutral,
            "02" => Emotion::Calm,
            "03" => Emotion::Happy,
            "04" => Emotion::Sad,
            "05" => Emotion::Angry,
            "06" => Emotion::Fearful,
            "07" => Emotion::Disgust,
            "08" => Emotion::Surprised,
            _ => Emotion::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Neutral => "Neutral",
            Emotion::Calm => "Calm",
            Emotion::Happy => "Happy",
            Emotion::Sad => "Sad",
            Emotion::Angry => "Angry",
            Emotion::Fearful => "Fearful",
            Emotion::Disgust => "Disgust",
            Emotion::Surprised => "Surprised",
            Emotion::Unknown => "Unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Emotion::Unknown)
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a CSV cell does not name an emotion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEmotionError(pub String);

impl fmt::Display for ParseEmotionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognised emotion label '{}'", self.0)
    }
}

impl std::error::Error for ParseEmotionError {}

impl FromStr for Emotion {
    type Err = ParseEmotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Emotion::KNOWN
            .iter()
            .copied()
            .chain(std::iter::once(Emotion::Unknown))
            .find(|emotion| emotion.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseEmotionError(trimmed.to_string()))
    }
}
