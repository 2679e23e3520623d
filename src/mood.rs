//! Mood label to audio feature target ranges

use std::fmt;

use serde::Serialize;

/// Emotion tag handed over by the mood detector
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoodLabel {
    Happy,
    Sad,
    Angry,
    Neutral,
    Surprise,
    Disgust,
    Fear,
    Unrecognized(String),
}

impl MoodLabel {
    /// Case-insensitive parse; anything outside the vocabulary is kept verbatim
    pub fn parse(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "happy" => Self::Happy,
            "sad" => Self::Sad,
            "angry" => Self::Angry,
            "neutral" => Self::Neutral,
            "surprise" => Self::Surprise,
            "disgust" => Self::Disgust,
            "fear" => Self::Fear,
            _ => Self::Unrecognized(label.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Neutral => "neutral",
            Self::Surprise => "surprise",
            Self::Disgust => "disgust",
            Self::Fear => "fear",
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl From<&str> for MoodLabel {
    fn from(label: &str) -> Self {
        Self::parse(label)
    }
}

impl fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive target range that is always fully bounded
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TargetRange {
    pub min: f64,
    pub max: f64,
}

impl TargetRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Range whose bounds may each be absent; an absent bound leaves the feature unconstrained
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize)]
pub struct FeatureRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl FeatureRange {
    pub const UNCONSTRAINED: Self = Self { min: None, max: None };

    pub const fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub const fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub const fn at_most(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Feature targets used to bias a recommendation query.
///
/// Valence and energy are always bounded. Loudness (dB, negative), acousticness
/// and danceability are only constrained for specific moods.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AudioFeatureProfile {
    pub valence: TargetRange,
    pub energy: TargetRange,
    pub loudness: FeatureRange,
    pub acousticness: FeatureRange,
    pub danceability: FeatureRange,
}

impl AudioFeatureProfile {
    pub const fn new(valence: TargetRange, energy: TargetRange) -> Self {
        Self {
            valence,
            energy,
            loudness: FeatureRange::UNCONSTRAINED,
            acousticness: FeatureRange::UNCONSTRAINED,
            danceability: FeatureRange::UNCONSTRAINED,
        }
    }

    pub const fn with_loudness(mut self, range: FeatureRange) -> Self {
        self.loudness = range;
        self
    }

    pub const fn with_acousticness(mut self, range: FeatureRange) -> Self {
        self.acousticness = range;
        self
    }

    pub const fn with_danceability(mut self, range: FeatureRange) -> Self {
        self.danceability = range;
        self
    }

    /// Optional features in serialization order, paired with their parameter stem
    pub fn optional_features(&self) -> [(&'static str, FeatureRange); 3] {
        [
            ("loudness", self.loudness),
            ("acousticness", self.acousticness),
            ("danceability", self.danceability),
        ]
    }
}

/// Maps a mood to its feature profile. Never fails.
///
/// Unrecognized moods get a single-point 0.5 range for valence and energy and
/// nothing else.
pub fn feature_profile(mood: &MoodLabel) -> AudioFeatureProfile {
    match mood {
        MoodLabel::Happy | MoodLabel::Surprise => {
            AudioFeatureProfile::new(TargetRange::new(0.7, 1.0), TargetRange::new(0.6, 0.9))
                .with_danceability(FeatureRange::between(0.7, 1.0))
        }
        MoodLabel::Sad | MoodLabel::Disgust | MoodLabel::Fear => {
            AudioFeatureProfile::new(TargetRange::new(0.0, 0.3), TargetRange::new(0.3, 0.5))
                .with_acousticness(FeatureRange::between(0.6, 1.0))
        }
        MoodLabel::Angry => {
            AudioFeatureProfile::new(TargetRange::new(0.0, 0.3), TargetRange::new(0.8, 1.0))
                .with_loudness(FeatureRange::at_least(-5.0))
        }
        MoodLabel::Neutral => {
            AudioFeatureProfile::new(TargetRange::new(0.4, 0.6), TargetRange::new(0.4, 0.6))
                .with_acousticness(FeatureRange::between(0.3, 0.6))
        }
        MoodLabel::Unrecognized(_) => {
            AudioFeatureProfile::new(TargetRange::new(0.5, 0.5), TargetRange::new(0.5, 0.5))
        }
    }
}

/// Convenience for raw labels straight from the detector
pub fn feature_profile_for(label: &str) -> AudioFeatureProfile {
    feature_profile(&MoodLabel::parse(label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!(MoodLabel::parse("HAPPY"), MoodLabel::Happy);
        assert_eq!(MoodLabel::parse("Surprise"), MoodLabel::Surprise);
        assert_eq!(MoodLabel::parse("fEaR"), MoodLabel::Fear);
        assert_eq!(
            MoodLabel::parse("Bored"),
            MoodLabel::Unrecognized("Bored".to_string())
        );
    }

    #[test]
    fn happy_and_surprise_are_danceable() {
        for label in ["happy", "surprise"] {
            let profile = feature_profile_for(label);
            assert_eq!(profile.valence, TargetRange::new(0.7, 1.0));
            assert_eq!(profile.energy, TargetRange::new(0.6, 0.9));
            assert_eq!(profile.danceability, FeatureRange::between(0.7, 1.0));
            assert!(profile.loudness.is_unconstrained());
            assert!(profile.acousticness.is_unconstrained());
        }
    }

    #[test]
    fn sad_disgust_fear_are_acoustic() {
        for label in ["sad", "disgust", "fear"] {
            let profile = feature_profile_for(label);
            assert_eq!(profile.valence, TargetRange::new(0.0, 0.3));
            assert_eq!(profile.energy, TargetRange::new(0.3, 0.5));
            assert_eq!(profile.acousticness, FeatureRange::between(0.6, 1.0));
            assert!(profile.loudness.is_unconstrained());
            assert!(profile.danceability.is_unconstrained());
        }
    }

    #[test]
    fn angry_only_sets_min_loudness() {
        let profile = feature_profile_for("Angry");
        assert_eq!(profile.valence, TargetRange::new(0.0, 0.3));
        assert_eq!(profile.energy, TargetRange::new(0.8, 1.0));
        assert_eq!(profile.loudness.min, Some(-5.0));
        assert_eq!(profile.loudness.max, None);
        assert!(profile.acousticness.is_unconstrained());
        assert!(profile.danceability.is_unconstrained());
    }

    #[test]
    fn neutral_is_balanced() {
        let profile = feature_profile_for("neutral");
        assert_eq!(profile.valence, TargetRange::new(0.4, 0.6));
        assert_eq!(profile.energy, TargetRange::new(0.4, 0.6));
        assert_eq!(profile.acousticness, FeatureRange::between(0.3, 0.6));
        assert!(profile.danceability.is_unconstrained());
    }

    #[test]
    fn unrecognized_mood_yields_single_point_ranges() {
        for label in ["", "bored", "contempt", "happy "] {
            let profile = feature_profile_for(label);
            assert_eq!(profile.valence, TargetRange::new(0.5, 0.5));
            assert_eq!(profile.energy, TargetRange::new(0.5, 0.5));
            assert!(profile.optional_features().iter().all(|(_, r)| r.is_unconstrained()));
        }
    }
}
