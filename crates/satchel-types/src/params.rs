//! Per-kind generation parameters and their pre-flight validation.
//!
//! Every artifact kind has its own parameter shape; the closed enum makes
//! the kind ↔ parameters pairing a compile-time fact instead of a runtime
//! convention.  Validation happens before any network call is issued.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kind::ArtifactKind;

/// Inclusive bound on quiz questions per task.
pub const QUIZ_QUESTIONS: RangeInclusive<u16> = 1..=50;
/// Inclusive bound on flashcards per deck.
pub const FLASHCARDS_PER_DECK: RangeInclusive<u16> = 1..=200;
/// Inclusive bound on discussion prompts per task.
pub const DISCUSSION_PROMPTS: RangeInclusive<u16> = 1..=20;
/// Inclusive bound on code exercises per task.
pub const CODE_EXERCISES: RangeInclusive<u16> = 1..=10;
/// Inclusive bound on mindmap depth.
pub const MINDMAP_DEPTH: RangeInclusive<u16> = 1..=6;

/// Pre-flight parameter rejection; never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no source files selected")]
    EmptySourceSelection,

    #[error("{field} must be between {min} and {max}, got {got}")]
    CountOutOfRange {
        field: &'static str,
        got: u16,
        min: u16,
        max: u16,
    },

    #[error("difficulty mix must sum to 100, got {got}")]
    DifficultyMixSum { got: u16 },
}

/// Share of easy/medium/hard questions in a quiz, in percent.
///
/// The three shares must sum to exactly 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyMix {
    pub easy: u8,
    pub medium: u8,
    pub hard: u8,
}

impl DifficultyMix {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let got = self.easy as u16 + self.medium as u16 + self.hard as u16;
        if got != 100 {
            return Err(ValidationError::DifficultyMixSum { got });
        }
        Ok(())
    }
}

impl Default for DifficultyMix {
    fn default() -> Self {
        Self {
            easy: 25,
            medium: 50,
            hard: 25,
        }
    }
}

/// Kind-specific configuration for a generation request.
///
/// `guidance` is optional free text passed through to the generator
/// unvalidated; everything countable is bounds-checked by [`validate`].
///
/// [`validate`]: GenerationParams::validate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum GenerationParams {
    Quiz {
        question_count: u16,
        #[serde(default)]
        difficulty: DifficultyMix,
        #[serde(default)]
        language: Option<String>,
        #[serde(default)]
        guidance: Option<String>,
    },
    Flashcards {
        card_count: u16,
        #[serde(default)]
        language: Option<String>,
        #[serde(default)]
        guidance: Option<String>,
    },
    Podcast {
        #[serde(default)]
        voice: Option<String>,
        #[serde(default)]
        language: Option<String>,
        #[serde(default)]
        guidance: Option<String>,
    },
    Video {
        #[serde(default)]
        language: Option<String>,
        #[serde(default)]
        guidance: Option<String>,
    },
    Mindmap {
        max_depth: u16,
        #[serde(default)]
        guidance: Option<String>,
    },
    Summary {
        #[serde(default)]
        language: Option<String>,
        #[serde(default)]
        guidance: Option<String>,
    },
    Discussion {
        prompt_count: u16,
        #[serde(default)]
        guidance: Option<String>,
    },
    Timeline {
        #[serde(default)]
        guidance: Option<String>,
    },
    CodeExercise {
        exercise_count: u16,
        /// Programming language of the generated exercises.
        #[serde(default)]
        language: Option<String>,
        #[serde(default)]
        guidance: Option<String>,
    },
}

impl GenerationParams {
    /// The artifact kind these parameters configure.
    pub fn kind(&self) -> ArtifactKind {
        match self {
            GenerationParams::Quiz { .. } => ArtifactKind::Quiz,
            GenerationParams::Flashcards { .. } => ArtifactKind::Flashcards,
            GenerationParams::Podcast { .. } => ArtifactKind::Podcast,
            GenerationParams::Video { .. } => ArtifactKind::Video,
            GenerationParams::Mindmap { .. } => ArtifactKind::Mindmap,
            GenerationParams::Summary { .. } => ArtifactKind::Summary,
            GenerationParams::Discussion { .. } => ArtifactKind::Discussion,
            GenerationParams::Timeline { .. } => ArtifactKind::Timeline,
            GenerationParams::CodeExercise { .. } => ArtifactKind::CodeExercise,
        }
    }

    /// Check every countable field against its inclusive bound.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            GenerationParams::Quiz {
                question_count,
                difficulty,
                ..
            } => {
                check_range("questionCount", *question_count, &QUIZ_QUESTIONS)?;
                difficulty.validate()
            }
            GenerationParams::Flashcards { card_count, .. } => {
                check_range("cardCount", *card_count, &FLASHCARDS_PER_DECK)
            }
            GenerationParams::Mindmap { max_depth, .. } => {
                check_range("maxDepth", *max_depth, &MINDMAP_DEPTH)
            }
            GenerationParams::Discussion { prompt_count, .. } => {
                check_range("promptCount", *prompt_count, &DISCUSSION_PROMPTS)
            }
            GenerationParams::CodeExercise { exercise_count, .. } => {
                check_range("exerciseCount", *exercise_count, &CODE_EXERCISES)
            }
            GenerationParams::Podcast { .. }
            | GenerationParams::Video { .. }
            | GenerationParams::Summary { .. }
            | GenerationParams::Timeline { .. } => Ok(()),
        }
    }
}

fn check_range(
    field: &'static str,
    got: u16,
    range: &RangeInclusive<u16>,
) -> Result<(), ValidationError> {
    if range.contains(&got) {
        Ok(())
    } else {
        Err(ValidationError::CountOutOfRange {
            field,
            got,
            min: *range.start(),
            max: *range.end(),
        })
    }
}
