//! The closed set of study-artifact kinds.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Kind of AI-generated study artifact a task produces.
///
/// The set is closed on purpose: adding a kind is a compile-time obligation
/// to extend every exhaustive match over it (viewer dispatch, parameter
/// validation, endpoint mapping).  Wire values use the kebab-case form,
/// e.g. `"code-exercise"`; unknown wire values fail to parse and are
/// handled at the boundary, never by a fallback variant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ArtifactKind {
    Quiz,
    Flashcards,
    Podcast,
    Video,
    Mindmap,
    Summary,
    Discussion,
    Timeline,
    CodeExercise,
}

impl ArtifactKind {
    /// Path segment of the kind-specific generation endpoint.
    pub fn endpoint_segment(self) -> &'static str {
        self.into()
    }
}
