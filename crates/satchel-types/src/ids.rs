//! Opaque identifier newtypes.
//!
//! All of these are server-assigned strings; the client never parses or
//! synthesizes their contents, it only stores and echoes them.

use serde::{Deserialize, Serialize};

macro_rules! opaque_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

opaque_id! {
    /// Identifier of one generation task, unique within a workspace and
    /// never reused.
    TaskId
}

opaque_id! {
    /// Identifier of an uploaded source document.
    FileId
}

opaque_id! {
    /// Identifier of the notebook workspace that owns tasks and files.
    WorkspaceId
}

opaque_id! {
    /// Server-side pointer to a finished task's result payload.
    ResultRef
}
