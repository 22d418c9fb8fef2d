//! Identifier types for the planning domain.

use super::PlanDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the wrapped UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl AsRef<Uuid> for $name {
            fn as_ref(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_identifier!(
    /// Unique identifier for a task. Only meaningful within its owning plan.
    TaskId
);

uuid_identifier!(
    /// Unique identifier for a plan.
    PlanId
);

uuid_identifier!(
    /// Unique identifier for the project that owns a plan.
    ProjectId
);

uuid_identifier!(
    /// Identifier of the planning session a plan was extracted from.
    SessionId
);

macro_rules! external_identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a validated identifier.
            ///
            /// # Errors
            ///
            /// Returns [`PlanDomainError::EmptyExternalId`] when the value is
            /// empty after trimming.
            pub fn new(value: impl Into<String>) -> Result<Self, PlanDomainError> {
                let raw = value.into();
                let normalized = raw.trim();
                if normalized.is_empty() {
                    return Err(PlanDomainError::EmptyExternalId($kind));
                }
                Ok(Self(normalized.to_owned()))
            }

            /// Returns the identifier as `str`.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

external_identifier!(
    /// Issue identifier assigned by the external tracker.
    ExternalIssueId,
    "issue"
);

external_identifier!(
    /// Project identifier in the external tracker.
    ExternalProjectId,
    "project"
);
