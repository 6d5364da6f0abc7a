// crates/grc-core/src/identifiers.rs
// ============================================================================
// Module: GRC Identifiers
// Description: Opaque identifiers for users, controls, tickets, documents, and records.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every persisted entity is addressed by an opaque string identifier. Store
//! generated ids are UUIDv4 strings; control library ids are catalog codes such
//! as `CIS-1.1`. Identifiers are not validated here; the store and the request
//! layer reject unknown ids at their boundaries.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Macro
// ============================================================================

/// Declares a transparent string identifier with the shared accessor set.
macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns true when the identifier is blank.
            #[must_use]
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

string_identifier!(
    /// Platform user identifier.
    UserId
);

string_identifier!(
    /// Control catalog code such as `ISO27001-A.5.1`.
    ControlLibraryId
);

string_identifier!(
    /// Organization-specific activated control identifier.
    ActivatedControlId
);

string_identifier!(
    /// Evidence log entry identifier.
    EvidenceId
);

string_identifier!(
    /// Ticket identifier (distinct from the human-facing sequential number).
    TicketId
);

string_identifier!(
    /// Ticket comment identifier.
    CommentId
);

string_identifier!(
    /// In-app notification identifier.
    NotificationId
);

string_identifier!(
    /// Asset inventory identifier.
    AssetId
);

string_identifier!(
    /// Risk assessment identifier.
    RiskId
);

string_identifier!(
    /// GDPR data-subject request identifier.
    DsrId
);

string_identifier!(
    /// Policy document identifier.
    DocumentId
);

string_identifier!(
    /// Document version identifier.
    DocumentVersionId
);

string_identifier!(
    /// Third-party vendor identifier.
    VendorId
);

string_identifier!(
    /// Vendor assessment identifier.
    VendorAssessmentId
);

string_identifier!(
    /// Record of processing activities entry identifier.
    RopaId
);

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::ControlLibraryId;
    use super::UserId;

    #[test]
    fn identifiers_serialize_as_plain_strings() {
        let id = ControlLibraryId::new("CIS-1.1");
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, "\"CIS-1.1\"");
    }

    #[test]
    fn blank_identifiers_are_detected() {
        assert!(UserId::new("  ").is_blank());
        assert!(!UserId::from("u-1").is_blank());
    }
}
