//! Error types for template composition and topology resolution.
//!
//! Stackform distinguishes two broad failure classes:
//!
//! 1. **Contract violations** - the baseline template is assumed to have a
//!    canonical shape produced by the upstream assembly collaborator. A
//!    missing resource, property, or payload marker means that collaborator
//!    produced a malformed graph; these errors are fatal and are never caught
//!    inside this crate.
//! 2. **Lookup outcomes** - resolving a parent stack can fail because the
//!    stack does not exist ([`StackformError::StackNotFound`], recovered as
//!    "nothing to inherit") or for any other reason
//!    ([`StackformError::StackLookupFailed`], propagated unchanged).
//!
//! Per-item validation failures (e.g. an unparsable replica count on one
//! cache request) are not errors at all: the offending item is logged and
//! skipped, and processing continues.
//!
//! Operations return [`anyhow::Result`]; match on the typed variant with
//! `err.downcast_ref::<StackformError>()` where the distinction matters.

use thiserror::Error;

/// The main error type for stackform operations.
#[derive(Error, Debug)]
pub enum StackformError {
    /// An expected resource is absent from the template.
    ///
    /// Raised when a transformation needs a piece of the canonical baseline
    /// subgraph (e.g. the launch configuration) and it is not there. Also the
    /// error a second spot-fleet transformation fails with, since the first
    /// one removed the subgraph.
    #[error("template is missing expected resource '{name}'")]
    ResourceMissing {
        /// Logical ID of the missing resource
        name: String,
    },

    /// A resource exists but lacks an expected property.
    #[error("resource '{resource}' is missing expected property '{property}'")]
    PropertyMissing {
        /// Logical ID of the resource
        resource: String,
        /// Property path that was expected under `Properties`
        property: String,
    },

    /// A property exists but does not have the shape the contract requires.
    ///
    /// # Fields
    /// - `expected`: short description of the required shape (e.g. "a list of
    ///   `{\"Ref\": ..}` entries")
    #[error("resource '{resource}' property '{property}' has an unexpected shape (expected {expected})")]
    PropertyShape {
        /// Logical ID of the resource
        resource: String,
        /// Offending property
        property: String,
        /// Required shape, for the error message
        expected: &'static str,
    },

    /// The boot configuration payload has no splice marker.
    ///
    /// The injector locates its insertion cursor by scanning the payload
    /// fragments for a literal marker; a baseline without it is malformed.
    #[error("boot payload has no '{marker}' marker fragment")]
    PayloadMarkerMissing {
        /// The literal fragment that was expected
        marker: String,
    },

    /// A parent stack does not exist.
    ///
    /// This is the distinguishable "not found" condition of the lookup
    /// collaborator. The topology resolver recovers from it by inheriting
    /// nothing; it is only fatal if a caller chooses to treat it that way.
    #[error("stack '{name}' was not found")]
    StackNotFound {
        /// Logical name or identifier of the stack
        name: String,
    },

    /// A stack lookup failed for a reason other than "not found".
    ///
    /// Propagated unchanged to the caller; retry policy belongs to the
    /// lookup collaborator, not to this crate.
    #[error("lookup of stack '{name}' failed: {reason}")]
    StackLookupFailed {
        /// Logical name or identifier of the stack
        name: String,
        /// Error detail reported by the lookup collaborator
        reason: String,
    },

    /// The composed template contains references to names that no longer exist.
    ///
    /// Checked after the full transformation pipeline; a non-empty set means
    /// one of the transformations broke referential integrity.
    #[error("composed template contains dangling references: {}", refs.join(", "))]
    DanglingReferences {
        /// The unresolved reference targets, sorted and deduplicated
        refs: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StackformError::PropertyMissing {
            resource: "Lc".to_string(),
            property: "UserData".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "resource 'Lc' is missing expected property 'UserData'"
        );

        let err = StackformError::DanglingReferences {
            refs: vec!["Asg".to_string(), "Lc".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "composed template contains dangling references: Asg, Lc"
        );
    }

    #[test]
    fn test_downcast_from_anyhow() {
        let err = anyhow::Error::from(StackformError::StackNotFound {
            name: "parent".to_string(),
        });
        assert!(matches!(
            err.downcast_ref::<StackformError>(),
            Some(StackformError::StackNotFound { .. })
        ));
    }
}
