//! Boot configuration payload builder.
//!
//! The launch configuration carries its boot payload as an ordered fragment
//! sequence (`Fn::Base64` over `Fn::Join`): literal text fragments and
//! `{"Ref": ..}` fragments that, concatenated, form a JSON document delivered
//! to instances at start-up. The payload contains a fixed marker fragment
//! (the breadcrumb) after which `"key":<reference>,` entries may be spliced.
//!
//! [`UserDataFragments`] detaches the fragment list from the template, keeps
//! the splice-point arithmetic in one place behind a cursor API, and
//! reattaches the list when building is done. After N spliced entries exactly
//! one trailing separator (the last one inserted) must be removed so the
//! payload does not end with a `,` before its closing marker;
//! [`UserDataFragments::trim_trailing_separator`] owns that bookkeeping.

use serde_json::Value;

use crate::constants::LAUNCH_CONFIG;
use crate::core::StackformError;
use crate::template::Template;

/// JSON pointer to the fragment list inside the launch configuration.
const FRAGMENTS_POINTER: &str = "/Properties/UserData/Fn::Base64/Fn::Join/1";

/// The detached boot payload fragment list of a launch configuration.
#[derive(Debug)]
pub struct UserDataFragments {
    fragments: Vec<Value>,
}

/// An insertion point within the payload, plus the number of entries spliced
/// through it so far.
///
/// Splicing repeatedly inserts at the same index, so entries land in reverse
/// insertion order; the embedded document is consumed as a map, so only the
/// entry set matters.
#[derive(Debug, Clone, Copy)]
pub struct SpliceCursor {
    index: usize,
    entries: usize,
}

impl SpliceCursor {
    /// Number of entries spliced through this cursor.
    pub fn entries(&self) -> usize {
        self.entries
    }
}

impl UserDataFragments {
    /// Detach the fragment list from the template's launch configuration.
    ///
    /// The template keeps an empty list until [`reattach`](Self::reattach)
    /// puts the built payload back. A launch configuration without the
    /// expected payload shape is a contract violation.
    pub fn detach(template: &mut Template) -> Result<Self, StackformError> {
        let fragments = fragments_slot(template)?;
        Ok(Self {
            fragments: std::mem::take(fragments),
        })
    }

    /// Reattach the built payload to the template's launch configuration.
    pub fn reattach(self, template: &mut Template) -> Result<(), StackformError> {
        *fragments_slot(template)? = self.fragments;
        Ok(())
    }

    /// Position a cursor immediately after the given literal marker fragment.
    pub fn cursor_after(&self, marker: &str) -> Result<SpliceCursor, StackformError> {
        let at = self
            .fragments
            .iter()
            .position(|fragment| fragment.as_str() == Some(marker))
            .ok_or_else(|| StackformError::PayloadMarkerMissing {
                marker: marker.to_string(),
            })?;
        Ok(SpliceCursor {
            index: at + 1,
            entries: 0,
        })
    }

    /// Splice a `"key":<reference>,` entry at the cursor.
    ///
    /// Four fragments, inserted at the same index. Read it backwards, and
    /// note the trailing separator.
    pub fn splice_entry(&mut self, cursor: &mut SpliceCursor, key: &str, reference: Value) {
        let at = cursor.index;
        self.fragments.insert(at, Value::String(",".to_string()));
        self.fragments.insert(at, Value::String("\"".to_string()));
        self.fragments.insert(at, reference);
        self.fragments
            .insert(at, Value::String(format!("\"{key}\":\"")));
        cursor.entries += 1;
    }

    /// Remove the single trailing separator left by the last successful
    /// splice. No-op when nothing was spliced.
    pub fn trim_trailing_separator(&mut self, cursor: &SpliceCursor) {
        if cursor.entries == 0 {
            return;
        }
        self.fragments.remove(cursor.index + 4 * cursor.entries - 1);
    }

    /// The current fragment sequence.
    pub fn fragments(&self) -> &[Value] {
        &self.fragments
    }
}

/// Mutable access to the fragment list slot inside the template.
fn fragments_slot(template: &mut Template) -> Result<&mut Vec<Value>, StackformError> {
    template
        .resources
        .get_mut(LAUNCH_CONFIG)
        .ok_or_else(|| StackformError::ResourceMissing {
            name: LAUNCH_CONFIG.to_string(),
        })?
        .pointer_mut(FRAGMENTS_POINTER)
        .and_then(Value::as_array_mut)
        .ok_or_else(|| StackformError::PropertyShape {
            resource: LAUNCH_CONFIG.to_string(),
            property: "UserData".to_string(),
            expected: "a Fn::Base64/Fn::Join fragment list",
        })
}
