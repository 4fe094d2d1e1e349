//! Managed backing-service injection.
//!
//! Each submodule adds one kind of managed backing service to the template:
//! the service resources themselves, a dedicated network-access-control
//! resource scoped to the deployment's primary network boundary, and a
//! reference spliced into the boot configuration payload so instances can
//! discover the service endpoint at start-up. The helpers here are shared
//! across service kinds.

pub mod cache;

/// Derive a valid resource logical ID segment from an operator-chosen
/// request name.
///
/// Logical IDs are alphanumeric; separator characters are dropped and each
/// segment start is upper-cased, so "session-store" becomes "SessionStore".
pub fn logical_name(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    let mut boundary = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if boundary {
                cleaned.extend(ch.to_uppercase());
            } else {
                cleaned.push(ch);
            }
            boundary = false;
        } else {
            boundary = true;
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_name() {
        assert_eq!(logical_name("sessions"), "Sessions");
        assert_eq!(logical_name("session-store"), "SessionStore");
        assert_eq!(logical_name("hot_pages.v2"), "HotPagesV2");
        assert_eq!(logical_name("Already Clean"), "AlreadyClean");
    }
}
