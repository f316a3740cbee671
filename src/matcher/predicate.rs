//! Address predicate.

use super::SearchSpec;

/// Returns the body of `address` after a `0x`/`0X` marker.
#[inline]
fn body(address: &str) -> Option<&str> {
    let bytes = address.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'0' && (bytes[1] == b'x' || bytes[1] == b'X') {
        Some(&address[2..])
    } else {
        None
    }
}

/// True iff `address` starts with `0x` + the search prefix and none of the
/// characters after the marker is excluded. Case is ignored throughout.
///
/// Addresses without the marker never match.
#[inline]
pub fn matches(spec: &SearchSpec, address: &str) -> bool {
    let Some(body) = body(address) else {
        return false;
    };

    let prefix = spec.prefix().as_bytes();
    if body.len() < prefix.len() || !body.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix) {
        return false;
    }

    spec.excluded().is_empty() || !body.chars().any(|c| spec.is_excluded(c))
}
