//! Constant-time comparison for shared secrets.

use subtle::ConstantTimeEq;

/// Constant-time equality for secret strings.
pub fn ct_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
