//! Parameter signing for the Telebirr wire protocol.
//!
//! The scheme: take every parameter except `sign`, sort the keys lexicographically, join them as
//! `key=value` pairs with `&` (no URL-encoding, no trailing separator), HMAC-SHA256 the UTF-8
//! bytes of that string with the merchant secret, and hex-encode the digest.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::GatewayError;

type HmacSha256 = Hmac<Sha256>;

/// The name of the signature field. It is attached to the outbound parameter set but never part
/// of the signed string itself.
pub const SIGN_FIELD: &str = "sign";

/// Computes the hex-encoded signature over the given parameters. Any `sign` entry in the input
/// is ignored.
pub fn sign_params<'a, I>(params: I, secret: &str) -> String
where I: IntoIterator<Item = (&'a str, &'a str)> {
    // BTreeMap gives the lexicographic key order the gateway expects
    let sorted: BTreeMap<&str, &str> = params.into_iter().filter(|(k, _)| *k != SIGN_FIELD).collect();
    let canonical = sorted.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(canonical.as_bytes());
    hex_encode(&mac.finalize().into_bytes())
}

/// Verifies a callback's `sign` field against the signature recomputed over the remaining
/// parameters. Fails closed: a missing or mismatched signature rejects the callback.
pub fn verify_params<'a, I>(params: I, supplied_sign: Option<&str>, secret: &str) -> Result<(), GatewayError>
where I: IntoIterator<Item = (&'a str, &'a str)> {
    let supplied = supplied_sign.ok_or(GatewayError::SignatureMismatch)?;
    let expected = sign_params(params, secret);
    if constant_time_eq(expected.as_bytes(), supplied.as_bytes()) {
        Ok(())
    } else {
        Err(GatewayError::SignatureMismatch)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Comparison time depends only on the input length, so the check leaks nothing about where the
/// first differing byte sits.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
