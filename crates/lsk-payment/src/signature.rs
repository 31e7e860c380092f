//! Provider callback signatures.
//!
//! The provider signs the callback parameters with a shared key:
//! HMAC-SHA256 over the canonical string, hex-encoded in the `sign`
//! parameter. The canonical string is every parameter except `sign` and
//! `sign_type`, keys sorted, empty values skipped, joined as `k=v&…`.
//! Verification failure means the callback performs no state change at all.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGN_PARAM: &str = "sign";
pub const SIGN_TYPE_PARAM: &str = "sign_type";

/// Sorted `k=v&…` over all parameters except the signature fields and
/// empty values. `BTreeMap` iteration gives the sort for free.
pub fn canonical_string(params: &BTreeMap<String, String>) -> String {
    let mut parts = Vec::with_capacity(params.len());
    for (k, v) in params {
        if k == SIGN_PARAM || k == SIGN_TYPE_PARAM || v.is_empty() {
            continue;
        }
        parts.push(format!("{k}={v}"));
    }
    parts.join("&")
}

/// Produce the hex signature for `params`. The webhook simulator and the
/// tests use this; inbound verification uses [`verify`].
pub fn sign(params: &BTreeMap<String, String>, key: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(canonical_string(params).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify the `sign` parameter against `key`. Any malformation — missing
/// signature, bad hex, wrong MAC — is a plain `false`; the caller maps it
/// to a rejected callback.
pub fn verify(params: &BTreeMap<String, String>, key: &[u8]) -> bool {
    let Some(claimed) = params.get(SIGN_PARAM) else {
        return false;
    };
    let Ok(claimed_bytes) = hex::decode(claimed) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(canonical_string(params).as_bytes());
    mac.verify_slice(&claimed_bytes).is_ok()
}
