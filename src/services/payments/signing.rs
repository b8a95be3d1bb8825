use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// Builds the canonical signing string both providers expect: keys sorted
/// lexicographically, `key=value` pairs joined with `&`, values left
/// un-encoded. URL-encoding is applied only when the parameter set is
/// serialized for transport, never for signing.
pub fn canonical_signing_string(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// HMAC-SHA256 digest rendered as lowercase hex (MoMo).
pub fn hmac_sha256_hex(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// HMAC-SHA512 digest rendered as lowercase hex (VNPay).
pub fn hmac_sha512_hex(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn signing_string_sorts_keys_and_skips_encoding() {
        let p = params(&[
            ("orderInfo", "Payment for order #7"),
            ("amount", "76000"),
            ("partnerCode", "MOMO"),
        ]);
        assert_eq!(
            canonical_signing_string(&p),
            "amount=76000&orderInfo=Payment for order #7&partnerCode=MOMO"
        );
    }

    #[test]
    fn digests_are_lowercase_hex() {
        let digest = hmac_sha256_hex("secret", "payload");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let digest = hmac_sha512_hex("secret", "payload");
        assert_eq!(digest.len(), 128);
    }

    #[test]
    fn digest_is_stable_for_identical_input() {
        let p = params(&[("a", "1"), ("b", "2")]);
        let s = canonical_signing_string(&p);
        assert_eq!(
            hmac_sha256_hex("k", &s),
            hmac_sha256_hex("k", "a=1&b=2")
        );
    }

    #[test]
    fn comparison_rejects_different_lengths_and_contents() {
        assert!(constant_time_eq("abcd", "abcd"));
        assert!(!constant_time_eq("abcd", "abce"));
        assert!(!constant_time_eq("abcd", "abc"));
    }
}
