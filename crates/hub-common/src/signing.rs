//! HMAC-SHA256 signing for webhook payloads.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Sign a payload with HMAC-SHA256, returning a lowercase hex digest.
///
/// Used by the Webhook Deliverer (§4.5) whenever `config.secret` is set on
/// a webhook integration.
pub fn sign_hmac(payload: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");

    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a payload against a previously computed HMAC-SHA256 signature.
///
/// Constant-time comparison to avoid leaking signature bytes through
/// timing.
pub fn verify_hmac(payload: &str, signature_hex: &str, secret: &str) -> bool {
    let computed = sign_hmac(payload, secret);

    computed.as_bytes().len() == signature_hex.as_bytes().len()
        && computed
            .as_bytes()
            .iter()
            .zip(signature_hex.as_bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_is_deterministic() {
        let sig1 = sign_hmac("payload", "secret");
        let sig2 = sign_hmac("payload", "secret");
        assert_eq!(sig1, sig2);
        assert_eq!(sig1.len(), 64);
    }

    #[test]
    fn verify_accepts_matching_signature() {
        let payload = r#"{"topic":"integration.registered"}"#;
        let secret = "webhook-secret";
        let sig = sign_hmac(payload, secret);

        assert!(verify_hmac(payload, &sig, secret));
        assert!(!verify_hmac(payload, &sig, "wrong-secret"));
        assert!(!verify_hmac("different payload", &sig, secret));
    }
}
