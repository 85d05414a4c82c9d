use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Compute the HMAC-SHA256 of `message` keyed with `secret`.
///
/// The secret is used directly as the MAC key; no derivation step.
pub fn sign(secret: &[u8], message: &[u8]) -> Result<Vec<u8>, anyhow::Error> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;

    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verify an HMAC-SHA256 signature using constant-time comparison.
pub fn verify(secret: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, anyhow::Error> {
    let expected = sign(secret, message)?;

    if expected.len() != signature.len() {
        return Ok(false);
    }

    Ok(expected.as_slice().ct_eq(signature).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let secret = b"my_secret_key";
        let message = b"header.payload";

        let signature = sign(secret, message).unwrap();
        assert_eq!(signature.len(), 32);

        let is_valid = verify(secret, message, &signature).unwrap();
        assert!(is_valid);
    }

    #[test]
    fn test_tampered_signature() {
        let secret = b"my_secret_key";
        let message = b"header.payload";

        let mut signature = sign(secret, message).unwrap();
        signature[0] ^= 0xff;

        let is_valid = verify(secret, message, &signature).unwrap();
        assert!(!is_valid);
    }

    #[test]
    fn test_tampered_message() {
        let secret = b"my_secret_key";

        let signature = sign(secret, b"header.payload").unwrap();

        let is_valid = verify(secret, b"header.paylOad", &signature).unwrap();
        assert!(!is_valid);
    }

    #[test]
    fn test_wrong_secret() {
        let signature = sign(b"secret_a", b"message").unwrap();

        let is_valid = verify(b"secret_b", b"message", &signature).unwrap();
        assert!(!is_valid);
    }

    #[test]
    fn test_truncated_signature_rejected() {
        let secret = b"my_secret_key";
        let signature = sign(secret, b"message").unwrap();

        let is_valid = verify(secret, b"message", &signature[..16]).unwrap();
        assert!(!is_valid);
    }
}
