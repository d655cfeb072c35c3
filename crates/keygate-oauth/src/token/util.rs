//! Random token generation.

use rand::RngCore;
use rand::rngs::OsRng;
use sha1::{Digest, Sha1};

use crate::OAuthResult;
use crate::error::OAuthError;

const RANDOM_BYTES: usize = 256;

/// Generates an opaque token: 256 bytes from the OS random source, hashed
/// with SHA-1 and hex encoded (40 lowercase characters).
///
/// Used for access tokens, refresh tokens and authorization codes whenever
/// the model has no generator of its own.
///
/// # Errors
///
/// Returns `ServerError` if the OS random source fails.
pub fn generate_random_token() -> OAuthResult<String> {
    let mut buffer = [0u8; RANDOM_BYTES];
    OsRng.try_fill_bytes(&mut buffer).map_err(|e| {
        tracing::error!(error = %e, "OS random source failed");
        OAuthError::wrap(e)
    })?;

    Ok(hex::encode(Sha1::digest(buffer)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_random_token_shape() {
        let token = generate_random_token().unwrap();
        assert_eq!(token.len(), 40);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
    }

    #[test]
    fn test_generate_random_token_is_unique() {
        let a = generate_random_token().unwrap();
        let b = generate_random_token().unwrap();
        assert_ne!(a, b);
    }
}
