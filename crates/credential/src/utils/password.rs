//! Credential generation

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rand::TryRngCore;
use rand::rngs::OsRng;
use secrecy::SecretString;
use thiserror::Error;
use zeroize::Zeroizing;

/// Number of random bytes behind every generated password
pub const PASSWORD_BYTES: usize = 60;

/// Length of the encoded password (padded base64 of [`PASSWORD_BYTES`])
pub const PASSWORD_LENGTH: usize = PASSWORD_BYTES.div_ceil(3) * 4;

/// The operating system could not supply entropy
#[derive(Debug, Error)]
#[error("operating system entropy source failed: {0}")]
pub struct EntropyError(String);

/// Generate a new password from the operating system CSPRNG
///
/// The raw bytes are zeroized once encoded.
///
/// # Examples
///
/// ```
/// use keyturn_credential::utils::{PASSWORD_LENGTH, generate_password};
/// use secrecy::ExposeSecret;
///
/// let password = generate_password()?;
/// assert_eq!(password.expose_secret().len(), PASSWORD_LENGTH);
/// # Ok::<(), keyturn_credential::utils::EntropyError>(())
/// ```
pub fn generate_password() -> Result<SecretString, EntropyError> {
    let mut bytes = Zeroizing::new([0u8; PASSWORD_BYTES]);
    OsRng
        .try_fill_bytes(&mut bytes[..])
        .map_err(|e| EntropyError(e.to_string()))?;

    Ok(SecretString::from(STANDARD.encode(&bytes[..])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn length_is_constant() {
        for _ in 0..32 {
            let password = generate_password().unwrap();
            assert_eq!(password.expose_secret().len(), PASSWORD_LENGTH);
        }
        assert_eq!(PASSWORD_LENGTH, 80);
    }

    #[test]
    fn successive_values_differ() {
        let first = generate_password().unwrap();
        let second = generate_password().unwrap();
        assert_ne!(first.expose_secret(), second.expose_secret());
    }

    #[test]
    fn output_is_decodable_base64() {
        let password = generate_password().unwrap();
        let decoded = STANDARD.decode(password.expose_secret()).unwrap();
        assert_eq!(decoded.len(), PASSWORD_BYTES);
    }
}
