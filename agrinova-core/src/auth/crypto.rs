use argon2::{
    Algorithm, Argon2, Params, ParamsBuilder, Version,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
};
use base64::{Engine, engine::general_purpose::URL_SAFE};
use constant_time_eq::constant_time_eq;
use password_hash::Error as PasswordHashError;
use rand::{TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroizing;

/// Centralized cryptographic helper for authentication-sensitive hashing.
///
/// The helper encapsulates the primitives every auth flow shares:
/// - Argon2id for password hashing with an optional server-side pepper.
/// - SHA-256 (hex) for hashing bearer and offline tokens before persistence.
/// - The legacy token encoding still accepted during the hash migration
///   window.
#[derive(Debug)]
pub struct AuthCrypto {
    argon2: Argon2<'static>,
    password_pepper: Zeroizing<Vec<u8>>,
    dummy_hash: String,
}

#[derive(Debug, Error)]
pub enum AuthCryptoError {
    #[error("invalid Argon2 parameters: {0}")]
    InvalidArgon2Params(String),
    #[error("password hashing error: {0}")]
    PasswordHash(String),
    #[error("random source unavailable: {0}")]
    Rng(String),
}

impl From<PasswordHashError> for AuthCryptoError {
    fn from(err: PasswordHashError) -> Self {
        AuthCryptoError::PasswordHash(err.to_string())
    }
}

impl AuthCrypto {
    /// 64 MiB, 3 passes, 2 lanes.
    const DEFAULT_MEMORY_KIB: u32 = 64 * 1024;
    const DEFAULT_ITERATIONS: u32 = 3;
    const DEFAULT_PARALLELISM: u32 = 2;
    const SALT_LENGTH: usize = password_hash::Salt::RECOMMENDED_LENGTH;

    /// Build a helper with default Argon2id parameters.
    pub fn new(password_pepper: Option<&str>) -> Result<Self, AuthCryptoError> {
        Self::with_params(
            password_pepper,
            ParamsBuilder::new()
                .m_cost(Self::DEFAULT_MEMORY_KIB)
                .t_cost(Self::DEFAULT_ITERATIONS)
                .p_cost(Self::DEFAULT_PARALLELISM)
                .output_len(32)
                .build()
                .map_err(|err| {
                    AuthCryptoError::InvalidArgon2Params(err.to_string())
                })?,
        )
    }

    /// Build a helper with caller-specified Argon2 parameters.
    pub fn with_params(
        password_pepper: Option<&str>,
        params: Params,
    ) -> Result<Self, AuthCryptoError> {
        let argon2 =
            Argon2::new(Algorithm::Argon2id, Version::default(), params);
        let pepper = password_pepper.unwrap_or_default().as_bytes().to_vec();

        let mut crypto = Self {
            argon2,
            password_pepper: Zeroizing::new(pepper),
            dummy_hash: String::new(),
        };
        crypto.dummy_hash = crypto.hash_password("agrinova-dummy-password")?;
        Ok(crypto)
    }

    /// Cheap parameters for unit tests.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn for_tests() -> Self {
        let params = ParamsBuilder::new()
            .m_cost(8)
            .t_cost(1)
            .p_cost(1)
            .build()
            .expect("static argon2 params are valid");
        Self::with_params(None, params).expect("test crypto builds")
    }

    fn peppered(&self, password: &str) -> Zeroizing<Vec<u8>> {
        let mut material = Zeroizing::new(Vec::with_capacity(
            password.len() + self.password_pepper.len(),
        ));
        material.extend_from_slice(password.as_bytes());
        material.extend_from_slice(&self.password_pepper);
        material
    }

    /// Hash a password using Argon2id with a random salt. The resulting PHC
    /// string is suitable for storage.
    pub fn hash_password(
        &self,
        password: &str,
    ) -> Result<String, AuthCryptoError> {
        let material = self.peppered(password);

        let mut salt_bytes = [0u8; Self::SALT_LENGTH];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|err| AuthCryptoError::Rng(err.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(AuthCryptoError::from)?;
        let hash = self.argon2.hash_password(&material, &salt)?.to_string();
        Ok(hash)
    }

    /// Verify a password against a stored PHC hash.
    ///
    /// A stored value that does not parse as a PHC string verifies as false.
    pub fn verify_password(&self, password: &str, password_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(password_hash) else {
            tracing::warn!(
                target: "agrinova::auth",
                "stored password hash is not a PHC string"
            );
            return false;
        };
        let material = self.peppered(password);
        self.argon2.verify_password(&material, &parsed).is_ok()
    }

    /// Burn the same work as a real verification so unknown identifiers take
    /// as long as wrong passwords.
    pub fn verify_dummy(&self, password: &str) {
        let _ = self.verify_password(password, &self.dummy_hash);
    }

    /// SHA-256 of a token, hex encoded. The only form new records store.
    pub fn hash_token(&self, token: &str) -> String {
        hash_token(token)
    }

    /// Encoding used by records written before SHA-256 hashing.
    pub fn legacy_hash_token(&self, token: &str) -> String {
        URL_SAFE.encode(token.as_bytes())
    }

    /// 32 random bytes, URL-safe base64 without padding.
    pub fn generate_opaque_token(&self) -> Result<String, AuthCryptoError> {
        generate_opaque_token()
    }

    pub fn secure_eq(a: &str, b: &str) -> bool {
        constant_time_eq(a.as_bytes(), b.as_bytes())
    }
}

pub(crate) fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(digest)
}

pub(crate) fn generate_opaque_token() -> Result<String, AuthCryptoError> {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let mut bytes = Zeroizing::new([0u8; 32]);
    OsRng
        .try_fill_bytes(&mut bytes[..])
        .map_err(|err| AuthCryptoError::Rng(err.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(&bytes[..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip_and_rejection() {
        let crypto = AuthCrypto::for_tests();
        let hash = crypto.hash_password("demo123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(crypto.verify_password("demo123", &hash));
        assert!(!crypto.verify_password("demo124", &hash));
    }

    #[test]
    fn malformed_stored_hash_is_not_verified() {
        let crypto = AuthCrypto::for_tests();
        assert!(!crypto.verify_password("demo123", "plaintext"));
    }

    #[test]
    fn pepper_changes_the_verification_outcome() {
        let params = ParamsBuilder::new()
            .m_cost(8)
            .t_cost(1)
            .p_cost(1)
            .build()
            .unwrap();
        let peppered = AuthCrypto::with_params(Some("pepper"), params).unwrap();
        let plain = AuthCrypto::for_tests();

        let hash = peppered.hash_password("secret").unwrap();
        assert!(peppered.verify_password("secret", &hash));
        assert!(!plain.verify_password("secret", &hash));
    }

    #[test]
    fn token_hash_is_sha256_hex() {
        let crypto = AuthCrypto::for_tests();
        assert_eq!(
            crypto.hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn legacy_hash_is_padded_url_safe_base64() {
        let crypto = AuthCrypto::for_tests();
        assert_eq!(crypto.legacy_hash_token("ab?"), "YWI_");
        assert_eq!(crypto.legacy_hash_token("a"), "YQ==");
    }

    #[test]
    fn opaque_tokens_are_unique_and_unpadded() {
        let a = generate_opaque_token().unwrap();
        let b = generate_opaque_token().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(!a.contains('='));
    }
}
