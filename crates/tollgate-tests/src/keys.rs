//! Ed25519 keys for signing test credentials.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::SigningKey;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use rand::rngs::OsRng;
use serde::Serialize;
use serde_json::{Value, json};

// PKCS#8 v1 header for a raw 32-byte Ed25519 seed.
const ED25519_PKCS8_PREFIX: [u8; 16] = [
    0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04, 0x20,
];

/// A freshly generated signing key published under `kid`.
pub struct TestKey {
    pub kid: String,
    signing_key: SigningKey,
}

impl TestKey {
    pub fn generate(kid: &str) -> Self {
        Self {
            kid: kid.to_string(),
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// The public half as a JWKS entry.
    pub fn jwk(&self) -> Value {
        json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "kid": self.kid,
            "use": "sig",
            "alg": "EdDSA",
            "x": URL_SAFE_NO_PAD.encode(self.signing_key.verifying_key().to_bytes()),
        })
    }

    pub fn sign<T: Serialize>(&self, claims: &T) -> String {
        self.sign_as(&self.kid, claims)
    }

    /// Sign with this key while claiming to be `kid`.
    pub fn sign_as<T: Serialize>(&self, kid: &str, claims: &T) -> String {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(kid.to_string());
        encode(&header, claims, &self.encoding_key()).expect("sign test credential")
    }

    pub fn sign_without_kid<T: Serialize>(&self, claims: &T) -> String {
        let header = Header::new(Algorithm::EdDSA);
        encode(&header, claims, &self.encoding_key()).expect("sign test credential")
    }

    fn encoding_key(&self) -> EncodingKey {
        let mut der = ED25519_PKCS8_PREFIX.to_vec();
        der.extend_from_slice(&self.signing_key.to_bytes());
        EncodingKey::from_ed_der(&der)
    }
}
