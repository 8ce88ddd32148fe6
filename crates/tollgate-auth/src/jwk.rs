//! JSON Web Key documents and the verification keys derived from them.

use jsonwebtoken::{Algorithm, DecodingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tollgate_core::{Error, Result};

/// JSON Web Key as published by the license authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

/// JSON Web Key Set document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Jwks {
    #[serde(default)]
    pub keys: Vec<Jwk>,
}

impl Jwk {
    /// Signing algorithm of this key, inferred from the key type when the
    /// document leaves `alg` out.
    pub fn algorithm(&self) -> Result<Algorithm> {
        if let Some(alg) = &self.alg {
            return Algorithm::from_str(alg)
                .map_err(|_| unusable(self, format!("unsupported algorithm '{}'", alg)));
        }

        match (self.kty.as_str(), self.crv.as_deref()) {
            ("RSA", _) => Ok(Algorithm::RS256),
            ("EC", Some("P-256")) | ("EC", None) => Ok(Algorithm::ES256),
            ("EC", Some("P-384")) => Ok(Algorithm::ES384),
            ("OKP", _) => Ok(Algorithm::EdDSA),
            (kty, crv) => Err(unusable(
                self,
                format!("cannot infer algorithm for kty '{}' crv {:?}", kty, crv),
            )),
        }
    }

    /// Convert into a key usable for signature verification.
    pub fn to_verification_key(&self) -> Result<VerificationKey> {
        let kid = self
            .kid
            .clone()
            .filter(|kid| !kid.is_empty())
            .ok_or_else(|| unusable(self, "missing 'kid'"))?;

        if let Some(key_use) = self.key_use.as_deref()
            && key_use != "sig"
        {
            return Err(unusable(self, format!("key use is '{}'", key_use)));
        }

        let algorithm = self.algorithm()?;
        let decoding_key = match algorithm {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => {
                self.expect_kty("RSA")?;
                DecodingKey::from_rsa_components(self.field("n", &self.n)?, self.field("e", &self.e)?)
            }
            Algorithm::ES256 | Algorithm::ES384 => {
                self.expect_kty("EC")?;
                DecodingKey::from_ec_components(self.field("x", &self.x)?, self.field("y", &self.y)?)
            }
            Algorithm::EdDSA => {
                self.expect_kty("OKP")?;
                if self.crv.as_deref().is_some_and(|crv| crv != "Ed25519") {
                    return Err(unusable(self, format!("unsupported curve {:?}", self.crv)));
                }
                DecodingKey::from_ed_components(self.field("x", &self.x)?)
            }
            // Shared-secret algorithms have no business in a public key set.
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                return Err(unusable(self, format!("symmetric algorithm {:?}", algorithm)));
            }
        }
        .map_err(|e| unusable(self, e.to_string()))?;

        Ok(VerificationKey {
            kid,
            algorithm,
            decoding_key,
        })
    }

    fn expect_kty(&self, kty: &str) -> Result<()> {
        if self.kty != kty {
            return Err(unusable(
                self,
                format!("kty '{}' does not match algorithm family {}", self.kty, kty),
            ));
        }
        Ok(())
    }

    fn field<'a>(&self, name: &str, value: &'a Option<String>) -> Result<&'a str> {
        value
            .as_deref()
            .ok_or_else(|| unusable(self, format!("missing '{}'", name)))
    }
}

fn unusable(jwk: &Jwk, reason: impl fmt::Display) -> Error {
    Error::Fetch(format!(
        "unusable key '{}': {}",
        jwk.kid.as_deref().unwrap_or("<none>"),
        reason
    ))
}

/// Public key material resolved from a key set, ready for verification.
#[derive(Clone)]
pub struct VerificationKey {
    kid: String,
    algorithm: Algorithm,
    decoding_key: DecodingKey,
}

impl VerificationKey {
    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwk(value: serde_json::Value) -> Jwk {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_algorithm_inference() {
        let rsa = jwk(serde_json::json!({"kty": "RSA", "kid": "r", "n": "sXch", "e": "AQAB"}));
        assert_eq!(rsa.algorithm().unwrap(), Algorithm::RS256);

        let ec = jwk(serde_json::json!({"kty": "EC", "kid": "e", "crv": "P-384"}));
        assert_eq!(ec.algorithm().unwrap(), Algorithm::ES384);

        let okp = jwk(serde_json::json!({"kty": "OKP", "kid": "o", "crv": "Ed25519"}));
        assert_eq!(okp.algorithm().unwrap(), Algorithm::EdDSA);

        let oct = jwk(serde_json::json!({"kty": "oct", "kid": "s"}));
        assert!(oct.algorithm().is_err());
    }

    #[test]
    fn test_rsa_key_with_extra_fields() {
        let key = jwk(serde_json::json!({
            "kty": "RSA",
            "kid": "rsa-1",
            "use": "sig",
            "alg": "RS256",
            "n": "sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1WlUzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDprecbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBIY2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw",
            "e": "AQAB",
            "x5t": "ignored"
        }));

        let verification = key.to_verification_key().unwrap();
        assert_eq!(verification.kid(), "rsa-1");
        assert_eq!(verification.algorithm(), Algorithm::RS256);
    }

    #[test]
    fn test_rejects_unusable_keys() {
        let encryption = jwk(serde_json::json!({
            "kty": "RSA", "kid": "enc", "use": "enc", "n": "sXch", "e": "AQAB"
        }));
        assert!(encryption.to_verification_key().is_err());

        let no_kid = jwk(serde_json::json!({"kty": "RSA", "n": "sXch", "e": "AQAB"}));
        assert!(no_kid.to_verification_key().is_err());

        let symmetric = jwk(serde_json::json!({"kty": "oct", "kid": "hs", "alg": "HS256"}));
        assert!(symmetric.to_verification_key().is_err());

        let wrong_family = jwk(serde_json::json!({
            "kty": "EC", "kid": "mix", "alg": "RS256", "x": "AA", "y": "AA"
        }));
        assert!(wrong_family.to_verification_key().is_err());

        let missing_material = jwk(serde_json::json!({"kty": "OKP", "kid": "ed", "crv": "Ed25519"}));
        assert!(missing_material.to_verification_key().is_err());

        let unknown_alg = jwk(serde_json::json!({"kty": "RSA", "kid": "x", "alg": "RS1", "n": "sXch", "e": "AQAB"}));
        assert!(unknown_alg.to_verification_key().is_err());
    }
}
