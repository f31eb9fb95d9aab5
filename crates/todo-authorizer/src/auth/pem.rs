//! PEM armoring for JWKS key material.
//!
//! Two shapes of RSA key material show up in a key set:
//! - `x5c[0]`: a base64 DER X.509 certificate, armored as `CERTIFICATE`
//! - `n` / `e`: base64url modulus and exponent, encoded as a PKCS#1
//!   `RSAPublicKey` and armored as `RSA PUBLIC KEY`
//!
//! Certificate armoring does not validate the base64; a bad certificate is
//! rejected later when the verifier parses the key.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use rsa::pkcs1::{EncodeRsaPublicKey, LineEnding};
use rsa::{BigUint, RsaPublicKey};
use thiserror::Error;

pub const CERTIFICATE_HEADER: &str = "-----BEGIN CERTIFICATE-----";
pub const CERTIFICATE_FOOTER: &str = "-----END CERTIFICATE-----";
pub const RSA_PUBLIC_KEY_HEADER: &str = "-----BEGIN RSA PUBLIC KEY-----";
pub const RSA_PUBLIC_KEY_FOOTER: &str = "-----END RSA PUBLIC KEY-----";

/// Characters per PEM body line (RFC 7468).
pub const PEM_LINE_WIDTH: usize = 64;

/// JWK members are unpadded base64url, but some issuers pad them anyway.
const BASE64URL_ANY_PADDING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PemError {
    #[error("RSA {0} is not valid base64url")]
    InvalidBase64(&'static str),

    #[error("RSA {0} is empty")]
    EmptyComponent(&'static str),

    #[error("RSA public key rejected: {0}")]
    InvalidKey(String),
}

/// Armor a base64 DER certificate as a PEM `CERTIFICATE`.
///
/// Deterministic: the same input always yields byte-identical output. The
/// result starts with [`CERTIFICATE_HEADER`] and ends with
/// [`CERTIFICATE_FOOTER`] (no trailing newline).
pub fn certificate_to_pem(der_base64: &str) -> String {
    let chars: Vec<char> = der_base64.chars().collect();
    let line_breaks = chars.len() / PEM_LINE_WIDTH + 2;
    let mut pem = String::with_capacity(
        CERTIFICATE_HEADER.len() + CERTIFICATE_FOOTER.len() + der_base64.len() + line_breaks,
    );

    pem.push_str(CERTIFICATE_HEADER);
    pem.push('\n');
    for line in chars.chunks(PEM_LINE_WIDTH) {
        pem.extend(line);
        pem.push('\n');
    }
    pem.push_str(CERTIFICATE_FOOTER);
    pem
}

/// Build a PKCS#1 `RSA PUBLIC KEY` PEM from JWK `n` and `e` members.
///
/// # Errors
///
/// Returns `PemError` if either component is not base64url, decodes to
/// nothing but zero bytes, or does not form an acceptable RSA public key.
pub fn rsa_components_to_pem(n: &str, e: &str) -> Result<String, PemError> {
    let modulus = decode_component(n, "modulus")?;
    let exponent = decode_component(e, "exponent")?;

    let public_key = RsaPublicKey::new(
        BigUint::from_bytes_be(&modulus),
        BigUint::from_bytes_be(&exponent),
    )
    .map_err(|e| PemError::InvalidKey(e.to_string()))?;

    public_key
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| PemError::InvalidKey(e.to_string()))
}

/// Decode a base64url component and strip leading zero bytes.
fn decode_component(value: &str, name: &'static str) -> Result<Vec<u8>, PemError> {
    let bytes = BASE64URL_ANY_PADDING
        .decode(value)
        .map_err(|_| PemError::InvalidBase64(name))?;

    let significant: Vec<u8> = bytes.into_iter().skip_while(|b| *b == 0).collect();
    if significant.is_empty() {
        return Err(PemError::EmptyComponent(name));
    }
    Ok(significant)
}
