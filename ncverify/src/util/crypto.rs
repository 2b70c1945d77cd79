//! Signature verification and hashing using libraries from the [Rust Crypto](https://github.com/RustCrypto)
//! project.

use der::{asn1::ObjectIdentifier, Encode};
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use p256::ecdsa::{Signature as Signature256, VerifyingKey as VerifyingKey256};
use p384::ecdsa::{Signature as Signature384, VerifyingKey as VerifyingKey384};
use rsa::pkcs1v15::Pkcs1v15Sign;
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::util::error::{Error, PathValidationStatus, Result};
use crate::{log_message, util::pdv_alg_oids::*, PeLogLevels};

/// is_rsa returns true is the presented OID is one of [`PKIXALG_SHA224_WITH_RSA_ENCRYPTION`],
/// [`PKIXALG_SHA256_WITH_RSA_ENCRYPTION`], [`PKIXALG_SHA384_WITH_RSA_ENCRYPTION`] or
/// [`PKIXALG_SHA512_WITH_RSA_ENCRYPTION`] and false otherwise.
pub(crate) fn is_rsa(oid: &ObjectIdentifier) -> bool {
    *oid == PKIXALG_SHA256_WITH_RSA_ENCRYPTION
        || *oid == PKIXALG_SHA384_WITH_RSA_ENCRYPTION
        || *oid == PKIXALG_SHA224_WITH_RSA_ENCRYPTION
        || *oid == PKIXALG_SHA512_WITH_RSA_ENCRYPTION
}

/// is_ecdsa returns true is the presented OID is one of [`PKIXALG_ECDSA_WITH_SHA224`],
/// [`PKIXALG_ECDSA_WITH_SHA256`], [`PKIXALG_ECDSA_WITH_SHA384`] or [`PKIXALG_ECDSA_WITH_SHA512`] and false otherwise.
pub(crate) fn is_ecdsa(oid: &ObjectIdentifier) -> bool {
    *oid == PKIXALG_ECDSA_WITH_SHA256
        || *oid == PKIXALG_ECDSA_WITH_SHA384
        || *oid == PKIXALG_ECDSA_WITH_SHA224
        || *oid == PKIXALG_ECDSA_WITH_SHA512
}

/// get_hash_alg_from_sig_alg takes an ObjectIdentifier that notionally contains a signature algorithm,
/// i.e., PKIXALG_SHA256_WITH_RSA_ENCRYPTION or PKIXALG_ECDSA_WITH_SHA256, and returns the indicated hash
/// algorithm.
pub fn get_hash_alg_from_sig_alg(sig_alg: &ObjectIdentifier) -> Result<ObjectIdentifier> {
    if PKIXALG_SHA256_WITH_RSA_ENCRYPTION == *sig_alg || PKIXALG_ECDSA_WITH_SHA256 == *sig_alg {
        return Ok(PKIXALG_SHA256);
    } else if PKIXALG_SHA384_WITH_RSA_ENCRYPTION == *sig_alg
        || PKIXALG_ECDSA_WITH_SHA384 == *sig_alg
    {
        return Ok(PKIXALG_SHA384);
    } else if PKIXALG_SHA224_WITH_RSA_ENCRYPTION == *sig_alg
        || PKIXALG_ECDSA_WITH_SHA224 == *sig_alg
    {
        return Ok(PKIXALG_SHA224);
    } else if PKIXALG_SHA512_WITH_RSA_ENCRYPTION == *sig_alg
        || PKIXALG_ECDSA_WITH_SHA512 == *sig_alg
    {
        return Ok(PKIXALG_SHA512);
    }
    Err(Error::Unrecognized)
}

/// calculate_hash_rust_crypto hashes the buffer using the indicated algorithm.
///
/// It supports [`PKIXALG_SHA224`], [`PKIXALG_SHA256`], [`PKIXALG_SHA384`] and [`PKIXALG_SHA512`].
pub fn calculate_hash_rust_crypto(
    hash_alg: &ObjectIdentifier,
    buffer_to_hash: &[u8],
) -> Result<Vec<u8>> {
    match *hash_alg {
        PKIXALG_SHA224 => Ok(Sha224::digest(buffer_to_hash).to_vec()),
        PKIXALG_SHA256 => Ok(Sha256::digest(buffer_to_hash).to_vec()),
        PKIXALG_SHA384 => Ok(Sha384::digest(buffer_to_hash).to_vec()),
        PKIXALG_SHA512 => Ok(Sha512::digest(buffer_to_hash).to_vec()),
        _ => Err(Error::Unrecognized),
    }
}

// PKCS #1 v1.5 scheme with the DigestInfo prefix for the hash implied by the signature algorithm
fn get_padding_scheme(sig_alg: &ObjectIdentifier) -> Result<Pkcs1v15Sign> {
    match *sig_alg {
        PKIXALG_SHA224_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha224>()),
        PKIXALG_SHA256_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha256>()),
        PKIXALG_SHA384_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha384>()),
        PKIXALG_SHA512_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha512>()),
        _ => Err(Error::Unrecognized),
    }
}

fn get_named_curve_parameter(alg_id: &AlgorithmIdentifierOwned) -> Result<ObjectIdentifier> {
    if let Some(params) = &alg_id.parameters {
        if let Ok(oid) = params.decode_as::<ObjectIdentifier>() {
            return Ok(oid);
        }
    }
    Err(Error::PathValidation(PathValidationStatus::EncodingError))
}

fn signature_failure() -> Error {
    Error::PathValidation(PathValidationStatus::SignatureVerificationFailure)
}

/// verify_signature_message_rust_crypto verifies a signature over a message using the public key
/// from a SubjectPublicKeyInfo.
///
/// RSA PKCS #1 v1.5 signatures and ECDSA signatures on P-256 and P-384 are supported, each with
/// SHA-224, SHA-256, SHA-384 or SHA-512.
pub fn verify_signature_message_rust_crypto(
    message_to_verify: &[u8],                 // buffer to verify
    signature: &[u8],                         // signature
    signature_alg: &AlgorithmIdentifierOwned, // signature algorithm
    spki: &SubjectPublicKeyInfoOwned,         // public key
) -> Result<()> {
    if is_rsa(&signature_alg.oid) {
        let enc_spki = spki.to_der()?;
        let rsa = match RsaPublicKey::from_public_key_der(&enc_spki) {
            Ok(rsa) => rsa,
            Err(_e) => {
                log_message(&PeLogLevels::PeError, "Failed to parse RSA public key");
                return Err(Error::PathValidation(PathValidationStatus::EncodingError));
            }
        };
        let hash_alg = get_hash_alg_from_sig_alg(&signature_alg.oid)?;
        let hash_to_verify = calculate_hash_rust_crypto(&hash_alg, message_to_verify)?;
        let ps = get_padding_scheme(&signature_alg.oid)?;
        return rsa
            .verify(ps, hash_to_verify.as_slice(), signature)
            .map_err(|_e| signature_failure());
    } else if is_ecdsa(&signature_alg.oid) {
        let named_curve = get_named_curve_parameter(&spki.algorithm)?;
        let hash_alg = get_hash_alg_from_sig_alg(&signature_alg.oid)?;
        let hash_to_verify = calculate_hash_rust_crypto(&hash_alg, message_to_verify)?;
        let key_bytes = spki.subject_public_key.raw_bytes();

        match named_curve {
            PKIXALG_SECP256R1 => {
                let ecdsa = VerifyingKey256::from_sec1_bytes(key_bytes)
                    .map_err(|_e| Error::PathValidation(PathValidationStatus::EncodingError))?;
                let s = Signature256::from_der(signature).map_err(|_e| signature_failure())?;
                return ecdsa
                    .verify_prehash(&hash_to_verify, &s)
                    .map_err(|_e| signature_failure());
            }
            PKIXALG_SECP384R1 => {
                let ecdsa = VerifyingKey384::from_sec1_bytes(key_bytes)
                    .map_err(|_e| Error::PathValidation(PathValidationStatus::EncodingError))?;
                let s = Signature384::from_der(signature).map_err(|_e| signature_failure())?;
                return ecdsa
                    .verify_prehash(&hash_to_verify, &s)
                    .map_err(|_e| signature_failure());
            }
            _ => {
                log_message(
                    &PeLogLevels::PeError,
                    format!("Unrecognized or unsupported named curve: {}", named_curve).as_str(),
                );
                return Err(Error::Unrecognized);
            }
        }
    }
    log_message(
        &PeLogLevels::PeError,
        format!("Unrecognized signature algorithm: {}", signature_alg.oid).as_str(),
    );
    Err(Error::Unrecognized)
}

#[test]
fn test_calculate_hash() {
    use hex_literal::hex;
    let hash = calculate_hash_rust_crypto(&PKIXALG_SHA256, "abc".as_bytes()).unwrap();
    assert_eq!(
        hash,
        hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
    );
    let hash = calculate_hash_rust_crypto(&PKIXALG_SHA224, "abc".as_bytes()).unwrap();
    assert_eq!(
        hash,
        hex!("23097d223405d8228642a477bda255b32aadbce4bda0b3f7e36c9da7")
    );
    assert_eq!(
        Err(Error::Unrecognized),
        calculate_hash_rust_crypto(&PKIXALG_RSA_ENCRYPTION, "abc".as_bytes())
    );
}

#[test]
fn get_hash_alg_from_sig_alg_test() {
    assert_eq!(
        get_hash_alg_from_sig_alg(&PKIXALG_ECDSA_WITH_SHA224).unwrap(),
        PKIXALG_SHA224
    );
    assert_eq!(
        get_hash_alg_from_sig_alg(&PKIXALG_SHA256_WITH_RSA_ENCRYPTION).unwrap(),
        PKIXALG_SHA256
    );
    assert_eq!(
        get_hash_alg_from_sig_alg(&PKIXALG_ECDSA_WITH_SHA384).unwrap(),
        PKIXALG_SHA384
    );
    assert_eq!(
        get_hash_alg_from_sig_alg(&PKIXALG_SHA512_WITH_RSA_ENCRYPTION).unwrap(),
        PKIXALG_SHA512
    );
    assert!(is_rsa(&PKIXALG_SHA384_WITH_RSA_ENCRYPTION));
    assert!(!is_rsa(&PKIXALG_ECDSA_WITH_SHA384));
    assert!(is_ecdsa(&PKIXALG_ECDSA_WITH_SHA512));
    assert_eq!(
        Err(Error::Unrecognized),
        get_hash_alg_from_sig_alg(&PKIXALG_SECP256R1)
    );
}
