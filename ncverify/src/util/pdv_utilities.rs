//! Utility functions that support certification path processing and name constraint enforcement

use log::error;

use const_oid::db::rfc2256::STATE_OR_PROVINCE_NAME;
use const_oid::db::rfc3280::{EMAIL_ADDRESS, PSEUDONYM};
use const_oid::db::rfc4519::*;
use der::asn1::{Ia5StringRef, ObjectIdentifier, PrintableStringRef};
use der::{Decode, Encode, Tagged};
use x509_cert::name::Name;
use x509_cert::{attr::AttributeTypeAndValue, Certificate, TbsCertificate};

use crate::{util::error::*, util::pdv_alg_oids::*, validator::pdv_certificate::*};

/// `is_self_issued` returns true if the subject field in the certificate is the same as the issuer
/// field.
pub fn is_self_issued(cert: &Certificate) -> bool {
    compare_names(&cert.tbs_certificate.issuer, &cert.tbs_certificate.subject)
}

/// `valid_at_time` evaluates the not_before and not_after fields of the given TBSCertificate instance
/// and provides an indication of validity relative to presented time of interest.
///
/// It returns the number of seconds left to live if the certificate is valid at the given time or
/// an error indicating which field failed if the certificate is not valid. The not_before field is
/// evaluated first.
///
/// To stifle logging output upon error, pass true for the stifle_log parameter.
pub fn valid_at_time(target: &TbsCertificate, toi: u64, stifle_log: bool) -> Result<u64> {
    if 0 == toi {
        // zero is used to disable validity check
        return Ok(0);
    }

    let nb = target.validity.not_before.to_unix_duration().as_secs();
    if nb > toi {
        if !stifle_log {
            log_error_for_name(
                &target.subject,
                "certificate is not yet valid, i.e., not_before is later than the configured time of interest",
            );
        }
        return Err(Error::PathValidation(
            PathValidationStatus::InvalidNotBeforeDate,
        ));
    }

    let na = target.validity.not_after.to_unix_duration().as_secs();
    if na < toi {
        if !stifle_log {
            log_error_for_name(
                &target.subject,
                format!(
                    "certificate is expired relative to the configured time of interest: {}",
                    target.validity.not_after
                )
                .as_str(),
            );
        }
        Err(Error::PathValidation(
            PathValidationStatus::InvalidNotAfterDate,
        ))
    } else {
        Ok(na - toi)
    }
}

pub(crate) fn log_error_for_name(name: &Name, msg: &str) {
    let name_str = name_to_string(name);
    error!(
        "Encountered error while processing certificate with subject {}: {}",
        name_str, msg
    );
}

pub(crate) fn log_error_for_ca(ca: &PDVCertificate, msg: &str) {
    log_error_for_name(&ca.decoded_cert.tbs_certificate.subject, msg);
}

/// `oid_lookup` takes an ObjectIdentifier and returns a string with a friendly name for the OID or
/// Error::NotFound.
pub fn oid_lookup(oid: &ObjectIdentifier) -> Result<String> {
    if *oid == PKIXALG_SHA224_WITH_RSA_ENCRYPTION {
        return Ok("SHA224 with RSA Encryption".to_string());
    } else if *oid == PKIXALG_SHA256_WITH_RSA_ENCRYPTION {
        return Ok("SHA256 with RSA Encryption".to_string());
    } else if *oid == PKIXALG_SHA384_WITH_RSA_ENCRYPTION {
        return Ok("SHA384 with RSA Encryption".to_string());
    } else if *oid == PKIXALG_SHA512_WITH_RSA_ENCRYPTION {
        return Ok("SHA512 with RSA Encryption".to_string());
    } else if *oid == PKIXALG_ECDSA_WITH_SHA256 {
        return Ok("ECDSA with SHA256".to_string());
    } else if *oid == PKIXALG_ECDSA_WITH_SHA384 {
        return Ok("ECDSA with SHA384".to_string());
    } else if *oid == COMMON_NAME {
        return Ok("CN".to_string());
    } else if *oid == LOCALITY_NAME {
        return Ok("L".to_string());
    } else if *oid == STATE_OR_PROVINCE_NAME {
        return Ok("ST".to_string());
    } else if *oid == STREET {
        return Ok("STREET".to_string());
    } else if *oid == ORGANIZATIONAL_UNIT_NAME {
        return Ok("OU".to_string());
    } else if *oid == ORGANIZATION_NAME {
        return Ok("O".to_string());
    } else if *oid == COUNTRY_NAME {
        return Ok("C".to_string());
    } else if *oid == DOMAIN_COMPONENT {
        return Ok("DC".to_string());
    } else if *oid == SERIAL_NUMBER {
        return Ok("serialNumber".to_string());
    } else if *oid == PSEUDONYM {
        return Ok("pseudonym".to_string());
    } else if *oid == EMAIL_ADDRESS {
        return Ok("emailAddress".to_string());
    }
    Err(Error::NotFound)
}

/// `name_to_string` returns a string representation of given Name value.
pub fn name_to_string(name: &Name) -> String {
    name.to_string()
}

/// `attribute_value_to_string` converts the DER encoding of an attribute value into a string that
/// can be compared as a sequence of code points.
///
/// UTF8String, PrintableString and IA5String values are decoded. Any other value is rendered as `#`
/// followed by the upper case hex of its complete DER encoding, so two values still compare equal
/// only if their encodings are identical.
pub fn attribute_value_to_string(tlv: &[u8]) -> der::Result<String> {
    let any = der::Any::from_der(tlv)?;
    let value = any.value();
    let s = match any.tag() {
        der::Tag::Utf8String => match core::str::from_utf8(value) {
            Ok(s) => Some(s.to_string()),
            Err(_e) => None,
        },
        der::Tag::PrintableString => PrintableStringRef::new(value)
            .ok()
            .map(|s| s.as_str().to_string()),
        der::Tag::Ia5String => Ia5StringRef::new(value).ok().map(|s| s.as_str().to_string()),
        _ => None,
    };
    match s {
        Some(s) => Ok(s),
        None => Ok(format!("#{}", buffer_to_hex(tlv))),
    }
}

/// get_value_from_rdn returns the value from AttributeTypeAndValue as a string per
/// [`attribute_value_to_string`].
pub fn get_value_from_rdn(atav: &AttributeTypeAndValue) -> Result<String> {
    let enc = atav.value.to_der()?;
    Ok(attribute_value_to_string(&enc)?)
}

// collapse runs of whitespace into one space and ignore case
fn normalize_for_chaining(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}

/// [`compare_names`] compares two Name values returning true if they match and false otherwise.
///
/// This is used for issuer/subject chaining during path building. Values that are not byte-wise
/// identical are compared after trimming, collapsing internal whitespace and lower casing.
pub fn compare_names(left: &Name, right: &Name) -> bool {
    // no match if not the same number of RDNs
    if left.0.len() != right.0.len() {
        return false;
    }

    for (lrdn, rrdn) in left.0.iter().zip(right.0.iter()) {
        if lrdn.0.len() != rrdn.0.len() {
            return false;
        }

        if lrdn == rrdn {
            continue;
        }

        for (l, r) in lrdn.0.iter().zip(rrdn.0.iter()) {
            if l.oid != r.oid {
                return false;
            }

            let l_val = match get_value_from_rdn(l) {
                Ok(val) => normalize_for_chaining(&val),
                Err(_e) => return false,
            };
            let r_val = match get_value_from_rdn(r) {
                Ok(val) => normalize_for_chaining(&val),
                Err(_e) => return false,
            };
            if l_val != r_val {
                return false;
            }
        }
    }
    true
}

/// `buffer_to_hex` takes a byte array and returns a string featuring upper case ASCII hex characters (without
/// commas, spaces, brackets, etc.).
pub fn buffer_to_hex(buffer: &[u8]) -> String {
    let hex = subtle_encoding::hex::encode_upper(buffer);
    let r = core::str::from_utf8(hex.as_slice());
    if let Ok(s) = r {
        s.to_string()
    } else {
        "".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;
    use hex_literal::hex;

    #[test]
    fn compare_names_tolerates_case_and_whitespace() {
        let l = Name::from_str("CN=Test  Root,O=Test PKI,C=US").unwrap();
        let r = Name::from_str("CN=test root,O=Test PKI,C=US").unwrap();
        assert!(compare_names(&l, &r));

        let other = Name::from_str("CN=Other Root,O=Test PKI,C=US").unwrap();
        assert!(!compare_names(&l, &other));

        let shorter = Name::from_str("O=Test PKI,C=US").unwrap();
        assert!(!compare_names(&l, &shorter));
    }

    #[test]
    fn attribute_values() {
        // UTF8String "Allowed"
        assert_eq!(
            "Allowed",
            attribute_value_to_string(&hex!("0C07416C6C6F776564")).unwrap()
        );
        // PrintableString "US"
        assert_eq!("US", attribute_value_to_string(&hex!("13025553")).unwrap());
        // IA5String "a@b"
        assert_eq!("a@b", attribute_value_to_string(&hex!("1603614062")).unwrap());
        // INTEGER 5 falls back to hex of the full encoding
        assert_eq!("#020105", attribute_value_to_string(&hex!("020105")).unwrap());
        assert!(attribute_value_to_string(&hex!("0C")).is_err());
    }

    #[test]
    fn hex_and_oid_lookup() {
        assert_eq!("00AB10", buffer_to_hex(&[0x00, 0xab, 0x10]));
        assert_eq!("O", oid_lookup(&ORGANIZATION_NAME).unwrap());
        assert_eq!(
            Err(Error::NotFound),
            oid_lookup(&ObjectIdentifier::new_unwrap("1.2.3.4"))
        );
    }
}
