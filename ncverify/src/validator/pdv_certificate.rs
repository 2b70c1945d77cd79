//! Wrappers around asn.1 encoder/decoder structures to support certification path processing

use const_oid::db::rfc5912::{ID_CE_BASIC_CONSTRAINTS, ID_CE_KEY_USAGE, ID_CE_SUBJECT_ALT_NAME};
use der::asn1::{BitString, ObjectIdentifier};
use der::{Decode, Encode};
use log::error;
use spki::AlgorithmIdentifierOwned;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{BasicConstraints, KeyUsage, SubjectAltName};
use x509_cert::ext::Extension;
use x509_cert::Certificate;

use crate::asn1::distinguished_name::DistinguishedName;
use crate::util::error::*;
use crate::validator::path_settings::ObjectIdentifierSet;
use crate::validator::path_validator::EXTS_OF_INTEREST;
use crate::validator::pdv_extension::*;

/// [`PDVCertificate`] is used to aggregate a binary, DER-encoded Certificate, a parsed Certificate
/// and parsed extensions in support of certification path validation and name constraint enforcement.
///
/// The parsed extensions are those listed in [`EXTS_OF_INTEREST`]. A `PDVCertificate` is never
/// modified once constructed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PDVCertificate {
    /// Binary, encoded Certificate object
    pub encoded_cert: Vec<u8>,
    /// Decoded Certificate object
    pub decoded_cert: Certificate,
    /// Parsed extensions from the Certificate
    pub parsed_extensions: ParsedExtensions,
}

impl TryFrom<&[u8]> for PDVCertificate {
    type Error = der::Error;

    fn try_from(enc_cert: &[u8]) -> der::Result<Self> {
        let cert = Certificate::from_der(enc_cert)?;
        let mut pdv_cert = PDVCertificate {
            encoded_cert: enc_cert.to_vec(),
            decoded_cert: cert,
            parsed_extensions: Default::default(),
        };
        pdv_cert.parse_extensions(EXTS_OF_INTEREST);
        Ok(pdv_cert)
    }
}

impl TryFrom<Certificate> for PDVCertificate {
    type Error = der::Error;

    fn try_from(cert: Certificate) -> der::Result<Self> {
        let enc_cert = cert.to_der()?;
        let mut pdv_cert = PDVCertificate {
            encoded_cert: enc_cert,
            decoded_cert: cert,
            parsed_extensions: Default::default(),
        };
        pdv_cert.parse_extensions(EXTS_OF_INTEREST);
        Ok(pdv_cert)
    }
}

impl PDVCertificate {
    /// `subject_name` returns the subject of the certificate as a [`DistinguishedName`].
    pub fn subject_name(&self) -> Result<DistinguishedName> {
        DistinguishedName::try_from(&self.decoded_cert.tbs_certificate.subject)
    }

    /// `dns_names` returns the dNSName entries from the subjectAltName extension, in the order they
    /// appear. An absent extension yields an empty list.
    pub fn dns_names(&self) -> Vec<String> {
        let mut names = vec![];
        if let Ok(Some(PDVExtension::SubjectAltName(san))) =
            self.get_extension(&ID_CE_SUBJECT_ALT_NAME)
        {
            for gn in san.0.iter() {
                if let GeneralName::DnsName(dns) = gn {
                    names.push(dns.to_string());
                }
            }
        }
        names
    }

    /// `extension` returns the first extension with the given type, if present.
    pub fn extension(&self, oid: &ObjectIdentifier) -> Option<&Extension> {
        match &self.decoded_cert.tbs_certificate.extensions {
            Some(exts) => exts.iter().find(|ext| ext.extn_id == *oid),
            None => None,
        }
    }

    /// `unhandled_critical_extensions` returns the types of critical extensions present in the
    /// certificate that do not appear in `processed`. The certificate is not modified.
    pub fn unhandled_critical_extensions(
        &self,
        processed: &ObjectIdentifierSet,
    ) -> Vec<ObjectIdentifier> {
        match &self.decoded_cert.tbs_certificate.extensions {
            Some(exts) => exts
                .iter()
                .filter(|ext| ext.critical && !processed.contains(&ext.extn_id))
                .map(|ext| ext.extn_id)
                .collect(),
            None => vec![],
        }
    }
}

impl ExtensionProcessing for PDVCertificate {
    /// `get_extension` takes an ObjectIdentifier that identifies an extension type and returns
    /// a previously parsed [`PDVExtension`] instance containing the decoded extension if the extension was present.
    fn get_extension(&self, oid: &ObjectIdentifier) -> Result<Option<&'_ PDVExtension>> {
        Ok(self.parsed_extensions.get(oid))
    }

    /// `parse_extensions` parses each extension type in `oids` that is present in the certificate.
    fn parse_extensions(&'_ mut self, oids: &[ObjectIdentifier]) {
        for oid in oids {
            if let Some(e) = self.parse_extension(oid).err() {
                error!(
                    "Failed to parse extension {} in certificate with subject {}: {}",
                    oid, self.decoded_cert.tbs_certificate.subject, e
                );
            }
        }
    }

    fn parse_extension(&mut self, oid: &ObjectIdentifier) -> Result<Option<&PDVExtension>> {
        macro_rules! add_and_return {
            ($pe:ident, $v:ident, $t:ident) => {
                match $t::from_der($v) {
                    Ok(r) => {
                        let ext = PDVExtension::$t(r);
                        $pe.insert(*oid, ext);
                        return Ok($pe.get(oid));
                    }
                    Err(e) => {
                        return Err(Error::Asn1Error(e));
                    }
                }
            };
        }

        let pe = &mut self.parsed_extensions;
        if pe.contains_key(oid) {
            return Ok(pe.get(oid));
        }

        if let Some(exts) = self.decoded_cert.tbs_certificate.extensions.as_ref() {
            if let Some(i) = exts.iter().find(|&ext| ext.extn_id == *oid) {
                let v = i.extn_value.as_bytes();
                match *oid {
                    ID_CE_BASIC_CONSTRAINTS => {
                        add_and_return!(pe, v, BasicConstraints);
                    }
                    ID_CE_KEY_USAGE => {
                        add_and_return!(pe, v, KeyUsage);
                    }
                    ID_CE_SUBJECT_ALT_NAME => {
                        add_and_return!(pe, v, SubjectAltName);
                    }
                    _ => {
                        // ignore unrecognized
                    }
                }
            }
        }
        Ok(None)
    }
}

/// [`DeferDecodeSigned`] used to parse only the top-level Certificate structure, without parsing the details of the
/// TBSCertificate, AlgorithmIdentifier or BIT STRING fields.
///
/// Deferred decoding is useful when verifying certificates to avoid re-encoding the TBSCertificate
/// (and potentially encountering problems with structures that were not DER-encoded prior to signing).
/// This is intended to be used in tandem with a [`PDVCertificate`] structure that contains a fully-decoded
/// Certificate structure.
pub struct DeferDecodeSigned {
    /// tbsCertificate       TBSCertificate,
    pub tbs_field: Vec<u8>,
    /// signatureAlgorithm   AlgorithmIdentifier,
    pub signature_algorithm: AlgorithmIdentifierOwned,
    /// signature            BIT STRING
    pub signature: BitString,
}

impl ::der::FixedTag for DeferDecodeSigned {
    const TAG: ::der::Tag = ::der::Tag::Sequence;
}

impl<'a> ::der::DecodeValue<'a> for DeferDecodeSigned {
    fn decode_value<R: ::der::Reader<'a>>(
        reader: &mut R,
        header: ::der::Header,
    ) -> ::der::Result<Self> {
        use ::der::Reader as _;
        reader.read_nested(header.length, |reader| {
            let tbs_certificate = reader.tlv_bytes()?;
            let signature_algorithm = reader.decode()?;
            let signature = reader.decode()?;
            Ok(Self {
                tbs_field: tbs_certificate.to_vec(),
                signature_algorithm,
                signature,
            })
        })
    }
}

/// `parse_cert` takes a buffer containing a binary DER encoded certificate and returns
/// a [`PDVCertificate`] containing the parsed certificate if parsing was successful.
pub fn parse_cert(buffer: &[u8]) -> Result<PDVCertificate> {
    match PDVCertificate::try_from(buffer) {
        Ok(cert) => Ok(cert),
        Err(e) => {
            error!("Failed to parse certificate: {}", e);
            Err(Error::Asn1Error(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use const_oid::db::rfc5912::ID_CE_NAME_CONSTRAINTS;

    #[test]
    fn parse_leaf_and_ca() {
        let leaf = parse_cert(include_bytes!("../../tests/examples/leaf_blocked.der")).unwrap();
        assert_eq!(
            vec!["blocked.example.com".to_string(), "www.example.com".to_string()],
            leaf.dns_names()
        );
        assert_eq!("CN=blocked,O=Allowed", leaf.subject_name().unwrap().to_string());
        assert!(leaf.extension(&ID_CE_NAME_CONSTRAINTS).is_none());

        let ca = parse_cert(include_bytes!("../../tests/examples/ca_dirname.der")).unwrap();
        assert!(ca.dns_names().is_empty());
        let nc = ca.extension(&ID_CE_NAME_CONSTRAINTS).unwrap();
        assert!(nc.critical);
        assert!(matches!(
            ca.get_extension(&ID_CE_BASIC_CONSTRAINTS),
            Ok(Some(PDVExtension::BasicConstraints(_)))
        ));

        // basicConstraints and keyUsage are critical, nameConstraints is critical too
        let mut processed = ObjectIdentifierSet::new();
        assert!(ca
            .unhandled_critical_extensions(&processed)
            .contains(&ID_CE_NAME_CONSTRAINTS));
        processed.insert(ID_CE_BASIC_CONSTRAINTS);
        processed.insert(ID_CE_KEY_USAGE);
        processed.insert(ID_CE_NAME_CONSTRAINTS);
        assert!(ca.unhandled_critical_extensions(&processed).is_empty());
    }

    #[test]
    fn defer_decode_matches_tbs() {
        let enc = include_bytes!("../../tests/examples/leaf_allowed.der");
        let cert = parse_cert(enc).unwrap();
        let defer = DeferDecodeSigned::from_der(enc).unwrap();
        assert_eq!(cert.decoded_cert.tbs_certificate.to_der().unwrap(), defer.tbs_field);
        assert_eq!(cert.decoded_cert.signature, defer.signature);
    }

    #[test]
    fn parse_garbage() {
        assert!(parse_cert(&[0x30, 0x03, 0x02, 0x01]).is_err());
    }
}
