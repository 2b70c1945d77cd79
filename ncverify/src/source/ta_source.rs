//! Provides implementation of a read-only in-memory trust anchor store. The following snip
//! illustrates preparation and use of a [`TaSource`] object.
//!
//! ```
//! use ncverify::{CertificationPathSettings, PathValidator, TaSource};
//!
//! let mut ta_source = TaSource::new();
//! // DER-encoded certificates are added with add_trust_anchor_der and PEM-encoded certificates
//! // with add_trust_anchors_pem. Buffers that do not parse are rejected.
//! assert!(ta_source.add_trust_anchor_der(&[0x30, 0x00]).is_err());
//! assert!(ta_source.is_empty());
//!
//! let _pv = PathValidator::new(ta_source, CertificationPathSettings::new());
//! ```
//!
//! Once populated, a [`TaSource`] is handed to a [`PathValidator`](crate::PathValidator) and is
//! not modified again, so it can be shared across threads without locking.

use log::{debug, error};
use sha2::{Digest, Sha256};
use x509_cert::name::Name;
use x509_cert::Certificate;

use crate::{
    util::error::*,
    util::pdv_utilities::{buffer_to_hex, compare_names, name_to_string},
    validator::pdv_certificate::PDVCertificate,
};

/// The `TrustAnchorSource` trait defines the interface used by the default chain validator to
/// locate trust anchors.
pub trait TrustAnchorSource {
    /// `get_trust_anchors_for_name` returns all trust anchors whose subject matches `name`.
    fn get_trust_anchors_for_name(&self, name: &Name) -> Vec<&PDVCertificate>;

    /// `is_cert_a_trust_anchor` returns true if the certificate is byte-for-byte identical to a
    /// trust anchor.
    fn is_cert_a_trust_anchor(&self, cert: &PDVCertificate) -> bool;
}

/// `TaSource` holds trust anchors expressed as self-signed certificates.
#[derive(Clone, Debug, Default)]
pub struct TaSource {
    tas: Vec<PDVCertificate>,
}

impl TaSource {
    /// instantiates a new empty TaSource
    pub fn new() -> TaSource {
        TaSource::default()
    }

    /// `add_trust_anchor_der` parses a DER-encoded certificate and adds it to the store.
    /// Duplicates are ignored.
    pub fn add_trust_anchor_der(&mut self, der: &[u8]) -> Result<()> {
        let ta = match PDVCertificate::try_from(der) {
            Ok(ta) => ta,
            Err(e) => {
                error!("Failed to parse trust anchor: {}", e);
                return Err(Error::Asn1Error(e));
            }
        };
        self.push(ta);
        Ok(())
    }

    /// `add_trust_anchors_pem` parses a buffer containing one or more PEM-encoded certificates and
    /// adds each to the store. Returns the number of certificates read.
    pub fn add_trust_anchors_pem(&mut self, pem: &[u8]) -> Result<usize> {
        let certs = match Certificate::load_pem_chain(pem) {
            Ok(certs) => certs,
            Err(e) => {
                error!("Failed to parse PEM trust anchors: {}", e);
                return Err(Error::Asn1Error(e));
            }
        };
        let count = certs.len();
        for cert in certs {
            self.push(PDVCertificate::try_from(cert)?);
        }
        Ok(count)
    }

    fn push(&mut self, ta: PDVCertificate) {
        if !self.is_cert_a_trust_anchor(&ta) {
            self.tas.push(ta);
        }
    }

    /// Returns the trust anchors held by this store
    pub fn get_tas(&self) -> &[PDVCertificate] {
        &self.tas
    }

    /// Number of trust anchors in the store
    pub fn len(&self) -> usize {
        self.tas.len()
    }

    /// True if the store holds no trust anchors
    pub fn is_empty(&self) -> bool {
        self.tas.is_empty()
    }

    /// `log_tas` logs the subject and SHA-256 hash of each trust anchor at debug level.
    pub fn log_tas(&self) {
        for (i, ta) in self.tas.iter().enumerate() {
            let digest = Sha256::digest(&ta.encoded_cert);
            debug!(
                "Trust anchor {}: {} - {}",
                i + 1,
                buffer_to_hex(&digest),
                name_to_string(&ta.decoded_cert.tbs_certificate.subject)
            );
        }
    }
}

impl TrustAnchorSource for TaSource {
    fn get_trust_anchors_for_name(&self, name: &Name) -> Vec<&PDVCertificate> {
        self.tas
            .iter()
            .filter(|ta| compare_names(&ta.decoded_cert.tbs_certificate.subject, name))
            .collect()
    }

    fn is_cert_a_trust_anchor(&self, cert: &PDVCertificate) -> bool {
        self.tas.iter().any(|ta| ta.encoded_cert == cert.encoded_cert)
    }
}

#[test]
fn get_trust_anchor_test() {
    let mut ta_source = TaSource::new();
    assert!(ta_source.is_empty());
    ta_source
        .add_trust_anchor_der(include_bytes!("../../tests/examples/root.der"))
        .unwrap();
    // same certificate in PEM form is not added twice
    assert_eq!(
        1,
        ta_source
            .add_trust_anchors_pem(include_bytes!("../../tests/examples/root.pem"))
            .unwrap()
    );
    assert_eq!(1, ta_source.len());
    ta_source.log_tas();

    let ca = PDVCertificate::try_from(
        include_bytes!("../../tests/examples/ca_dirname.der").as_slice(),
    )
    .unwrap();
    let tas = ta_source.get_trust_anchors_for_name(&ca.decoded_cert.tbs_certificate.issuer);
    assert_eq!(1, tas.len());
    assert!(ta_source.is_cert_a_trust_anchor(tas[0]));
    assert!(!ta_source.is_cert_a_trust_anchor(&ca));
    assert!(ta_source
        .get_trust_anchors_for_name(&ca.decoded_cert.tbs_certificate.subject)
        .is_empty());

    assert!(ta_source.add_trust_anchor_der(&[0x30, 0x00]).is_err());
    assert!(ta_source.add_trust_anchors_pem(b"garbage").is_err());
}
