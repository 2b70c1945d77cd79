//! Provides structure that represents a certification path including target, optional intermediate CAs
//! and trust anchor.

use crate::validator::path_settings::CertificateChain;
use crate::validator::pdv_certificate::PDVCertificate;

/// `CertificationPath` is used to represent the trust anchor, intermediate CA certificates and target certificate
/// that comprise a certification path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificationPath {
    /// `target` contains the target certificate for the certification path
    pub target: PDVCertificate,
    /// `intermediates` contains zero or more intermediate CA certificates, beginning with the certificate that
    /// issued `target` and proceeding in order toward the trust anchor, i.e., `intermediates\[0\]` can be used
    /// to verify `target`, `intermediates\[1\]` can be used to verify `intermediates\[0\]`, etc. until
    /// `trust_anchor` can be used to verify `intermediates[intermediates.len() - 1]`.
    pub intermediates: CertificateChain,
    /// `trust_anchor` contains the trust anchor for the certification path
    pub trust_anchor: PDVCertificate,
}

impl CertificationPath {
    /// instantiates a new CertificationPath
    pub fn new(
        trust_anchor: PDVCertificate,
        intermediates: CertificateChain,
        target: PDVCertificate,
    ) -> CertificationPath {
        CertificationPath {
            trust_anchor,
            intermediates,
            target,
        }
    }

    /// `chain` returns the certificates in the path with the target at index 0 and the trust anchor
    /// last.
    pub fn chain(&self) -> Vec<&PDVCertificate> {
        let mut v = Vec::with_capacity(self.intermediates.len() + 2);
        v.push(&self.target);
        v.extend(self.intermediates.iter());
        v.push(&self.trust_anchor);
        v
    }

    /// `issuers` returns every certificate in the path other than the target, i.e., the intermediate
    /// CA certificates followed by the trust anchor.
    pub fn issuers(&self) -> Vec<&PDVCertificate> {
        self.intermediates
            .iter()
            .chain(std::iter::once(&self.trust_anchor))
            .collect()
    }
}

#[test]
fn chain_order_test() {
    use crate::validator::pdv_certificate::parse_cert;

    let root = parse_cert(include_bytes!("../../tests/examples/root.der")).unwrap();
    let ca = parse_cert(include_bytes!("../../tests/examples/ca_dirname.der")).unwrap();
    let sub = parse_cert(include_bytes!("../../tests/examples/ca_unconstrained_sub.der")).unwrap();
    let leaf = parse_cert(include_bytes!("../../tests/examples/leaf_deep_allowed.der")).unwrap();

    let cp = CertificationPath::new(root.clone(), vec![sub.clone(), ca.clone()], leaf.clone());
    assert_eq!(vec![&leaf, &sub, &ca, &root], cp.chain());
    assert_eq!(vec![&sub, &ca, &root], cp.issuers());
}
