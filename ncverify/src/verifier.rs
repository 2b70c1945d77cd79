//! Peer certificate verification for TLS clients and servers
//!
//! [`CertVerifier`] combines chain validation, server name verification and name constraint
//! enforcement. Chains are validated with the NameConstraints extension deferred, then every
//! issuer in every validated chain has its constraints enforced against the leaf certificate.
//!
//! ```
//! use ncverify::{CertVerifier, CertificationPathSettings, Error, TaSource};
//!
//! let ta_source = TaSource::new();
//! // populate ta_source, then share the verifier across handshakes
//! let verifier = CertVerifier::new(ta_source, CertificationPathSettings::new());
//!
//! let presented: [&[u8]; 0] = [];
//! assert_eq!(
//!     Err(Error::NoCertificates),
//!     verifier.verify_peer_certificate(&presented, "host.example.com")
//! );
//! ```

use core::fmt;

use log::{debug, info, warn};

use crate::asn1::name_constraints::DecodeDiagnostic;
use crate::source::ta_source::TaSource;
use crate::util::error::*;
use crate::util::pdv_utilities::name_to_string;
use crate::validator::hostname::verify_hostname;
use crate::validator::name_constraints_set::enforce_issuer_constraints;
use crate::validator::path_settings::{CertificationPathSettings, ObjectIdentifierSet};
use crate::validator::path_validator::{ChainValidator, PathValidator, DEFERRED_CRITICAL_EXTENSIONS};
use crate::validator::pdv_certificate::{parse_cert, PDVCertificate};

/// Stages of a single peer certificate verification. Any failing stage moves directly to
/// `Rejected`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VerificationState {
    /// Nothing has been evaluated yet
    Pending,
    /// Building and validating certification paths
    VerifyingChain,
    /// Matching the expected server name against the leaf certificate
    VerifyingHostname,
    /// Enforcing name constraints asserted by issuers in each validated path
    EnforcingConstraints,
    /// All stages succeeded
    Accepted,
    /// A stage failed
    Rejected,
}

impl fmt::Display for VerificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Outcome of [`CertVerifier::verify`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PeerVerification {
    /// Final state, either `Accepted` or `Rejected`
    pub state: VerificationState,
    /// Stage that was running when verification ended
    pub last_stage: VerificationState,
    /// `Ok` when accepted, otherwise the error produced by the failing stage
    pub result: Result<()>,
    /// directoryName subtrees that were dropped because they could not be decoded
    pub diagnostics: Vec<DecodeDiagnostic>,
}

impl PeerVerification {
    fn new() -> Self {
        PeerVerification {
            state: VerificationState::Pending,
            last_stage: VerificationState::Pending,
            result: Ok(()),
            diagnostics: vec![],
        }
    }

    fn transition(&mut self, next: VerificationState) {
        debug!("peer verification: {} -> {}", self.state, next);
        self.state = next;
        if next != VerificationState::Rejected && next != VerificationState::Accepted {
            self.last_stage = next;
        }
    }

    fn finish(mut self, result: Result<()>) -> Self {
        match &result {
            Ok(()) => self.transition(VerificationState::Accepted),
            Err(e) => {
                debug!("peer verification failed during {}: {}", self.last_stage, e);
                self.transition(VerificationState::Rejected)
            }
        }
        self.result = result;
        self
    }
}

/// `CertVerifier` verifies the certificates presented by a TLS peer. It is immutable once
/// constructed and may be shared across threads, e.g., within an `Arc`.
#[derive(Clone, Debug)]
pub struct CertVerifier<V: ChainValidator = PathValidator> {
    validator: V,
}

impl CertVerifier<PathValidator> {
    /// Creates a verifier that uses [`PathValidator`] with the given trust anchors and settings.
    pub fn new(ta_source: TaSource, cps: CertificationPathSettings) -> Self {
        ta_source.log_tas();
        CertVerifier {
            validator: PathValidator::new(ta_source, cps),
        }
    }
}

impl<V: ChainValidator> CertVerifier<V> {
    /// Creates a verifier that uses the given chain validator.
    pub fn with_validator(validator: V) -> Self {
        CertVerifier { validator }
    }

    /// Returns the chain validator
    pub fn validator(&self) -> &V {
        &self.validator
    }

    /// `verify_peer_certificate` verifies the DER-encoded certificates presented by a peer, leaf first
    /// followed by any intermediate CA certificates, against the expected server name.
    ///
    /// Returns `Ok(())` when a path to a trust anchor validates, the leaf carries `server_name` as a
    /// DNS name and no issuer in any validated path asserts a name constraint the leaf violates.
    pub fn verify_peer_certificate<B: AsRef<[u8]>>(
        &self,
        raw_certs: &[B],
        server_name: &str,
    ) -> Result<()> {
        self.verify(raw_certs, server_name).result
    }

    /// `verify` behaves as [`verify_peer_certificate`](Self::verify_peer_certificate) and also reports
    /// the stage reached and any decode diagnostics.
    pub fn verify<B: AsRef<[u8]>>(&self, raw_certs: &[B], server_name: &str) -> PeerVerification {
        let mut pv = PeerVerification::new();
        let result = self.run(&mut pv, raw_certs, server_name);
        pv.finish(result)
    }

    fn run<B: AsRef<[u8]>>(
        &self,
        pv: &mut PeerVerification,
        raw_certs: &[B],
        server_name: &str,
    ) -> Result<()> {
        let (leaf, intermediates) = parse_presented(raw_certs)?;

        pv.transition(VerificationState::VerifyingChain);
        let deferred: ObjectIdentifierSet = DEFERRED_CRITICAL_EXTENSIONS.iter().copied().collect();
        let paths = self
            .validator
            .validate_chains(&leaf, &intermediates, &deferred)?;

        pv.transition(VerificationState::VerifyingHostname);
        verify_hostname(&leaf, server_name)?;

        pv.transition(VerificationState::EnforcingConstraints);
        for cp in paths.iter() {
            for issuer in cp.issuers() {
                let diagnostics = enforce_issuer_constraints(issuer, &cp.target)?;
                for d in diagnostics {
                    warn!(
                        "Name constraints in certificate issued to {}: {}",
                        name_to_string(&issuer.decoded_cert.tbs_certificate.subject),
                        d
                    );
                    pv.diagnostics.push(d);
                }
            }
        }

        info!(
            "Accepted peer certificate issued to {} for {} ({} validated path(s))",
            name_to_string(&leaf.decoded_cert.tbs_certificate.subject),
            server_name,
            paths.len()
        );
        Ok(())
    }
}

fn parse_presented<B: AsRef<[u8]>>(
    raw_certs: &[B],
) -> Result<(PDVCertificate, Vec<PDVCertificate>)> {
    let (first, rest) = match raw_certs.split_first() {
        Some(split) => split,
        None => return Err(Error::NoCertificates),
    };
    let leaf = parse_cert(first.as_ref())?;
    let mut intermediates = Vec::with_capacity(rest.len());
    for raw in rest {
        intermediates.push(parse_cert(raw.as_ref())?);
    }
    Ok((leaf, intermediates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::cert_path::CertificationPath;

    fn verifier() -> CertVerifier {
        let mut ta_source = TaSource::new();
        ta_source
            .add_trust_anchor_der(include_bytes!("../tests/examples/root.der"))
            .unwrap();
        CertVerifier::new(ta_source, CertificationPathSettings::new())
    }

    #[test]
    fn states_test() {
        let v = verifier();
        let none: [&[u8]; 0] = [];
        let pv = v.verify(&none, "host.allowed.com");
        assert_eq!(VerificationState::Rejected, pv.state);
        assert_eq!(VerificationState::Pending, pv.last_stage);
        assert_eq!(Err(Error::NoCertificates), pv.result);

        let leaf = include_bytes!("../tests/examples/leaf_allowed.der").as_slice();
        let ca = include_bytes!("../tests/examples/ca_dirname.der").as_slice();

        let pv = v.verify(&[leaf], "host.allowed.com");
        assert_eq!(VerificationState::VerifyingChain, pv.last_stage);

        let pv = v.verify(&[leaf, ca], "other.allowed.com");
        assert_eq!(VerificationState::VerifyingHostname, pv.last_stage);
        assert_eq!(Err(Error::HostnameMismatch), pv.result);

        let not_allowed = include_bytes!("../tests/examples/leaf_not_allowed.der").as_slice();
        let pv = v.verify(&[not_allowed, ca], "host.allowed.com");
        assert_eq!(VerificationState::EnforcingConstraints, pv.last_stage);
        assert_eq!(VerificationState::Rejected, pv.state);

        let pv = v.verify(&[leaf, ca], "host.allowed.com");
        assert_eq!(VerificationState::Accepted, pv.state);
        assert_eq!(VerificationState::EnforcingConstraints, pv.last_stage);
        assert!(pv.result.is_ok());
        assert!(pv.diagnostics.is_empty());
    }

    #[test]
    fn garbage_is_rejected() {
        let v = verifier();
        let pv = v.verify(&[[0x30u8, 0x03, 0x02, 0x01, 0x00]], "host.allowed.com");
        assert!(matches!(pv.result, Err(Error::Asn1Error(_))));
    }

    struct AcceptEverything;

    impl ChainValidator for AcceptEverything {
        fn validate_chains(
            &self,
            target: &PDVCertificate,
            intermediates: &[PDVCertificate],
            _deferred: &ObjectIdentifierSet,
        ) -> Result<Vec<CertificationPath>> {
            let mut chain = intermediates.to_vec();
            let ta = match chain.pop() {
                Some(ta) => ta,
                None => return Err(Error::PathValidation(PathValidationStatus::NoPathsFound)),
            };
            Ok(vec![CertificationPath::new(ta, chain, target.clone())])
        }
    }

    #[test]
    fn custom_validator_still_enforces_constraints() {
        let v = CertVerifier::with_validator(AcceptEverything);
        let ca = include_bytes!("../tests/examples/ca_dirname.der").as_slice();
        let leaf = include_bytes!("../tests/examples/leaf_not_allowed.der").as_slice();
        assert_eq!(
            Err(Error::Constraint(ConstraintError::SubjectNotPermitted)),
            v.verify_peer_certificate(&[leaf, ca], "host.allowed.com")
        );
    }
}
