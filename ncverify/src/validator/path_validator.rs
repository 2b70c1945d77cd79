//! Functions related to certification path development and validation operations

use const_oid::db::rfc5912::*;
use der::{asn1::ObjectIdentifier, Decode};
use x509_cert::ext::pkix::KeyUsages;

use crate::{
    source::ta_source::{TaSource, TrustAnchorSource},
    util::crypto::verify_signature_message_rust_crypto,
    util::error::*,
    util::logging::*,
    util::pdv_utilities::*,
    validator::cert_path::CertificationPath,
    validator::path_results::CertificationPathResults,
    validator::path_settings::*,
    validator::pdv_certificate::*,
    validator::pdv_extension::*,
};

/// `EXTS_OF_INTEREST` provides a list of extensions that will be automatically parsed when preparing
/// a [`PDVCertificate`] instance. These extensions are used during path development, validation and
/// name constraint enforcement and are subsequently available via get_extension without re-parsing.
pub const EXTS_OF_INTEREST: &[ObjectIdentifier] = &[
    ID_CE_BASIC_CONSTRAINTS,
    ID_CE_KEY_USAGE,
    ID_CE_SUBJECT_ALT_NAME,
];

/// `DEFERRED_CRITICAL_EXTENSIONS` lists critical extensions that [`PathValidator`] callers in this
/// crate process themselves after chain validation succeeds.
pub const DEFERRED_CRITICAL_EXTENSIONS: &[ObjectIdentifier] = &[ID_CE_NAME_CONSTRAINTS];

/// Maximum number of candidate paths [`PathValidator::find_paths`] returns for one target.
pub const MAX_CANDIDATE_PATHS: usize = 100;

/// Maximum number of issuer candidates [`PathValidator::find_paths`] examines for one target.
pub const MAX_PATH_BUILDING_STEPS: usize = 10_000;

/// The `ChainValidator` trait defines the interface used by the verifier to obtain validated
/// certification paths for a target certificate.
pub trait ChainValidator {
    /// `validate_chains` builds and validates certification paths from `target` to a trust anchor
    /// using the certificates in `intermediates` (in any order) and returns every path that
    /// validated successfully.
    ///
    /// Critical extensions whose types appear in `deferred` are treated as processed by the validator;
    /// the caller takes responsibility for enforcing them. Any other unprocessed critical extension
    /// causes a path to be rejected. When no path validates, the first failure encountered is
    /// returned.
    fn validate_chains(
        &self,
        target: &PDVCertificate,
        intermediates: &[PDVCertificate],
        deferred: &ObjectIdentifierSet,
    ) -> Result<Vec<CertificationPath>>;
}

/// `PathValidator` is the default [`ChainValidator`]. It builds paths depth-first from the target to
/// trust anchors held in a [`TaSource`] then validates each path per a subset of [RFC 5280 Section 6.1].
///
/// [RFC 5280 Section 6.1]: <https://datatracker.ietf.org/doc/html/rfc5280.html#section-6.1>
#[derive(Clone, Debug)]
pub struct PathValidator {
    ta_source: TaSource,
    cps: CertificationPathSettings,
}

impl PathValidator {
    /// Creates a new [`PathValidator`] from a populated trust anchor store and settings
    pub fn new(ta_source: TaSource, cps: CertificationPathSettings) -> Self {
        PathValidator { ta_source, cps }
    }

    /// Returns the trust anchor store
    pub fn ta_source(&self) -> &TaSource {
        &self.ta_source
    }

    /// Returns the settings used when validating paths
    pub fn settings(&self) -> &CertificationPathSettings {
        &self.cps
    }

    /// `find_paths` returns candidate paths from `target` to a trust anchor, without validating any
    /// of them. No certificate appears twice in a path and paths never contain more than
    /// `PS_INITIAL_PATH_LENGTH_CONSTRAINT` + 1 intermediate CA certificates.
    ///
    /// Byte-identical intermediates are considered once. The search stops early after
    /// [`MAX_CANDIDATE_PATHS`] paths have been found or [`MAX_PATH_BUILDING_STEPS`] issuer
    /// candidates have been examined.
    pub fn find_paths(
        &self,
        target: &PDVCertificate,
        intermediates: &[PDVCertificate],
    ) -> Vec<CertificationPath> {
        let mut candidates: Vec<&PDVCertificate> = vec![];
        for ca in intermediates {
            if ca.encoded_cert == target.encoded_cert
                || self.ta_source.is_cert_a_trust_anchor(ca)
                || candidates.iter().any(|c| c.encoded_cert == ca.encoded_cert)
            {
                continue;
            }
            candidates.push(ca);
        }

        let mut search = PathSearch {
            ta_source: &self.ta_source,
            target,
            used: vec![false; candidates.len()],
            candidates,
            partial: vec![],
            max_intermediates: self.cps.get_initial_path_length_constraint() as usize + 1,
            steps: 0,
            paths: vec![],
        };
        search.extend(target);
        if search.exhausted() {
            log_message(
                &PeLogLevels::PeWarn,
                format!(
                    "Path building for {} stopped after {} steps with {} candidate path(s)",
                    name_to_string(&target.decoded_cert.tbs_certificate.subject),
                    search.steps,
                    search.paths.len()
                )
                .as_str(),
            );
        }
        search.paths
    }

    /// `validate_path` validates a single path after marking the extension types in `deferred` as
    /// processed.
    pub fn validate_path(
        &self,
        cp: &CertificationPath,
        cpr: &mut CertificationPathResults,
        deferred: &ObjectIdentifierSet,
    ) -> Result<()> {
        for oid in deferred {
            cpr.add_processed_extension(*oid);
        }
        validate_path_rfc5280(&self.cps, cp, cpr)
    }
}

/// Depth-first search state for a single target. `used` and `partial` index into `candidates`.
struct PathSearch<'a> {
    ta_source: &'a TaSource,
    target: &'a PDVCertificate,
    candidates: Vec<&'a PDVCertificate>,
    used: Vec<bool>,
    partial: Vec<usize>,
    max_intermediates: usize,
    steps: usize,
    paths: Vec<CertificationPath>,
}

impl<'a> PathSearch<'a> {
    fn exhausted(&self) -> bool {
        self.steps >= MAX_PATH_BUILDING_STEPS || self.paths.len() >= MAX_CANDIDATE_PATHS
    }

    fn extend(&mut self, current: &'a PDVCertificate) {
        let ta_source = self.ta_source;
        let issuer_name = &current.decoded_cert.tbs_certificate.issuer;
        for ta in ta_source.get_trust_anchors_for_name(issuer_name) {
            if self.paths.len() >= MAX_CANDIDATE_PATHS {
                return;
            }
            let chain = self.partial.iter().map(|i| self.candidates[*i].clone()).collect();
            self.paths
                .push(CertificationPath::new(ta.clone(), chain, self.target.clone()));
        }

        if self.partial.len() >= self.max_intermediates {
            return;
        }

        for i in 0..self.candidates.len() {
            if self.exhausted() {
                return;
            }
            self.steps += 1;
            let ca = self.candidates[i];
            if self.used[i]
                || !compare_names(&ca.decoded_cert.tbs_certificate.subject, issuer_name)
            {
                continue;
            }
            self.used[i] = true;
            self.partial.push(i);
            self.extend(ca);
            self.partial.pop();
            self.used[i] = false;
        }
    }
}

impl ChainValidator for PathValidator {
    fn validate_chains(
        &self,
        target: &PDVCertificate,
        intermediates: &[PDVCertificate],
        deferred: &ObjectIdentifierSet,
    ) -> Result<Vec<CertificationPath>> {
        let candidates = self.find_paths(target, intermediates);
        if candidates.is_empty() {
            log_error_for_ca(target, "no candidate certification paths found");
            return Err(Error::PathValidation(PathValidationStatus::NoPathsFound));
        }

        let mut valid_paths = vec![];
        let mut first_error = None;
        for cp in candidates {
            let mut cpr = CertificationPathResults::new();
            match self.validate_path(&cp, &mut cpr, deferred) {
                Ok(()) => valid_paths.push(cp),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if !valid_paths.is_empty() {
            return Ok(valid_paths);
        }
        match first_error {
            Some(e) => Err(e),
            None => Err(Error::PathValidation(PathValidationStatus::NoPathsFound)),
        }
    }
}

//-----------------------------------------------------------------------------
// Top level function that aggregates lower level checks.
//-----------------------------------------------------------------------------
/// `validate_path_rfc5280` aggregates various checks to perform certification path validation per
/// [RFC 5280 Section 6.1]. Name constraints and certificate policies are not processed here.
///
/// - The [`CertificationPathSettings`] parameter defines values that govern path validation.
/// - The [`CertificationPath`] parameter provides the target certificate to validate along with a trust
/// anchor and, if necessary, intermediate CA certificates.
/// - The [`CertificationPathResults`] parameter is used to collect potentially useful information from the
/// certification path validation operation. Extensions already recorded as processed are not
/// reported as unprocessed critical extensions.
///
/// [RFC 5280 Section 6.1]: <https://datatracker.ietf.org/doc/html/rfc5280.html#section-6.1>
pub fn validate_path_rfc5280(
    cps: &CertificationPathSettings,
    cp: &CertificationPath,
    cpr: &mut CertificationPathResults,
) -> Result<()> {
    check_validity(cps, cp, cpr)?;
    check_names(cps, cp, cpr)?;
    check_basic_constraints(cps, cp, cpr)?;
    check_key_usage(cps, cp, cpr)?;
    check_critical_extensions(cps, cp, cpr)?;
    verify_signatures(cps, cp, cpr)?;
    cpr.set_validation_status(PathValidationStatus::Valid);
    log_message(
        &PeLogLevels::PeInfo,
        format!(
            "Successfully completed basic path validation checks for certificate issued to {}",
            name_to_string(&cp.target.decoded_cert.tbs_certificate.subject)
        )
        .as_str(),
    );
    Ok(())
}

fn fail(cpr: &mut CertificationPathResults, pvs: PathValidationStatus) -> Result<()> {
    cpr.set_validation_status(pvs);
    Err(Error::PathValidation(pvs))
}

//-----------------------------------------------------------------------------
// Functions that perform some small aspect of path validation
//-----------------------------------------------------------------------------
/// `check_validity` evaluates the target certificate, intermediate certificates and, when
/// `PS_ENFORCE_TRUST_ANCHOR_VALIDITY` is set, the trust anchor against the `PS_TIME_OF_INTEREST`
/// value read from the [`CertificationPathSettings`] parameter.
pub fn check_validity(
    cps: &CertificationPathSettings,
    cp: &CertificationPath,
    cpr: &mut CertificationPathResults,
) -> Result<()> {
    let toi = cps.get_time_of_interest();
    if 0 == toi {
        log_message(
            &PeLogLevels::PeInfo,
            "check_validity invoked with no time of interest; validity check disabled",
        );
        return Ok(());
    }

    let mut certs = vec![&cp.target];
    certs.extend(cp.intermediates.iter());
    if cps.get_enforce_trust_anchor_validity() {
        certs.push(&cp.trust_anchor);
    }

    for cert in certs {
        if let Err(e) = valid_at_time(&cert.decoded_cert.tbs_certificate, toi, false) {
            if let Error::PathValidation(pvs) = e {
                cpr.set_validation_status(pvs);
            }
            return Err(e);
        }
    }
    Ok(())
}

/// `check_names` affirms the issuer name of each certificate matches the subject name of the
/// certificate above it in the path, beginning with the trust anchor.
///
/// Subject alternative names are consumed by hostname verification and name constraint enforcement,
/// so the subjectAltName extension is marked as processed.
pub fn check_names(
    _cps: &CertificationPathSettings,
    cp: &CertificationPath,
    cpr: &mut CertificationPathResults,
) -> Result<()> {
    cpr.add_processed_extension(ID_CE_SUBJECT_ALT_NAME);

    let mut working_issuer_name = &cp.trust_anchor.decoded_cert.tbs_certificate.subject;
    for cert in cp.intermediates.iter().rev().chain(std::iter::once(&cp.target)) {
        if !compare_names(&cert.decoded_cert.tbs_certificate.issuer, working_issuer_name) {
            log_error_for_ca(cert, "name chaining violation");
            return fail(cpr, PathValidationStatus::NameChainingFailure);
        }
        working_issuer_name = &cert.decoded_cert.tbs_certificate.subject;
    }
    Ok(())
}

/// `check_basic_constraints` ensures all intermediate CA certificates feature a basicConstraints extension
/// with the cA field set to true and that the certificate path length does not violate length constraints.
///
/// It uses values from the [`PS_INITIAL_PATH_LENGTH_CONSTRAINT`] item in the [`CertificationPathSettings`]
/// and contributes ID_CE_BASIC_CONSTRAINTS to the processed extensions.
pub fn check_basic_constraints(
    cps: &CertificationPathSettings,
    cp: &CertificationPath,
    cpr: &mut CertificationPathResults,
) -> Result<()> {
    cpr.add_processed_extension(ID_CE_BASIC_CONSTRAINTS);
    let mut path_len_constraint = cps.get_initial_path_length_constraint();

    // begin with the certificate issued by the trust anchor
    for ca_cert in cp.intermediates.iter().rev() {
        // (l)  If the certificate was not self-issued, verify that
        //       max_path_length is greater than zero and decrement
        //       max_path_length by 1.
        if !is_self_issued(&ca_cert.decoded_cert) {
            if path_len_constraint == 0 {
                log_error_for_ca(ca_cert, "path length constraint violation");
                return fail(cpr, PathValidationStatus::InvalidPathLength);
            }
            path_len_constraint -= 1;
        }

        let bc = match ca_cert.get_extension(&ID_CE_BASIC_CONSTRAINTS)? {
            Some(PDVExtension::BasicConstraints(bc)) => bc,
            _ => {
                log_error_for_ca(ca_cert, "missing basic constraints");
                return fail(cpr, PathValidationStatus::MissingBasicConstraints);
            }
        };

        // (k)  verify that the basicConstraints extension is present and that cA is set to TRUE.
        if !bc.ca {
            log_error_for_ca(ca_cert, "invalid basic constraints");
            return fail(cpr, PathValidationStatus::InvalidBasicConstraints);
        }

        // (m)  If pathLenConstraint is present in the certificate and is
        //       less than max_path_length, set max_path_length to the value
        //       of pathLenConstraint.
        if let Some(pl) = bc.path_len_constraint {
            path_len_constraint = path_len_constraint.min(pl);
        }
    }

    Ok(())
}

/// `check_key_usage` ensures each intermediate CA certificate features a keyUsage extension that
/// asserts keyCertSign. It contributes ID_CE_KEY_USAGE to the processed extensions, so a critical
/// keyUsage extension in the target is accepted.
pub fn check_key_usage(
    _cps: &CertificationPathSettings,
    cp: &CertificationPath,
    cpr: &mut CertificationPathResults,
) -> Result<()> {
    cpr.add_processed_extension(ID_CE_KEY_USAGE);
    for ca_cert in cp.intermediates.iter() {
        if let Some(PDVExtension::KeyUsage(ku)) = ca_cert.get_extension(&ID_CE_KEY_USAGE)? {
            // (n)  If a key usage extension is present, verify that the
            //      keyCertSign bit is set.
            if !ku.0.contains(KeyUsages::KeyCertSign) {
                log_error_for_ca(ca_cert, "keyCertSign is not set in key usage extension");
                return fail(cpr, PathValidationStatus::InvalidKeyUsage);
            }
        } else {
            log_error_for_ca(ca_cert, "key usage extension is missing");
            return fail(cpr, PathValidationStatus::InvalidKeyUsage);
        }
    }
    Ok(())
}

/// `check_critical_extensions` affirms all critical extensions in the intermediate CA certificates
/// and the target certificate have been processed by inspecting the processed extensions recorded
/// in the [`CertificationPathResults`] object.
///
/// Each function supporting path validation contributes to the processed extensions, as do the
/// types deferred by the caller. This implementation assumes that if an extension is processed for
/// one certificate then it is processed for all.
pub fn check_critical_extensions(
    _cps: &CertificationPathSettings,
    cp: &CertificationPath,
    cpr: &mut CertificationPathResults,
) -> Result<()> {
    for cert in cp.intermediates.iter().chain(std::iter::once(&cp.target)) {
        let unhandled = cert.unhandled_critical_extensions(cpr.get_processed_extensions());
        if let Some(oid) = unhandled.first() {
            log_error_for_ca(
                cert,
                format!("unprocessed critical extension: {}", oid).as_str(),
            );
            return fail(cpr, PathValidationStatus::UnprocessedCriticalExtension);
        }
    }
    Ok(())
}

/// `verify_signatures` verifies the certificate signatures of certificates found in a certification path,
/// beginning with the certificate issued by the trust anchor.
pub fn verify_signatures(
    _cps: &CertificationPathSettings,
    cp: &CertificationPath,
    cpr: &mut CertificationPathResults,
) -> Result<()> {
    let mut working_spki = &cp.trust_anchor.decoded_cert.tbs_certificate.subject_public_key_info;

    for cur_cert in cp.intermediates.iter().rev().chain(std::iter::once(&cp.target)) {
        let defer_cert = match DeferDecodeSigned::from_der(&cur_cert.encoded_cert) {
            Ok(defer_cert) => defer_cert,
            Err(e) => {
                log_error_for_ca(
                    cur_cert,
                    format!("failed to decode certificate for signature verification: {}", e)
                        .as_str(),
                );
                return fail(cpr, PathValidationStatus::EncodingError);
            }
        };

        let r = verify_signature_message_rust_crypto(
            &defer_cert.tbs_field,
            defer_cert.signature.raw_bytes(),
            &defer_cert.signature_algorithm,
            working_spki,
        );
        if let Err(e) = r {
            log_error_for_ca(
                cur_cert,
                format!("signature verification error: {:?}", e).as_str(),
            );
            return fail(cpr, PathValidationStatus::SignatureVerificationFailure);
        }

        working_spki = &cur_cert.decoded_cert.tbs_certificate.subject_public_key_info;
    }
    Ok(())
}
