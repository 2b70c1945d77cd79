//! Structures and functions related to results from certification path processing operations

use der::asn1::ObjectIdentifier;

use crate::util::error::PathValidationStatus;
use crate::validator::path_settings::ObjectIdentifierSet;

/// `CertificationPathResults` collects information produced while validating a single
/// [`CertificationPath`](crate::CertificationPath).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CertificationPathResults {
    /// Extensions that have been processed, either by a check or because the caller deferred them.
    /// Consulted when looking for unprocessed critical extensions.
    processed_extensions: ObjectIdentifierSet,
    /// Outcome of validation, set by the check that failed or upon success
    validation_status: Option<PathValidationStatus>,
}

impl CertificationPathResults {
    /// Creates a new [`CertificationPathResults`]
    pub fn new() -> Self {
        Self::default()
    }

    /// `add_processed_extension` records an extension type as processed.
    pub fn add_processed_extension(&mut self, oid: ObjectIdentifier) {
        self.processed_extensions.insert(oid);
    }

    /// `get_processed_extensions` returns the set of extension types recorded as processed.
    pub fn get_processed_extensions(&self) -> &ObjectIdentifierSet {
        &self.processed_extensions
    }

    /// `set_validation_status` records the outcome of validation.
    pub fn set_validation_status(&mut self, status: PathValidationStatus) {
        self.validation_status = Some(status);
    }

    /// `get_validation_status` returns the recorded outcome, if any.
    pub fn get_validation_status(&self) -> Option<PathValidationStatus> {
        self.validation_status
    }
}

#[test]
fn results_test() {
    use const_oid::db::rfc5912::ID_CE_KEY_USAGE;

    let mut cpr = CertificationPathResults::new();
    assert!(cpr.get_validation_status().is_none());
    cpr.add_processed_extension(ID_CE_KEY_USAGE);
    cpr.add_processed_extension(ID_CE_KEY_USAGE);
    assert_eq!(1, cpr.get_processed_extensions().len());
    cpr.set_validation_status(PathValidationStatus::InvalidKeyUsage);
    assert_eq!(
        Some(PathValidationStatus::InvalidKeyUsage),
        cpr.get_validation_status()
    );
}
