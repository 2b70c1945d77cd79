//! Error types

use core::fmt;

/// Result type
pub type Result<T> = core::result::Result<T, Error>;

/// `PathValidationStatus` enumerates reasons a certification path was rejected by a chain validator.
/// These values are surfaced verbatim to callers via [`Error::PathValidation`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum PathValidationStatus {
    /// No errors were encountered while validating certification path
    Valid,
    /// NameChainingFailure occurs when a CertificationPath features certificates for which the subject
    /// name of a superior certificate does not match the issuer name of the immediately subordinate certificate.
    NameChainingFailure,
    /// SignatureVerificationFailure occurs when a CertificationPath features certificates for which the subject
    /// public key of a superior certificate does not verify the signature of the immediately subordinate certificate.
    SignatureVerificationFailure,
    /// InvalidNotBeforeDate occurs when a CertificationPath features a certificate that contains a notBefore
    /// date that is after the time of interest used for a certification path validation operation.
    InvalidNotBeforeDate,
    /// InvalidNotAfterDate occurs when a CertificationPath features a certificate that contains a notAfter
    /// date that is before the time of interest used for a certification path validation operation.
    InvalidNotAfterDate,
    /// MissingBasicConstraints occurs when a CertificationPath features an intermediate CA certificate that
    /// does not contain a basicConstraints extension.
    MissingBasicConstraints,
    /// InvalidBasicConstraints occurs when a CertificationPath features an intermediate CA certificate that
    /// contains a basicConstraints extension with the cA field set to false.
    InvalidBasicConstraints,
    /// InvalidPathLength occurs when a CertificationPath has more certificates than allowed by either an
    /// initial path length configuration or a constraint asserted in an intermediate CA certificate.
    InvalidPathLength,
    /// InvalidKeyUsage occurs when an intermediate CA certificate has a keyUsage extension that lacks keyCertSign.
    InvalidKeyUsage,
    /// UnprocessedCriticalExtension occurs when a certificate features a critical extension that was not
    /// processed during certification path validation and was not deferred to the caller.
    UnprocessedCriticalExtension,
    /// EncodingError occurs when an object cannot be parsed.
    EncodingError,
    /// NoPathsFound occurs when no candidate path from the target to a trust anchor could be built.
    NoPathsFound,
}

/// `DecodeError` is returned when a `NameConstraints` extension or a `directoryName` cannot be decoded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DecodeError {
    /// The DER encoding is structurally invalid, uses an unexpected tag or carries trailing data.
    Malformed(der::Error),
}

/// `ConstraintError` identifies the name constraint that a leaf certificate violated.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConstraintError {
    /// The subject falls within an excluded directoryName subtree.
    ExcludedSubject,
    /// Permitted directoryName subtrees are present and the subject falls within none of them.
    SubjectNotPermitted,
    /// A DNS name from the subjectAltName extension matches an excluded dNSName subtree.
    ExcludedDnsName,
    /// Permitted dNSName subtrees are present and a DNS name from the subjectAltName matches none of them.
    DnsNameNotPermitted,
}

/// Error type
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Chain validation failed. The status is propagated unchanged from the chain validator.
    PathValidation(PathValidationStatus),
    /// A NameConstraints extension could not be decoded
    Decode(DecodeError),
    /// The leaf certificate violates a name constraint asserted by an issuer
    Constraint(ConstraintError),
    /// The leaf certificate does not contain the expected server name
    HostnameMismatch,
    /// No certificates were presented by the peer
    NoCertificates,
    /// NotFound occurs when an action failed because a necessary artifact was not found.
    NotFound,
    /// Unrecognized occurs when an error conditions does not match anything else here.
    Unrecognized,
    /// An artifact could not be parsed
    ParseError,
    /// Asn1Error is used to propagate error information from the der crate.
    Asn1Error(der::Error),
    /// Error encapsulates an error derived from [std::io::ErrorKind]
    StdIoError(std::io::ErrorKind),
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        Error::Asn1Error(err)
    }
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Error {
        Error::Decode(err)
    }
}

impl From<ConstraintError> for Error {
    fn from(err: ConstraintError) -> Error {
        Error::Constraint(err)
    }
}

impl From<der::Error> for DecodeError {
    fn from(err: der::Error) -> DecodeError {
        DecodeError::Malformed(err)
    }
}

impl fmt::Display for PathValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathValidationStatus::Valid => write!(f, "Valid"),
            PathValidationStatus::NameChainingFailure => write!(f, "Name chaining failure"),
            PathValidationStatus::SignatureVerificationFailure => {
                write!(f, "Signature verification failure")
            }
            PathValidationStatus::InvalidNotBeforeDate => write!(f, "InvalidNotBeforeDate"),
            PathValidationStatus::InvalidNotAfterDate => write!(f, "InvalidNotAfterDate"),
            PathValidationStatus::MissingBasicConstraints => write!(f, "MissingBasicConstraints"),
            PathValidationStatus::InvalidBasicConstraints => write!(f, "InvalidBasicConstraints"),
            PathValidationStatus::InvalidPathLength => write!(f, "InvalidPathLength"),
            PathValidationStatus::InvalidKeyUsage => write!(f, "InvalidKeyUsage"),
            PathValidationStatus::UnprocessedCriticalExtension => {
                write!(f, "UnprocessedCriticalExtension")
            }
            PathValidationStatus::EncodingError => write!(f, "EncodingError"),
            PathValidationStatus::NoPathsFound => write!(f, "NoPathsFound"),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Malformed(err) => write!(f, "Malformed: {}", err),
        }
    }
}

impl fmt::Display for ConstraintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintError::ExcludedSubject => write!(f, "ExcludedSubject"),
            ConstraintError::SubjectNotPermitted => write!(f, "SubjectNotPermitted"),
            ConstraintError::ExcludedDnsName => write!(f, "ExcludedDnsName"),
            ConstraintError::DnsNameNotPermitted => write!(f, "DnsNameNotPermitted"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::PathValidation(err) => write!(f, "PathValidationError: {}", err),
            Error::Decode(err) => write!(f, "DecodeError: {}", err),
            Error::Constraint(err) => write!(f, "NameConstraintsViolation: {}", err),
            Error::HostnameMismatch => write!(f, "HostnameMismatch"),
            Error::NoCertificates => write!(f, "NoCertificates"),
            Error::NotFound => write!(f, "NotFound"),
            Error::Unrecognized => write!(f, "Unrecognized"),
            Error::ParseError => write!(f, "ParseError"),
            Error::Asn1Error(err) => write!(f, "Asn1Error: {}", err),
            Error::StdIoError(err) => write!(f, "StdError: {:?}", err),
        }
    }
}

impl std::error::Error for Error {}

#[test]
fn error_test() {
    assert_eq!(
        "PathValidationError: NoPathsFound",
        format!("{}", Error::PathValidation(PathValidationStatus::NoPathsFound))
    );
    assert_eq!(
        "NameConstraintsViolation: SubjectNotPermitted",
        format!("{}", Error::from(ConstraintError::SubjectNotPermitted))
    );
    assert_eq!("HostnameMismatch", format!("{}", Error::HostnameMismatch));

    let der_err = der::Error::from(der::ErrorKind::Failed);
    assert_eq!(
        Error::Decode(DecodeError::Malformed(der_err)),
        Error::from(DecodeError::from(der_err))
    );
    let _s = format!("{}", PathValidationStatus::UnprocessedCriticalExtension);
    let _s = format!("{}", Error::StdIoError(std::io::ErrorKind::NotFound));
}
