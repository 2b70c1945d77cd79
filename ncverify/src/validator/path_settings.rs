//! Structures and functions related to configuring certification path processing operations

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use der::asn1::ObjectIdentifier;
use serde::{Deserialize, Serialize};

use crate::util::error::{Error, Result};
use crate::validator::pdv_certificate::PDVCertificate;

//-----------------------------------------------------------------------------------------------
// Type definitions used in the definition of path settings
//-----------------------------------------------------------------------------------------------
/// `ObjectIdentifierSet` is a typedef for a set of ObjectIdentifier values.
pub type ObjectIdentifierSet = BTreeSet<ObjectIdentifier>;

/// `CertificateChain` is a typedef for a vector of `PDVCertificate`.
pub type CertificateChain = Vec<PDVCertificate>;

/// `CertificationPathSettings` maps setting names to values of varying types. Settings that are
/// absent take the default documented alongside each `PS_*` name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationPathSettings(pub BTreeMap<String, CertificationPathProcessingTypes>);

impl CertificationPathSettings {
    /// Creates a new empty [`CertificationPathSettings`]
    pub fn new() -> Self {
        Self::default()
    }
}

/// `CertificationPathProcessingTypes` is used to define a variant map with types associated with
/// performing certification path validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificationPathProcessingTypes {
    /// Represents bool values
    Bool(bool),
    /// Represents u8 values
    U8(u8),
    /// Represents u64 values
    U64(u64),
}

//-----------------------------------------------------------------------------------------------
// Types of path settings
//-----------------------------------------------------------------------------------------------
/// `PS_TIME_OF_INTEREST` is used to retrieve a u64 value from a [`CertificationPathSettings`]
/// object. The value is expressed as seconds since the Unix epoch and is compared against the
/// validity period of each certificate. By default, the current time is used. Zero disables validity
/// checks.
pub static PS_TIME_OF_INTEREST: &str = "psTimeOfInterest";

/// `PS_ENFORCE_TRUST_ANCHOR_VALIDITY` is used to retrieve a boolean value from a [`CertificationPathSettings`]
/// object. By default, this setting is set to true (per industry convention, RFC5280 does not
/// require checking trust anchor (TA) validity. Turn this value off to refrain from checking TA validity.
pub static PS_ENFORCE_TRUST_ANCHOR_VALIDITY: &str = "psEnforceTrustAnchorValidity";

/// `PS_INITIAL_PATH_LENGTH_CONSTRAINT` is used to retrieve a u8 value from a [`CertificationPathSettings`]
/// object. This value is used in concert with BasicConstraints extensions during certification
/// path validation by establishing the maximum path length that will be accepted. By default, the
/// value is set to 15, as defined by `PS_MAX_PATH_LENGTH_CONSTRAINT`.
pub static PS_INITIAL_PATH_LENGTH_CONSTRAINT: &str = "psInitialPathLengthConstraint";

/// `PS_MAX_PATH_LENGTH_CONSTRAINT` sets the maximum length path accepted by validation implementation
pub static PS_MAX_PATH_LENGTH_CONSTRAINT: u8 = 15;

macro_rules! cps_gets_and_sets_with_default {
    ($getter:ident, $setter:ident, $flag:ident, $variant:ident, $t:ty, $default:expr) => {
        impl CertificationPathSettings {
            #[doc = concat!("`", stringify!($getter), "` is used to retrieve `", stringify!($flag), "` items from a [`CertificationPathSettings`] instance")]
            pub fn $getter(&self) -> $t {
                if let Some(CertificationPathProcessingTypes::$variant(v)) = self.0.get($flag) {
                    return v.clone();
                }
                $default
            }
            #[doc = concat!("`", stringify!($setter), "` is used to set `", stringify!($flag), "` items in a [`CertificationPathSettings`] instance")]
            pub fn $setter(&mut self, v: $t) {
                self.0.insert(
                    $flag.to_string(),
                    CertificationPathProcessingTypes::$variant(v),
                );
            }
        }
    };
}

fn now_as_unix_secs() -> u64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(n) => n.as_secs(),
        Err(_) => 0,
    }
}

cps_gets_and_sets_with_default!(
    get_time_of_interest,
    set_time_of_interest,
    PS_TIME_OF_INTEREST,
    U64,
    u64,
    now_as_unix_secs()
);
cps_gets_and_sets_with_default!(
    get_enforce_trust_anchor_validity,
    set_enforce_trust_anchor_validity,
    PS_ENFORCE_TRUST_ANCHOR_VALIDITY,
    Bool,
    bool,
    true
);
cps_gets_and_sets_with_default!(
    get_initial_path_length_constraint,
    set_initial_path_length_constraint,
    PS_INITIAL_PATH_LENGTH_CONSTRAINT,
    U8,
    u8,
    PS_MAX_PATH_LENGTH_CONSTRAINT
);

/// `read_settings` accepts the name of a file that notionally contains JSON data that represents
/// CertificationPathSettings.
///
/// When no file name is given, or the file does not exist, default settings are returned. A file
/// that cannot be read yields [`Error::StdIoError`] and content that cannot be parsed yields
/// [`Error::ParseError`].
pub fn read_settings(fname: &Option<String>) -> Result<CertificationPathSettings> {
    if let Some(fname) = fname {
        let p = Path::new(fname.as_str());
        if p.exists() {
            let json = std::fs::read(p).map_err(|e| Error::StdIoError(e.kind()))?;
            return parse_settings(&json);
        }
    }
    Ok(CertificationPathSettings::new())
}

/// `parse_settings` deserializes CertificationPathSettings from a JSON buffer.
pub fn parse_settings(json: &[u8]) -> Result<CertificationPathSettings> {
    serde_json::from_slice(json).map_err(|_e| Error::ParseError)
}

#[test]
fn test_default_gets_cps() {
    let cps = CertificationPathSettings::default();
    let before = now_as_unix_secs();
    assert!(cps.get_time_of_interest() >= before);
    assert!(cps.get_enforce_trust_anchor_validity());
    assert_eq!(15, cps.get_initial_path_length_constraint());
}

#[test]
fn test_gets_and_sets_cps() {
    let mut cps = CertificationPathSettings::new();
    cps.set_time_of_interest(0);
    cps.set_enforce_trust_anchor_validity(false);
    cps.set_initial_path_length_constraint(2);
    assert_eq!(0, cps.get_time_of_interest());
    assert!(!cps.get_enforce_trust_anchor_validity());
    assert_eq!(2, cps.get_initial_path_length_constraint());

    // a value of the wrong type falls back to the default
    cps.0.insert(
        PS_INITIAL_PATH_LENGTH_CONSTRAINT.to_string(),
        CertificationPathProcessingTypes::Bool(true),
    );
    assert_eq!(15, cps.get_initial_path_length_constraint());
}

#[test]
fn test_settings_json() {
    let mut cps = CertificationPathSettings::new();
    cps.set_time_of_interest(1700000000);
    cps.set_initial_path_length_constraint(3);
    let json = serde_json::to_vec(&cps).unwrap();
    assert_eq!(cps, parse_settings(&json).unwrap());

    let parsed = parse_settings(br#"{"psEnforceTrustAnchorValidity":{"Bool":false}}"#).unwrap();
    assert!(!parsed.get_enforce_trust_anchor_validity());
    assert_eq!(Err(Error::ParseError), parse_settings(b"not json"));

    assert_eq!(
        CertificationPathSettings::new(),
        read_settings(&Some("does/not/exist.json".to_string())).unwrap()
    );
    assert_eq!(CertificationPathSettings::new(), read_settings(&None).unwrap());
}
