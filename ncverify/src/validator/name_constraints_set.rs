//! Structures and functions related to enforcing name constraints asserted by issuers of a
//! leaf certificate

use const_oid::db::rfc5912::ID_CE_NAME_CONSTRAINTS;
use log::{debug, warn};

use crate::asn1::distinguished_name::{decode_directory_name, DistinguishedName};
use crate::asn1::name_constraints::*;
use crate::util::error::*;
use crate::util::pdv_utilities::log_error_for_ca;
use crate::validator::pdv_certificate::PDVCertificate;

/// The `NameConstraintsSet` structure partitions the subtrees of a [`NameConstraints`] value into the
/// name forms that are enforced. Subtrees of any other form are dropped.
///
/// A directoryName subtree that cannot be decoded is skipped and logged at warn level, the same
/// treatment [`decode_name_constraints`] gives it.
///
/// An empty permitted list places no restriction on the corresponding name form. Directory names
/// are matched using the prefix rule implemented by [`DistinguishedName::contains`]. DNS names are
/// matched by exact, case-sensitive string comparison.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NameConstraintsSet {
    /// permitted directoryName subtrees
    pub permitted_directory_names: Vec<DistinguishedName>,
    /// excluded directoryName subtrees
    pub excluded_directory_names: Vec<DistinguishedName>,
    /// permitted dNSName subtrees
    pub permitted_dns_names: Vec<String>,
    /// excluded dNSName subtrees
    pub excluded_dns_names: Vec<String>,
}

impl From<&NameConstraints> for NameConstraintsSet {
    fn from(nc: &NameConstraints) -> Self {
        let mut ncs = NameConstraintsSet::default();
        ncs.add_subtrees(&nc.permitted, false);
        ncs.add_subtrees(&nc.excluded, true);
        ncs
    }
}

impl NameConstraintsSet {
    fn add_subtrees(&mut self, subtrees: &[Subtree], excluded: bool) {
        for (index, subtree) in subtrees.iter().enumerate() {
            match &subtree.base {
                GeneralNameForm::DirectoryName(raw) => {
                    let dn = match decode_directory_name(raw) {
                        Ok(dn) => dn,
                        Err(e) => {
                            warn!(
                                "skipping {} directoryName subtree {}: {}",
                                if excluded { "excluded" } else { "permitted" },
                                index,
                                e
                            );
                            continue;
                        }
                    };
                    if excluded {
                        self.excluded_directory_names.push(dn);
                    } else {
                        self.permitted_directory_names.push(dn);
                    }
                }
                GeneralNameForm::DnsName(dns) => {
                    let dns = String::from_utf8_lossy(dns).into_owned();
                    if excluded {
                        self.excluded_dns_names.push(dns);
                    } else {
                        self.permitted_dns_names.push(dns);
                    }
                }
                GeneralNameForm::Other(tag, _) => {
                    debug!("ignoring name constraint with unsupported form: {}", tag);
                }
            }
        }
    }

    /// `subject_within_excluded_subtrees` returns true if any excluded directoryName is a prefix
    /// ancestor of `subject`.
    pub fn subject_within_excluded_subtrees(&self, subject: &DistinguishedName) -> bool {
        self.excluded_directory_names
            .iter()
            .any(|dn| dn.contains(subject))
    }

    /// `subject_within_permitted_subtrees` returns true if no permitted directoryName subtrees are
    /// present or if at least one is a prefix ancestor of `subject`.
    pub fn subject_within_permitted_subtrees(&self, subject: &DistinguishedName) -> bool {
        self.permitted_directory_names.is_empty()
            || self
                .permitted_directory_names
                .iter()
                .any(|dn| dn.contains(subject))
    }

    /// `san_within_excluded_subtrees` returns true if any DNS name equals an excluded dNSName.
    pub fn san_within_excluded_subtrees(&self, dns_names: &[String]) -> bool {
        dns_names
            .iter()
            .any(|name| self.excluded_dns_names.contains(name))
    }

    /// `san_within_permitted_subtrees` returns true if no permitted dNSName subtrees are present or if
    /// every DNS name equals some permitted dNSName.
    pub fn san_within_permitted_subtrees(&self, dns_names: &[String]) -> bool {
        self.permitted_dns_names.is_empty()
            || dns_names
                .iter()
                .all(|name| self.permitted_dns_names.contains(name))
    }
}

/// `enforce` evaluates the subject and the DNS subject alternative names of `leaf` against the
/// constraints asserted by a single issuer. Checks are made in this order, the first failure is
/// returned:
///
/// 1. excluded directoryName subtrees, yielding [`ConstraintError::ExcludedSubject`]
/// 2. permitted directoryName subtrees, yielding [`ConstraintError::SubjectNotPermitted`]
/// 3. excluded dNSName subtrees, yielding [`ConstraintError::ExcludedDnsName`]
/// 4. permitted dNSName subtrees, yielding [`ConstraintError::DnsNameNotPermitted`]
pub fn enforce(issuer_constraints: &NameConstraints, leaf: &PDVCertificate) -> Result<()> {
    let ncs = NameConstraintsSet::from(issuer_constraints);
    let subject = leaf.subject_name()?;
    let dns_names = leaf.dns_names();

    if ncs.subject_within_excluded_subtrees(&subject) {
        log_error_for_ca(leaf, "subject is within an excluded directoryName subtree");
        return Err(Error::Constraint(ConstraintError::ExcludedSubject));
    }
    if !ncs.subject_within_permitted_subtrees(&subject) {
        log_error_for_ca(leaf, "subject is not within any permitted directoryName subtree");
        return Err(Error::Constraint(ConstraintError::SubjectNotPermitted));
    }
    if ncs.san_within_excluded_subtrees(&dns_names) {
        log_error_for_ca(leaf, "DNS name is within an excluded dNSName subtree");
        return Err(Error::Constraint(ConstraintError::ExcludedDnsName));
    }
    if !ncs.san_within_permitted_subtrees(&dns_names) {
        log_error_for_ca(leaf, "DNS name is not within any permitted dNSName subtree");
        return Err(Error::Constraint(ConstraintError::DnsNameNotPermitted));
    }
    Ok(())
}

/// `enforce_issuer_constraints` decodes the first NameConstraints extension in `issuer`, if any, and
/// enforces it against `leaf`. An issuer without the extension imposes no restriction.
///
/// Subtrees dropped while decoding are returned so the caller can report them. A NameConstraints
/// extension that cannot be decoded at all yields [`Error::Decode`].
pub fn enforce_issuer_constraints(
    issuer: &PDVCertificate,
    leaf: &PDVCertificate,
) -> Result<Vec<DecodeDiagnostic>> {
    let ext = match issuer.extension(&ID_CE_NAME_CONSTRAINTS) {
        Some(ext) => ext,
        None => return Ok(vec![]),
    };

    let decoded = match decode_name_constraints(ext.extn_value.as_bytes()) {
        Ok(decoded) => decoded,
        Err(e) => {
            log_error_for_ca(
                issuer,
                format!("failed to decode name constraints: {}", e).as_str(),
            );
            return Err(Error::Decode(e));
        }
    };
    enforce(&decoded.constraints, leaf)?;
    Ok(decoded.diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::distinguished_name::encode_directory_name;
    use crate::validator::pdv_certificate::parse_cert;
    use core::str::FromStr;
    use x509_cert::name::Name;

    fn leaf_allowed() -> PDVCertificate {
        parse_cert(include_bytes!("../../tests/examples/leaf_allowed.der")).unwrap()
    }

    fn dir_name(name: &Name) -> Subtree {
        Subtree {
            base: GeneralNameForm::DirectoryName(encode_directory_name(name).unwrap()),
            minimum: None,
            maximum: None,
        }
    }

    fn dns_name(name: &str) -> Subtree {
        Subtree {
            base: GeneralNameForm::DnsName(name.as_bytes().to_vec()),
            minimum: None,
            maximum: None,
        }
    }

    #[test]
    fn no_constraints_accepts() {
        assert!(enforce(&NameConstraints::default(), &leaf_allowed()).is_ok());
    }

    #[test]
    fn directory_name_constraints() {
        let leaf = leaf_allowed();

        let nc = NameConstraints {
            permitted: vec![dir_name(&Name::from_str("O=Allowed").unwrap())],
            excluded: vec![],
        };
        assert!(enforce(&nc, &leaf).is_ok());

        // a name contains itself
        let nc = NameConstraints {
            permitted: vec![],
            excluded: vec![dir_name(&leaf.decoded_cert.tbs_certificate.subject)],
        };
        assert_eq!(
            Err(Error::Constraint(ConstraintError::ExcludedSubject)),
            enforce(&nc, &leaf)
        );

        // one matching entry among several is enough
        let nc = NameConstraints {
            permitted: vec![
                dir_name(&Name::from_str("O=NotAllowed").unwrap()),
                dir_name(&Name::from_str("O=Allowed").unwrap()),
            ],
            excluded: vec![],
        };
        assert!(enforce(&nc, &leaf).is_ok());

        let nc = NameConstraints {
            permitted: vec![dir_name(&Name::from_str("O=NotAllowed").unwrap())],
            excluded: vec![],
        };
        assert_eq!(
            Err(Error::Constraint(ConstraintError::SubjectNotPermitted)),
            enforce(&nc, &leaf)
        );

        // exclusion is evaluated before permission
        let nc = NameConstraints {
            permitted: vec![dir_name(&Name::from_str("O=NotAllowed").unwrap())],
            excluded: vec![dir_name(&Name::from_str("O=Allowed").unwrap())],
        };
        assert_eq!(
            Err(Error::Constraint(ConstraintError::ExcludedSubject)),
            enforce(&nc, &leaf)
        );
    }

    #[test]
    fn dns_name_constraints() {
        let leaf = leaf_allowed();
        assert_eq!(vec!["host.allowed.com".to_string()], leaf.dns_names());

        let nc = NameConstraints {
            permitted: vec![],
            excluded: vec![dns_name("host.allowed.com")],
        };
        assert_eq!(
            Err(Error::Constraint(ConstraintError::ExcludedDnsName)),
            enforce(&nc, &leaf)
        );

        // comparison is case-sensitive
        let nc = NameConstraints {
            permitted: vec![],
            excluded: vec![dns_name("HOST.allowed.com")],
        };
        assert!(enforce(&nc, &leaf).is_ok());

        let nc = NameConstraints {
            permitted: vec![dns_name("other.allowed.com")],
            excluded: vec![],
        };
        assert_eq!(
            Err(Error::Constraint(ConstraintError::DnsNameNotPermitted)),
            enforce(&nc, &leaf)
        );

        let nc = NameConstraints {
            permitted: vec![dns_name("other.allowed.com"), dns_name("host.allowed.com")],
            excluded: vec![],
        };
        assert!(enforce(&nc, &leaf).is_ok());
    }

    #[test]
    fn other_forms_are_ignored() {
        let nc = NameConstraints {
            permitted: vec![],
            excluded: vec![Subtree {
                base: GeneralNameForm::Other(
                    der::Tag::ContextSpecific {
                        constructed: false,
                        number: der::TagNumber::N7,
                    },
                    vec![10, 0, 0, 1],
                ),
                minimum: None,
                maximum: None,
            }],
        };
        let ncs = NameConstraintsSet::from(&nc);
        assert_eq!(NameConstraintsSet::default(), ncs);
        assert!(enforce(&nc, &leaf_allowed()).is_ok());
    }

    #[test]
    fn undecodable_directory_name_is_skipped() {
        // [4] wrapping a SEQUENCE that holds an OCTET STRING instead of an RDN
        let malformed = Subtree {
            base: GeneralNameForm::DirectoryName(vec![0xa4, 0x05, 0x30, 0x03, 0x04, 0x01, 0x00]),
            minimum: None,
            maximum: None,
        };
        let nc = NameConstraints {
            permitted: vec![malformed.clone(), dns_name("host.allowed.com")],
            excluded: vec![malformed],
        };
        let ncs = NameConstraintsSet::from(&nc);
        assert!(ncs.permitted_directory_names.is_empty());
        assert!(ncs.excluded_directory_names.is_empty());
        assert_eq!(vec!["host.allowed.com".to_string()], ncs.permitted_dns_names);
        assert!(enforce(&nc, &leaf_allowed()).is_ok());

        let nc = NameConstraints {
            permitted: vec![
                Subtree {
                    base: GeneralNameForm::DirectoryName(vec![0xa4, 0x00]),
                    minimum: None,
                    maximum: None,
                },
                dns_name("other.allowed.com"),
            ],
            excluded: vec![],
        };
        assert_eq!(
            Err(Error::Constraint(ConstraintError::DnsNameNotPermitted)),
            enforce(&nc, &leaf_allowed())
        );
    }

    #[test]
    fn issuer_constraints_from_certificates() {
        let ca = parse_cert(include_bytes!("../../tests/examples/ca_dirname.der")).unwrap();
        let not_allowed =
            parse_cert(include_bytes!("../../tests/examples/leaf_not_allowed.der")).unwrap();
        assert!(enforce_issuer_constraints(&ca, &leaf_allowed())
            .unwrap()
            .is_empty());
        assert_eq!(
            Err(Error::Constraint(ConstraintError::SubjectNotPermitted)),
            enforce_issuer_constraints(&ca, &not_allowed)
        );

        // issuer without the extension
        let root = parse_cert(include_bytes!("../../tests/examples/root.der")).unwrap();
        assert!(enforce_issuer_constraints(&root, &not_allowed)
            .unwrap()
            .is_empty());

        // malformed directoryName is dropped, the dNSName subtree still applies
        let lenient =
            parse_cert(include_bytes!("../../tests/examples/ca_malformed_dirname.der")).unwrap();
        let leaf = parse_cert(include_bytes!("../../tests/examples/leaf_lenient.der")).unwrap();
        let diagnostics = enforce_issuer_constraints(&lenient, &leaf).unwrap();
        assert_eq!(1, diagnostics.len());
        assert!(!diagnostics[0].excluded);
        assert_eq!(0, diagnostics[0].index);
    }
}
