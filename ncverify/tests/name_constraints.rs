use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use der::{Decode, Encode};
use ncverify::*;
use x509_cert::serial_number::SerialNumber;
use x509_cert::Certificate;

const ROOT: &[u8] = include_bytes!("examples/root.der");
const ROOT_PEM: &[u8] = include_bytes!("examples/root.pem");

const CA_DIRNAME: &[u8] = include_bytes!("examples/ca_dirname.der");
const CA_DNS_EXCLUDED: &[u8] = include_bytes!("examples/ca_dns_excluded.der");
const CA_COMBINED: &[u8] = include_bytes!("examples/ca_combined.der");
const CA_UNKNOWN_CRITICAL: &[u8] = include_bytes!("examples/ca_unknown_critical.der");
const CA_MALFORMED_DIRNAME: &[u8] = include_bytes!("examples/ca_malformed_dirname.der");
const CA_UNCONSTRAINED_SUB: &[u8] = include_bytes!("examples/ca_unconstrained_sub.der");

fn verifier() -> CertVerifier {
    let mut ta_source = TaSource::new();
    ta_source.add_trust_anchor_der(ROOT).unwrap();
    CertVerifier::new(ta_source, CertificationPathSettings::new())
}

fn verify(certs: &[&[u8]], server_name: &str) -> Result<()> {
    verifier().verify_peer_certificate(certs, server_name)
}

#[test]
fn directory_name_allowed() {
    let leaf = include_bytes!("examples/leaf_allowed.der");
    assert_eq!(Ok(()), verify(&[leaf, CA_DIRNAME], "host.allowed.com"));
}

#[test]
fn directory_name_not_allowed() {
    let leaf = include_bytes!("examples/leaf_not_allowed.der");
    assert_eq!(
        Err(Error::Constraint(ConstraintError::SubjectNotPermitted)),
        verify(&[leaf, CA_DIRNAME], "host.allowed.com")
    );
}

#[test]
fn dns_name_excluded() {
    let leaf = include_bytes!("examples/leaf_blocked.der");
    assert_eq!(
        Err(Error::Constraint(ConstraintError::ExcludedDnsName)),
        verify(&[leaf, CA_DNS_EXCLUDED], "www.example.com")
    );
}

#[test]
fn combined_constraints() {
    let ok = include_bytes!("examples/leaf_domain_correct_ou_correct.der");
    assert_eq!(
        Ok(()),
        verify(&[ok, CA_COMBINED], "only-this-domain-is-allowed.com")
    );

    let wrong_domain = include_bytes!("examples/leaf_domain_incorrect_ou_correct.der");
    assert_eq!(
        Err(Error::Constraint(ConstraintError::DnsNameNotPermitted)),
        verify(
            &[wrong_domain, CA_COMBINED],
            "this-domain-is-not-allowed.com"
        )
    );

    let wrong_unit = include_bytes!("examples/leaf_domain_correct_ou_incorrect.der");
    assert_eq!(
        Err(Error::Constraint(ConstraintError::SubjectNotPermitted)),
        verify(&[wrong_unit, CA_COMBINED], "only-this-domain-is-allowed.com")
    );
}

#[test]
fn constraints_from_root_adjacent_issuer() {
    // only the CA issued by the root asserts constraints, the issuing CA does not
    let allowed = include_bytes!("examples/leaf_deep_allowed.der");
    assert_eq!(
        Ok(()),
        verify(
            &[allowed, CA_UNCONSTRAINED_SUB, CA_DIRNAME],
            "deep.example.com"
        )
    );

    let not_allowed = include_bytes!("examples/leaf_deep_not_allowed.der");
    assert_eq!(
        Err(Error::Constraint(ConstraintError::SubjectNotPermitted)),
        verify(
            &[not_allowed, CA_DIRNAME, CA_UNCONSTRAINED_SUB],
            "deep.example.com"
        )
    );
}

#[test]
fn no_constraints() {
    let leaf = include_bytes!("examples/leaf_plain.der");
    assert_eq!(Ok(()), verify(&[leaf], "plain.example.com"));
}

#[test]
fn other_critical_extensions_still_rejected() {
    let leaf = include_bytes!("examples/leaf_unknown_critical.der");
    assert_eq!(
        Err(Error::PathValidation(
            PathValidationStatus::UnprocessedCriticalExtension
        )),
        verify(&[leaf, CA_UNKNOWN_CRITICAL], "plain.example.com")
    );
}

#[test]
fn malformed_directory_name_is_dropped() {
    let leaf = include_bytes!("examples/leaf_lenient.der");
    let v = verifier();
    let pv = v.verify(&[leaf.as_slice(), CA_MALFORMED_DIRNAME], "lenient.example.com");
    assert_eq!(Ok(()), pv.result);
    assert_eq!(VerificationState::Accepted, pv.state);
    assert_eq!(1, pv.diagnostics.len());

    // the remaining dNSName subtree is enforced
    let other = include_bytes!("examples/leaf_lenient_other.der");
    assert_eq!(
        Err(Error::Constraint(ConstraintError::DnsNameNotPermitted)),
        verify(&[other, CA_MALFORMED_DIRNAME], "other.example.com")
    );
}

#[test]
fn chain_errors() {
    let leaf = include_bytes!("examples/leaf_deep_allowed.der");
    assert_eq!(
        Err(Error::PathValidation(PathValidationStatus::NoPathsFound)),
        verify(&[leaf, CA_UNCONSTRAINED_SUB], "deep.example.com")
    );

    let mut tampered = include_bytes!("examples/leaf_allowed.der").to_vec();
    let last = tampered.len() - 1;
    tampered[last] ^= 0x01;
    assert_eq!(
        Err(Error::PathValidation(
            PathValidationStatus::SignatureVerificationFailure
        )),
        verify(&[&tampered, CA_DIRNAME], "host.allowed.com")
    );

    let leaf = include_bytes!("examples/leaf_allowed.der");
    assert!(matches!(
        verify(&[leaf, &CA_DIRNAME[..20]], "host.allowed.com"),
        Err(Error::Asn1Error(_))
    ));
}

// CA_DIRNAME re-encoded with its issuer set to its own subject. The signature no longer verifies.
fn self_issued_copies(count: u8) -> Vec<Vec<u8>> {
    let ca = Certificate::from_der(CA_DIRNAME).unwrap();
    (0..count)
        .map(|i| {
            let mut copy = ca.clone();
            copy.tbs_certificate.issuer = copy.tbs_certificate.subject.clone();
            copy.tbs_certificate.serial_number = SerialNumber::new(&[0x20, i]).unwrap();
            copy.to_der().unwrap()
        })
        .collect()
}

#[test]
fn many_self_issued_intermediates() {
    let leaf = include_bytes!("examples/leaf_allowed.der");
    let copies = self_issued_copies(16);

    let mut presented: Vec<&[u8]> = vec![leaf.as_slice()];
    presented.extend(copies.iter().map(|c| c.as_slice()));
    // byte-identical duplicates
    presented.extend(copies.iter().map(|c| c.as_slice()));

    let start = Instant::now();
    assert_eq!(
        Err(Error::PathValidation(PathValidationStatus::NoPathsFound)),
        verify(&presented, "host.allowed.com")
    );
    assert!(start.elapsed() < Duration::from_secs(5));

    // the genuine issuer is still found among the copies
    presented.insert(1, CA_DIRNAME);
    assert_eq!(Ok(()), verify(&presented, "host.allowed.com"));
}

#[test]
fn expired_and_not_yet_valid() {
    let mut ta_source = TaSource::new();
    ta_source.add_trust_anchor_der(ROOT).unwrap();
    let mut cps = CertificationPathSettings::new();
    cps.set_time_of_interest(1_500_000_000);
    let v = CertVerifier::new(ta_source, cps);
    let leaf = include_bytes!("examples/leaf_allowed.der");
    assert_eq!(
        Err(Error::PathValidation(
            PathValidationStatus::InvalidNotBeforeDate
        )),
        v.verify_peer_certificate(&[leaf.as_slice(), CA_DIRNAME], "host.allowed.com")
    );
}

#[test]
fn hostname_and_empty_input() {
    let leaf = include_bytes!("examples/leaf_allowed.der");
    assert_eq!(
        Err(Error::HostnameMismatch),
        verify(&[leaf, CA_DIRNAME], "allowed.com")
    );

    let none: [&[u8]; 0] = [];
    assert_eq!(
        Err(Error::NoCertificates),
        verifier().verify_peer_certificate(&none, "host.allowed.com")
    );
}

#[test]
fn pem_trust_anchors() {
    let mut ta_source = TaSource::new();
    assert_eq!(1, ta_source.add_trust_anchors_pem(ROOT_PEM).unwrap());
    let v = CertVerifier::new(ta_source, CertificationPathSettings::new());
    let leaf = include_bytes!("examples/leaf_allowed.der");
    assert!(v
        .verify_peer_certificate(&[leaf.as_slice(), CA_DIRNAME], "host.allowed.com")
        .is_ok());
}

#[test]
fn shared_across_threads() {
    let v = Arc::new(verifier());
    let mut handles = vec![];
    for _ in 0..4 {
        let v = Arc::clone(&v);
        handles.push(thread::spawn(move || {
            let allowed: &[u8] = include_bytes!("examples/leaf_allowed.der");
            let not_allowed: &[u8] = include_bytes!("examples/leaf_not_allowed.der");
            assert!(v
                .verify_peer_certificate(&[allowed, CA_DIRNAME], "host.allowed.com")
                .is_ok());
            assert!(v
                .verify_peer_certificate(&[not_allowed, CA_DIRNAME], "host.allowed.com")
                .is_err());
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
}
