//! Server name verification

use crate::util::error::{Error, Result};
use crate::util::pdv_utilities::log_error_for_ca;
use crate::validator::pdv_certificate::PDVCertificate;

/// `verify_hostname` returns Ok if `server_name` exactly equals one of the DNS names in the
/// subjectAltName extension of `leaf` and [`Error::HostnameMismatch`] otherwise. Wildcards and case
/// folding are not supported.
pub fn verify_hostname(leaf: &PDVCertificate, server_name: &str) -> Result<()> {
    if leaf.dns_names().iter().any(|dns| dns == server_name) {
        return Ok(());
    }
    log_error_for_ca(
        leaf,
        format!("no DNS name matches server name {}", server_name).as_str(),
    );
    Err(Error::HostnameMismatch)
}

#[test]
fn verify_hostname_test() {
    use crate::validator::pdv_certificate::parse_cert;

    let leaf = parse_cert(include_bytes!("../../tests/examples/leaf_blocked.der")).unwrap();
    assert!(verify_hostname(&leaf, "www.example.com").is_ok());
    assert!(verify_hostname(&leaf, "blocked.example.com").is_ok());
    assert_eq!(
        Err(Error::HostnameMismatch),
        verify_hostname(&leaf, "WWW.example.com")
    );
    assert_eq!(Err(Error::HostnameMismatch), verify_hostname(&leaf, "blocked"));

    // subject common name is not consulted
    let ca = parse_cert(include_bytes!("../../tests/examples/ca_dirname.der")).unwrap();
    assert_eq!(
        Err(Error::HostnameMismatch),
        verify_hostname(&ca, "DirName Constrained CA")
    );
}
