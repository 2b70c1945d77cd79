//! Distinguished names reconstructed from the raw RDNSequence carried in a directoryName
//!
//! ```text
//! Name ::= CHOICE { rdnSequence  RDNSequence }
//!
//! RDNSequence ::= SEQUENCE OF RelativeDistinguishedName
//!
//! RelativeDistinguishedName ::= SET SIZE (1..MAX) OF AttributeTypeAndValue
//!
//! AttributeTypeAndValue ::= SEQUENCE {
//!     type     AttributeType,
//!     value    AttributeValue }
//! ```
//!
//! The decoder here does not require the members of a SET to appear in DER sort order, which
//! allows constraints produced by lax encoders to be evaluated rather than rejected.

use core::fmt;

use der::asn1::ObjectIdentifier;
use der::{Decode, Encode, Header, Reader, SliceReader, Tag, TagNumber};
use x509_cert::name::Name;

use crate::util::error::{DecodeError, Error};
use crate::util::pdv_utilities::{attribute_value_to_string, get_value_from_rdn, oid_lookup};

/// Tag used for the directoryName alternative of GeneralName: `[4]` constructed.
pub const DIRECTORY_NAME_TAG: Tag = Tag::ContextSpecific {
    constructed: true,
    number: TagNumber::N4,
};

/// A single attribute type paired with its value rendered as a string.
///
/// String-typed values are decoded, anything else is `#` plus the upper case hex of its DER
/// encoding. Values are compared as code points with no case folding.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttributeTypeAndValue {
    /// Attribute type
    pub oid: ObjectIdentifier,
    /// Attribute value
    pub value: String,
}

/// An unordered set of attribute type and value pairs.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RelativeDistinguishedName(pub Vec<AttributeTypeAndValue>);

/// An ordered sequence of RDN sets, most significant (e.g., country) first.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DistinguishedName(pub Vec<RelativeDistinguishedName>);

impl RelativeDistinguishedName {
    /// `matches` returns true if both sets have the same number of pairs and every pair in this set
    /// has an exact counterpart in the other. Member order is not significant.
    pub fn matches(&self, other: &RelativeDistinguishedName) -> bool {
        if self.0.len() != other.0.len() {
            return false;
        }
        self.0.iter().all(|atav| other.0.contains(atav))
    }
}

impl DistinguishedName {
    /// Number of RDN sets in the name
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the name has no RDN sets
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `contains` returns true if this name is a prefix ancestor of `name`, i.e., it has no more RDN
    /// sets than `name` and each of its sets matches the set at the same position in `name`.
    ///
    /// A name contains itself and an empty name contains every name.
    pub fn contains(&self, name: &DistinguishedName) -> bool {
        if self.0.len() > name.0.len() {
            return false;
        }
        self.0
            .iter()
            .zip(name.0.iter())
            .all(|(ancestor, candidate)| ancestor.matches(candidate))
    }
}

impl TryFrom<&Name> for DistinguishedName {
    type Error = Error;

    fn try_from(name: &Name) -> Result<Self, Self::Error> {
        let mut rdns = vec![];
        for rdn in name.0.iter() {
            let mut atavs = vec![];
            for atav in rdn.0.iter() {
                atavs.push(AttributeTypeAndValue {
                    oid: atav.oid,
                    value: get_value_from_rdn(atav)?,
                });
            }
            rdns.push(RelativeDistinguishedName(atavs));
        }
        Ok(DistinguishedName(rdns))
    }
}

impl fmt::Display for DistinguishedName {
    /// Renders the name in RFC 4514 order, i.e., least significant RDN first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rdn) in self.0.iter().rev().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            for (j, atav) in rdn.0.iter().enumerate() {
                if j > 0 {
                    write!(f, "+")?;
                }
                match oid_lookup(&atav.oid) {
                    Ok(label) => write!(f, "{}={}", label, atav.value)?,
                    Err(_e) => write!(f, "{}={}", atav.oid, atav.value)?,
                }
            }
        }
        Ok(())
    }
}

fn decode_atav<'a, R: Reader<'a>>(reader: &mut R) -> der::Result<AttributeTypeAndValue> {
    let header = Header::decode(reader)?;
    header.tag.assert_eq(Tag::Sequence)?;
    reader.read_nested(header.length, |reader| {
        let oid = ObjectIdentifier::decode(reader)?;
        let value = attribute_value_to_string(reader.tlv_bytes()?)?;
        Ok(AttributeTypeAndValue { oid, value })
    })
}

fn decode_rdn<'a, R: Reader<'a>>(reader: &mut R) -> der::Result<RelativeDistinguishedName> {
    let header = Header::decode(reader)?;
    header.tag.assert_eq(Tag::Set)?;
    reader.read_nested(header.length, |reader| {
        let mut atavs = vec![];
        while !reader.is_finished() {
            atavs.push(decode_atav(reader)?);
        }
        Ok(RelativeDistinguishedName(atavs))
    })
}

/// `decode_rdn_sequence` decodes a DER-encoded RDNSequence (i.e., an untagged Name).
pub fn decode_rdn_sequence(enc: &[u8]) -> Result<DistinguishedName, DecodeError> {
    let mut reader = SliceReader::new(enc)?;
    let dn = read_rdn_sequence(&mut reader)?;
    Ok(reader.finish(dn)?)
}

fn read_rdn_sequence<'a, R: Reader<'a>>(reader: &mut R) -> der::Result<DistinguishedName> {
    let header = Header::decode(reader)?;
    header.tag.assert_eq(Tag::Sequence)?;
    reader.read_nested(header.length, |reader| {
        let mut rdns = vec![];
        while !reader.is_finished() {
            rdns.push(decode_rdn(reader)?);
        }
        Ok(DistinguishedName(rdns))
    })
}

/// `decode_directory_name` takes the complete encoding of a directoryName, i.e., including the
/// explicit `[4]` tag, removes the outer tag and length and decodes the RDNSequence within.
pub fn decode_directory_name(raw: &[u8]) -> Result<DistinguishedName, DecodeError> {
    let mut reader = SliceReader::new(raw)?;
    let header = Header::decode(&mut reader)?;
    header.tag.assert_eq(DIRECTORY_NAME_TAG)?;
    let dn = reader.read_nested(header.length, |reader| {
        let dn = read_rdn_sequence(reader)?;
        if !reader.is_finished() {
            return Err(der::Error::new(
                der::ErrorKind::TrailingData {
                    decoded: reader.position(),
                    remaining: reader.remaining_len(),
                },
                reader.position(),
            ));
        }
        Ok(dn)
    })?;
    Ok(reader.finish(dn)?)
}

/// `encode_directory_name` wraps the encoding of a Name in the explicit `[4]` tag used by
/// directoryName, yielding the form accepted by [`decode_directory_name`].
pub fn encode_directory_name(name: &Name) -> der::Result<Vec<u8>> {
    let inner = name.to_der()?;
    let header = Header::new(DIRECTORY_NAME_TAG, inner.len())?;
    let mut out = header.to_der()?;
    out.extend_from_slice(&inner);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;
    use hex_literal::hex;

    fn dn(s: &str) -> DistinguishedName {
        DistinguishedName::try_from(&Name::from_str(s).unwrap()).unwrap()
    }

    #[test]
    fn prefix_containment() {
        let subtree = dn("O=Allowed,C=US");
        let leaf = dn("CN=x,O=Allowed,C=US");
        assert!(subtree.contains(&leaf));
        assert!(subtree.contains(&subtree));
        assert!(!leaf.contains(&subtree));
        assert!(!dn("O=Other,C=US").contains(&leaf));
        assert!(DistinguishedName::default().contains(&leaf));

        // attribute values are compared without case folding
        assert!(!dn("O=allowed,C=US").contains(&leaf));
    }

    #[test]
    fn multi_valued_rdn_is_unordered() {
        let a = RelativeDistinguishedName(vec![
            AttributeTypeAndValue {
                oid: const_oid::db::rfc4519::ORGANIZATION_NAME,
                value: "Allowed".to_string(),
            },
            AttributeTypeAndValue {
                oid: const_oid::db::rfc4519::ORGANIZATIONAL_UNIT_NAME,
                value: "Unit".to_string(),
            },
        ]);
        let mut b = a.clone();
        b.0.reverse();
        assert!(a.matches(&b));

        let mut c = a.clone();
        c.0.pop();
        assert!(!a.matches(&c));
        assert!(!c.matches(&a));
    }

    #[test]
    fn decode_multi_valued_directory_name() {
        // [4] { C=US }, { O=Allowed + OU=Unit } using PrintableString values
        let raw = hex!("a42e302c310b3009060355040613025553311d300e060355040a1307416c6c6f776564300b060355040b1304556e6974");
        let name = decode_directory_name(&raw).unwrap();
        assert_eq!(2, name.len());
        assert_eq!(1, name.0[0].0.len());
        assert_eq!("US", name.0[0].0[0].value);
        assert_eq!(2, name.0[1].0.len());
        assert_eq!("O=Allowed+OU=Unit,C=US", name.to_string());

        // same name as seen in a certificate subject with UTF8String values
        let subject = dn("CN=leaf,O=Allowed+OU=Unit,C=US");
        assert!(name.contains(&subject));
    }

    #[test]
    fn decode_directory_name_errors() {
        // untagged Name
        assert!(decode_directory_name(&hex!("3000")).is_err());
        // RDNSequence containing an OCTET STRING instead of a SET
        assert!(decode_directory_name(&hex!("a405300304010000")).is_err());
        assert!(decode_directory_name(&hex!("a405300304")).is_err());
        // trailing data after the [4] element
        assert!(decode_directory_name(&hex!("a402300000")).is_err());
        // trailing data inside the [4] element
        assert!(decode_directory_name(&hex!("a40430003000")).is_err());
        // empty RDNSequence
        assert!(decode_directory_name(&hex!("a4023000")).unwrap().is_empty());
    }

    #[test]
    fn encode_then_decode_directory_name() {
        let name = Name::from_str("CN=host,O=Allowed,C=US").unwrap();
        let raw = encode_directory_name(&name).unwrap();
        assert_eq!(0xA4, raw[0]);
        let decoded = decode_directory_name(&raw).unwrap();
        assert_eq!(DistinguishedName::try_from(&name).unwrap(), decoded);
        assert_eq!(Ok(decoded.clone()), decode_rdn_sequence(&raw[2..]));
    }
}
