//! Decoder and encoder for the NameConstraints certificate extension
//!
//! ```text
//! id-ce-nameConstraints OBJECT IDENTIFIER ::=  { id-ce 30 }
//!
//! NameConstraints ::= SEQUENCE {
//!      permittedSubtrees       [0]     GeneralSubtrees OPTIONAL,
//!      excludedSubtrees        [1]     GeneralSubtrees OPTIONAL }
//!
//! GeneralSubtrees ::= SEQUENCE SIZE (1..MAX) OF GeneralSubtree
//!
//! GeneralSubtree ::= SEQUENCE {
//!      base                    GeneralName,
//!      minimum         [0]     BaseDistance DEFAULT 0,
//!      maximum         [1]     BaseDistance OPTIONAL }
//! ```
//!
//! The base of each subtree is captured as a raw TLV and classified afterwards. Only the dNSName
//! and directoryName forms are interpreted, every other form is retained as [`GeneralNameForm::Other`].

use core::fmt;

use der::asn1::Int;
use der::{Any, Decode, Encode, Sequence, Tag, TagNumber, Tagged};

use crate::asn1::distinguished_name::{decode_directory_name, DIRECTORY_NAME_TAG};
use crate::util::error::DecodeError;

/// Tag used for the dNSName alternative of GeneralName: `[2]` primitive.
pub const DNS_NAME_TAG: Tag = Tag::ContextSpecific {
    constructed: false,
    number: TagNumber::N2,
};

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct RawGeneralSubtree {
    base: Any,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    minimum: Option<Int>,
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    maximum: Option<Int>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct RawNameConstraints {
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    permitted_subtrees: Option<Vec<RawGeneralSubtree>>,
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    excluded_subtrees: Option<Vec<RawGeneralSubtree>>,
}

/// The name form of a subtree base, decided once when the extension is decoded.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GeneralNameForm {
    /// dNSName, holding the IA5String content octets
    DnsName(Vec<u8>),
    /// directoryName, holding the complete encoding including the explicit `[4]` tag
    DirectoryName(Vec<u8>),
    /// Any other GeneralName alternative. These are carried along but never matched.
    Other(Tag, Vec<u8>),
}

impl GeneralNameForm {
    fn from_base(base: &Any) -> der::Result<Self> {
        let tag = base.tag();
        if tag == DNS_NAME_TAG {
            Ok(GeneralNameForm::DnsName(base.value().to_vec()))
        } else if tag == DIRECTORY_NAME_TAG {
            Ok(GeneralNameForm::DirectoryName(base.to_der()?))
        } else {
            Ok(GeneralNameForm::Other(tag, base.value().to_vec()))
        }
    }

    fn to_base(&self) -> der::Result<Any> {
        match self {
            GeneralNameForm::DnsName(v) => Any::new(DNS_NAME_TAG, v.as_slice()),
            GeneralNameForm::DirectoryName(v) => Any::from_der(v),
            GeneralNameForm::Other(tag, v) => Any::new(*tag, v.as_slice()),
        }
    }
}

/// One permitted or excluded subtree. `minimum` and `maximum` are decoded but not used when
/// evaluating names. They are kept as encoded, so values of any size round-trip.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Subtree {
    /// Name form and raw value of the subtree base
    pub base: GeneralNameForm,
    /// BaseDistance minimum, `None` when absent (DEFAULT 0)
    pub minimum: Option<Int>,
    /// BaseDistance maximum
    pub maximum: Option<Int>,
}

/// Permitted and excluded subtrees in declaration order. Either list may be empty.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NameConstraints {
    /// permittedSubtrees
    pub permitted: Vec<Subtree>,
    /// excludedSubtrees
    pub excluded: Vec<Subtree>,
}

impl NameConstraints {
    /// `to_der` encodes the constraints as the value of a NameConstraints extension. Empty lists
    /// are omitted.
    pub fn to_der(&self) -> der::Result<Vec<u8>> {
        fn to_raw(subtrees: &[Subtree]) -> der::Result<Option<Vec<RawGeneralSubtree>>> {
            if subtrees.is_empty() {
                return Ok(None);
            }
            let mut raw = vec![];
            for s in subtrees {
                raw.push(RawGeneralSubtree {
                    base: s.base.to_base()?,
                    minimum: s.minimum.clone(),
                    maximum: s.maximum.clone(),
                });
            }
            Ok(Some(raw))
        }

        let raw = RawNameConstraints {
            permitted_subtrees: to_raw(&self.permitted)?,
            excluded_subtrees: to_raw(&self.excluded)?,
        };
        raw.to_der()
    }
}

/// Records a directoryName subtree that could not be decoded and was dropped from its list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecodeDiagnostic {
    /// Position of the subtree within the list it was declared in
    pub index: usize,
    /// True if the subtree was in excludedSubtrees, false if in permittedSubtrees
    pub excluded: bool,
    /// Reason the directoryName was rejected
    pub error: DecodeError,
}

impl fmt::Display for DecodeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = if self.excluded {
            "excluded"
        } else {
            "permitted"
        };
        write!(
            f,
            "ignoring malformed directoryName in {} subtree {}: {}",
            list, self.index, self.error
        )
    }
}

/// Result of decoding a NameConstraints extension.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DecodedNameConstraints {
    /// Decoded constraints, without any subtrees listed in `diagnostics`
    pub constraints: NameConstraints,
    /// Subtrees that were dropped
    pub diagnostics: Vec<DecodeDiagnostic>,
}

fn classify_subtrees(
    raw: Option<Vec<RawGeneralSubtree>>,
    excluded: bool,
    diagnostics: &mut Vec<DecodeDiagnostic>,
) -> Result<Vec<Subtree>, DecodeError> {
    let mut subtrees = vec![];
    for (index, gs) in raw.unwrap_or_default().iter().enumerate() {
        let base = GeneralNameForm::from_base(&gs.base)?;
        if let GeneralNameForm::DirectoryName(dn) = &base {
            if let Err(error) = decode_directory_name(dn) {
                diagnostics.push(DecodeDiagnostic {
                    index,
                    excluded,
                    error,
                });
                continue;
            }
        }
        subtrees.push(Subtree {
            base,
            minimum: gs.minimum.clone(),
            maximum: gs.maximum.clone(),
        });
    }
    Ok(subtrees)
}

/// `decode_name_constraints` decodes the value of a NameConstraints extension.
///
/// A structural error anywhere in the extension, including trailing data, fails the whole decode.
/// A directoryName subtree whose RDNSequence cannot be decoded is instead dropped and reported in
/// [`DecodedNameConstraints::diagnostics`], and the remaining subtrees are still returned.
pub fn decode_name_constraints(enc: &[u8]) -> Result<DecodedNameConstraints, DecodeError> {
    let raw = RawNameConstraints::from_der(enc)?;
    let mut diagnostics = vec![];
    let permitted = classify_subtrees(raw.permitted_subtrees, false, &mut diagnostics)?;
    let excluded = classify_subtrees(raw.excluded_subtrees, true, &mut diagnostics)?;
    Ok(DecodedNameConstraints {
        constraints: NameConstraints {
            permitted,
            excluded,
        },
        diagnostics,
    })
}
