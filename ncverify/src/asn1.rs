//! Minimal decoders for the NameConstraints extension and for the Name structure carried in a
//! directoryName

pub mod distinguished_name;
pub mod name_constraints;

pub use crate::asn1::distinguished_name::*;
pub use crate::asn1::name_constraints::*;
