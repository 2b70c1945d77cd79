#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod asn1;
pub mod source;
pub mod util;
pub mod validator;
pub mod verifier;

// order of pub use statements below is intended to assure the list emitted by cargo doc on the main
// index.html page is in alphabetical order.
pub use crate::asn1::*;
pub use crate::{source::*, util::*, validator::*, verifier::*};
