//! RFC5280-based certification path validation and name constraint enforcement

pub mod cert_path;
pub mod hostname;
pub mod name_constraints_set;
pub mod path_results;
pub mod path_settings;
pub mod path_validator;
pub mod pdv_certificate;
pub mod pdv_extension;

pub use crate::{
    validator::cert_path::*, validator::hostname::*, validator::name_constraints_set::*,
    validator::path_results::*, validator::path_settings::*, validator::path_validator::*,
    validator::pdv_certificate::*, validator::pdv_extension::*,
};
