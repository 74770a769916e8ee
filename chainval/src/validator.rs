//! RFC5280-compliant certificate chain validation

pub mod cert_path;
pub mod cert_validator;
pub mod general_names;
pub mod name_constraints_set;
pub mod path_validator;
pub mod pdv_certificate;
pub mod pdv_extension;
pub mod pdv_trust_anchor;
pub mod validation_context;
pub mod validation_result;
pub mod validator_factory;
pub mod validators;

pub use crate::{
    validator::cert_path::*, validator::cert_validator::*, validator::general_names::*,
    validator::name_constraints_set::*, validator::path_validator::*,
    validator::pdv_certificate::*, validator::pdv_extension::*, validator::pdv_trust_anchor::*,
    validator::validation_context::*, validator::validation_result::*,
    validator::validator_factory::*, validator::validators::*,
};
