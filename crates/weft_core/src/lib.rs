//! Core extension/override mechanism for Weft.
//! This crate is the single source of truth for chain dispatch semantics.

pub mod extension;
pub mod field;
pub mod logging;

pub use extension::chain::HookChain;
pub use extension::instances::ExtensionInstances;
pub use extension::owner::Extensible;
pub use extension::registry::{
    shared_registry, ContributionFactory, ContributionRegistration, ExtensionFactory,
    ExtensionRegistration, ExtensionRegistry, RegistrationError, RegistryReport, RegistryResult,
    ResolvedExtension,
};
pub use field::hooks::{FormatValueChain, InitFieldChain, StringFieldHooks, ValidateValueChain};
pub use field::string_field::{
    FieldError, FieldResult, LocalStringFieldHooks, StringField, FORM_FIELD_TYPE_KEY,
    STRING_FIELD_TYPE_KEY, VALUE_FIELD_TYPE_KEY,
};
pub use logging::{default_log_level, init_logging, logging_status};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
