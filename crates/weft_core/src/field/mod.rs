//! Extensible form field model.
//!
//! Currently holds the string field, the concrete owner exercising the
//! extension mechanism end to end. Field base classes dispatch their
//! extensible operations through `intercept_*` entry points instead of
//! calling their own method bodies.

pub mod hooks;
pub mod string_field;
