//! Hook contract and per-operation chains for string fields.
//!
//! Every extensible field operation has a hook method here and a chain type
//! wrapping the shared cursor walk. Default hook methods call onward, so an
//! extension only overrides the operations it cares about; the terminal
//! local hook implements the field's base behavior and never forwards.

use crate::extension::chain::HookChain;
use crate::field::string_field::{FieldError, FieldResult, StringField};
use std::any::Any;
use std::rc::Rc;

/// Override-able operations of a [`StringField`].
///
/// Hooks receive the owner, the operation arguments, and the chain. A hook
/// may run logic before or after calling onward, replace the result, or
/// return without forwarding to short-circuit the rest of the chain
/// (including the base behavior). Calling onward more than once re-runs the
/// remainder of the chain each time.
///
/// The `Any` supertrait enables lookup of a materialized hook by its
/// concrete type via [`StringField::extension`].
pub trait StringFieldHooks: Any {
    fn on_init_field(&self, field: &StringField, chain: &mut InitFieldChain<'_>) -> FieldResult<()> {
        chain.exec_init_field(field)
    }

    fn on_validate_value(
        &self,
        field: &StringField,
        raw: &str,
        chain: &mut ValidateValueChain<'_>,
    ) -> FieldResult<String> {
        chain.exec_validate_value(field, raw)
    }

    fn on_format_value(
        &self,
        field: &StringField,
        value: &str,
        chain: &mut FormatValueChain<'_>,
    ) -> FieldResult<String> {
        chain.exec_format_value(field, value)
    }
}

/// Chain for the field initialization operation.
pub struct InitFieldChain<'a> {
    chain: HookChain<'a, dyn StringFieldHooks>,
}

impl<'a> InitFieldChain<'a> {
    pub fn new(hooks: &'a [Rc<dyn StringFieldHooks>]) -> Self {
        Self {
            chain: HookChain::new(hooks),
        }
    }

    /// Invokes the next hook's `on_init_field`.
    pub fn exec_init_field(&mut self, field: &StringField) -> FieldResult<()> {
        let (position, hook) = self.chain.advance().ok_or(FieldError::ChainExhausted)?;
        let result = hook.on_init_field(field, self);
        self.chain.rewind(position);
        result
    }
}

/// Chain for the raw-value validation operation.
pub struct ValidateValueChain<'a> {
    chain: HookChain<'a, dyn StringFieldHooks>,
}

impl<'a> ValidateValueChain<'a> {
    pub fn new(hooks: &'a [Rc<dyn StringFieldHooks>]) -> Self {
        Self {
            chain: HookChain::new(hooks),
        }
    }

    /// Invokes the next hook's `on_validate_value`.
    pub fn exec_validate_value(&mut self, field: &StringField, raw: &str) -> FieldResult<String> {
        let (position, hook) = self.chain.advance().ok_or(FieldError::ChainExhausted)?;
        let result = hook.on_validate_value(field, raw, self);
        self.chain.rewind(position);
        result
    }
}

/// Chain for the display-text formatting operation.
pub struct FormatValueChain<'a> {
    chain: HookChain<'a, dyn StringFieldHooks>,
}

impl<'a> FormatValueChain<'a> {
    pub fn new(hooks: &'a [Rc<dyn StringFieldHooks>]) -> Self {
        Self {
            chain: HookChain::new(hooks),
        }
    }

    /// Invokes the next hook's `on_format_value`.
    pub fn exec_format_value(&mut self, field: &StringField, value: &str) -> FieldResult<String> {
        let (position, hook) = self.chain.advance().ok_or(FieldError::ChainExhausted)?;
        let result = hook.on_format_value(field, value, self);
        self.chain.rewind(position);
        result
    }
}
