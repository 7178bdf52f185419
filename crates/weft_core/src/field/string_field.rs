//! String form field, the concrete extensible owner of this crate.
//!
//! `StringField` never runs its base behavior directly: every extensible
//! operation goes through an `intercept_*` entry point that dispatches the
//! owner's hook chain, so registered extensions get first refusal. The
//! terminal chain link is always [`LocalStringFieldHooks`], which executes
//! the unmodified base behavior.

use crate::extension::instances::ExtensionInstances;
use crate::extension::owner::Extensible;
use crate::extension::registry::ExtensionRegistry;
use crate::field::hooks::{
    FormatValueChain, InitFieldChain, StringFieldHooks, ValidateValueChain,
};
use log::{debug, info};
use regex::Regex;
use std::any::Any;
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

/// Registry type key for string fields.
pub const STRING_FIELD_TYPE_KEY: &str = "weft.field.string";
/// Registry type key shared by all value-holding fields.
pub const VALUE_FIELD_TYPE_KEY: &str = "weft.field.value";
/// Registry type key shared by all form fields.
pub const FORM_FIELD_TYPE_KEY: &str = "weft.field";

pub type FieldResult<T> = Result<T, FieldError>;

/// Field operation errors.
///
/// Validation errors carry the field label instead of the rejected value so
/// they are safe to surface verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    MandatoryValueMissing {
        field: String,
    },
    MaxLengthExceeded {
        field: String,
        max_length: usize,
        actual: usize,
    },
    PatternMismatch {
        field: String,
    },
    InvalidPattern {
        field: String,
        reason: String,
    },
    /// A hand-built chain was walked past its terminal hook. Framework-built
    /// chains always end in the local hook and never hit this.
    ChainExhausted,
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MandatoryValueMissing { field } => {
                write!(f, "field `{field}` is mandatory but has no value")
            }
            Self::MaxLengthExceeded {
                field,
                max_length,
                actual,
            } => write!(
                f,
                "field `{field}` accepts at most {max_length} characters, got {actual}"
            ),
            Self::PatternMismatch { field } => {
                write!(f, "value of field `{field}` does not match the required pattern")
            }
            Self::InvalidPattern { field, reason } => {
                write!(f, "pattern of field `{field}` is invalid: {reason}")
            }
            Self::ChainExhausted => write!(f, "hook chain was walked past its terminal hook"),
        }
    }
}

impl Error for FieldError {}

#[derive(Default)]
struct FieldState {
    label: String,
    mandatory: bool,
    max_length: Option<usize>,
    pattern: Option<Regex>,
    value: Option<String>,
    display_text: String,
    initialized: bool,
}

/// Extensible single-line text field.
pub struct StringField {
    instance_id: Uuid,
    container_path: Vec<String>,
    registry: Arc<ExtensionRegistry>,
    state: Rc<RefCell<FieldState>>,
    extensions: ExtensionInstances<dyn StringFieldHooks>,
}

impl StringField {
    /// Creates a field wired to `registry`.
    ///
    /// Configuration (label, constraints, container path) must be completed
    /// before the first extensible operation is dispatched; the hook list is
    /// materialized on first dispatch and fixed afterwards.
    pub fn new(registry: Arc<ExtensionRegistry>, label: impl Into<String>) -> Self {
        let state = FieldState {
            label: label.into(),
            ..FieldState::default()
        };
        Self {
            instance_id: Uuid::new_v4(),
            container_path: Vec::new(),
            registry,
            state: Rc::new(RefCell::new(state)),
            extensions: ExtensionInstances::new(),
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn label(&self) -> String {
        self.state.borrow().label.clone()
    }

    pub fn set_mandatory(&self, mandatory: bool) {
        self.state.borrow_mut().mandatory = mandatory;
    }

    pub fn set_max_length(&self, max_length: usize) {
        self.state.borrow_mut().max_length = Some(max_length);
    }

    /// Sets the validation pattern applied to trimmed raw values.
    ///
    /// # Errors
    /// [`FieldError::InvalidPattern`] when `pattern` is not a valid regex.
    pub fn set_pattern(&self, pattern: &str) -> FieldResult<()> {
        let compiled = Regex::new(pattern).map_err(|err| FieldError::InvalidPattern {
            field: self.label(),
            reason: err.to_string(),
        })?;
        self.state.borrow_mut().pattern = Some(compiled);
        Ok(())
    }

    /// Appends a container anchor id, outermost first.
    pub fn push_container_anchor(&mut self, anchor: impl Into<String>) {
        self.container_path.push(anchor.into());
    }

    pub fn value(&self) -> Option<String> {
        self.state.borrow().value.clone()
    }

    pub fn display_text(&self) -> String {
        self.state.borrow().display_text.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.borrow().initialized
    }

    /// Ordered hook list for this field, materialized on first call.
    ///
    /// Registered extensions come first in registry order; the local base
    /// hook is always last.
    pub fn extensions(&self) -> Rc<Vec<Rc<dyn StringFieldHooks>>> {
        self.extensions.get_or_materialize(|push| {
            let resolved = self.registry.snapshot_for::<StringField>(&self.container_path);
            debug!(
                "event=hooks_materialized module=field field={} label={} extensions={}",
                self.instance_id,
                self.state.borrow().label,
                resolved.len()
            );
            for extension in &resolved {
                push(extension.instantiate(self));
            }
            push(Rc::new(LocalStringFieldHooks) as Rc<dyn StringFieldHooks>);
        })
    }

    /// Finds the materialized hook instance of concrete type `T`.
    ///
    /// A miss is a normal outcome, not an error.
    pub fn extension<T: Any>(&self) -> Option<Rc<T>> {
        self.extensions().iter().find_map(|hook| {
            let any: Rc<dyn Any> = Rc::clone(hook) as Rc<dyn Any>;
            any.downcast::<T>().ok()
        })
    }

    /// Dispatches field initialization through the hook chain.
    pub fn intercept_init_field(&self) -> FieldResult<()> {
        let hooks = self.extensions();
        InitFieldChain::new(&hooks).exec_init_field(self)
    }

    /// Dispatches raw-value validation through the hook chain.
    pub fn intercept_validate_value(&self, raw: &str) -> FieldResult<String> {
        let hooks = self.extensions();
        ValidateValueChain::new(&hooks).exec_validate_value(self, raw)
    }

    /// Dispatches display-text formatting through the hook chain.
    pub fn intercept_format_value(&self, value: &str) -> FieldResult<String> {
        let hooks = self.extensions();
        FormatValueChain::new(&hooks).exec_format_value(self, value)
    }

    /// Validates `raw`, stores the accepted value, and refreshes the
    /// display text, each step going through the hook chain.
    ///
    /// # Errors
    /// Whatever the validation or formatting chain returns, unchanged. A
    /// rejected value leaves the stored value and display text untouched.
    pub fn set_value(&self, raw: &str) -> FieldResult<()> {
        let accepted = self.intercept_validate_value(raw)?;
        self.state.borrow_mut().value = Some(accepted.clone());
        let display_text = self.intercept_format_value(&accepted)?;
        self.state.borrow_mut().display_text = display_text;
        Ok(())
    }

    fn local_init(&self) -> FieldResult<()> {
        let mut state = self.state.borrow_mut();
        state.initialized = true;
        info!(
            "event=field_initialized module=field field={} label={}",
            self.instance_id, state.label
        );
        Ok(())
    }

    fn local_validate(&self, raw: &str) -> FieldResult<String> {
        let state = self.state.borrow();
        let trimmed = raw.trim();
        if state.mandatory && trimmed.is_empty() {
            return Err(FieldError::MandatoryValueMissing {
                field: state.label.clone(),
            });
        }
        if let Some(max_length) = state.max_length {
            let actual = raw.chars().count();
            if actual > max_length {
                return Err(FieldError::MaxLengthExceeded {
                    field: state.label.clone(),
                    max_length,
                    actual,
                });
            }
        }
        if let Some(pattern) = &state.pattern {
            if !pattern.is_match(trimmed) {
                return Err(FieldError::PatternMismatch {
                    field: state.label.clone(),
                });
            }
        }
        Ok(raw.to_string())
    }

    fn local_format(&self, value: &str) -> FieldResult<String> {
        Ok(value.to_string())
    }
}

impl Extensible for StringField {
    type Hooks = dyn StringFieldHooks;

    fn type_lineage() -> &'static [&'static str] {
        &[STRING_FIELD_TYPE_KEY, VALUE_FIELD_TYPE_KEY, FORM_FIELD_TYPE_KEY]
    }

    fn container_path(&self) -> &[String] {
        &self.container_path
    }
}

/// Terminal chain link running the field's unmodified base behavior.
///
/// Never calls onward; this is what would have run with zero extensions
/// installed.
pub struct LocalStringFieldHooks;

impl StringFieldHooks for LocalStringFieldHooks {
    fn on_init_field(&self, field: &StringField, _chain: &mut InitFieldChain<'_>) -> FieldResult<()> {
        field.local_init()
    }

    fn on_validate_value(
        &self,
        field: &StringField,
        raw: &str,
        _chain: &mut ValidateValueChain<'_>,
    ) -> FieldResult<String> {
        field.local_validate(raw)
    }

    fn on_format_value(
        &self,
        field: &StringField,
        value: &str,
        _chain: &mut FormatValueChain<'_>,
    ) -> FieldResult<String> {
        field.local_format(value)
    }
}
