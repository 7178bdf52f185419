//! Chain dispatch behavior across registered extensions and the base hook.

use std::rc::Rc;
use std::sync::{Arc, Mutex};
use weft_core::{
    ExtensionFactory, ExtensionRegistration, ExtensionRegistry, FieldResult, InitFieldChain,
    StringField, StringFieldHooks, ValidateValueChain,
};

type CallLog = Arc<Mutex<Vec<String>>>;

fn log_entry(log: &CallLog, entry: impl Into<String>) {
    log.lock().expect("call log lock").push(entry.into());
}

struct InitProbe {
    name: &'static str,
    log: CallLog,
}

impl StringFieldHooks for InitProbe {
    fn on_init_field(&self, field: &StringField, chain: &mut InitFieldChain<'_>) -> FieldResult<()> {
        log_entry(
            &self.log,
            format!("{}:enter initialized={}", self.name, field.is_initialized()),
        );
        let result = chain.exec_init_field(field);
        log_entry(
            &self.log,
            format!("{}:exit initialized={}", self.name, field.is_initialized()),
        );
        result
    }
}

fn register_init_probe(registry: &ExtensionRegistry, id: &str, order: f64, name: &'static str, log: &CallLog) {
    let log = Arc::clone(log);
    registry
        .register(ExtensionRegistration::new(
            id,
            order,
            ExtensionFactory::new(move |_field: &StringField| {
                Rc::new(InitProbe {
                    name,
                    log: Arc::clone(&log),
                }) as Rc<dyn StringFieldHooks>
            }),
        ))
        .expect("probe registration is valid");
}

#[test]
fn zero_extensions_runs_exactly_the_base_behavior() {
    let registry = Arc::new(ExtensionRegistry::new());
    let field = StringField::new(registry, "City");

    assert_eq!(field.extensions().len(), 1, "only the local hook is present");

    let accepted = field
        .intercept_validate_value("  hello  ")
        .expect("base validation accepts the raw value");
    assert_eq!(accepted, "  hello  ", "base validation returns the raw value unchanged");

    field.set_value("Bern").expect("plain value is accepted");
    assert_eq!(field.value().as_deref(), Some("Bern"));
}

#[test]
fn extensions_run_in_ascending_order_before_the_base() {
    let registry = Arc::new(ExtensionRegistry::new());
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    register_init_probe(&registry, "test.init.second", 20.0, "e2", &log);
    register_init_probe(&registry, "test.init.first", 10.0, "e1", &log);

    let field = StringField::new(registry, "City");
    field.intercept_init_field().expect("init dispatch succeeds");

    let entries = log.lock().expect("call log lock").clone();
    assert_eq!(
        entries,
        vec![
            "e1:enter initialized=false",
            "e2:enter initialized=false",
            "e2:exit initialized=true",
            "e1:exit initialized=true",
        ],
        "order 10 wraps order 20, and the base runs innermost"
    );
}

struct Swallow {
    log: CallLog,
}

impl StringFieldHooks for Swallow {
    fn on_validate_value(
        &self,
        _field: &StringField,
        _raw: &str,
        _chain: &mut ValidateValueChain<'_>,
    ) -> FieldResult<String> {
        log_entry(&self.log, "swallow");
        Ok("swallowed".to_string())
    }
}

struct ValidateMarker {
    name: &'static str,
    log: CallLog,
}

impl StringFieldHooks for ValidateMarker {
    fn on_validate_value(
        &self,
        field: &StringField,
        raw: &str,
        chain: &mut ValidateValueChain<'_>,
    ) -> FieldResult<String> {
        log_entry(&self.log, self.name);
        chain.exec_validate_value(field, raw)
    }
}

#[test]
fn short_circuiting_extension_skips_downstream_hooks_and_base() {
    let registry = Arc::new(ExtensionRegistry::new());
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));

    let swallow_log = Arc::clone(&log);
    registry
        .register(ExtensionRegistration::new(
            "test.validate.swallow",
            10.0,
            ExtensionFactory::new(move |_field: &StringField| {
                Rc::new(Swallow {
                    log: Arc::clone(&swallow_log),
                }) as Rc<dyn StringFieldHooks>
            }),
        ))
        .expect("swallow registration is valid");
    let marker_log = Arc::clone(&log);
    registry
        .register(ExtensionRegistration::new(
            "test.validate.downstream",
            20.0,
            ExtensionFactory::new(move |_field: &StringField| {
                Rc::new(ValidateMarker {
                    name: "downstream",
                    log: Arc::clone(&marker_log),
                }) as Rc<dyn StringFieldHooks>
            }),
        ))
        .expect("downstream registration is valid");

    let field = StringField::new(registry, "City");
    // Base max-length would reject this input, proving the base never ran.
    field.set_max_length(3);

    field.set_value("a value the base would reject").expect("swallow bypasses base validation");
    assert_eq!(field.value().as_deref(), Some("swallowed"));
    assert_eq!(
        log.lock().expect("call log lock").clone(),
        vec!["swallow"],
        "downstream hooks and base validation never ran"
    );
}

struct DoubleCaller {
    log: CallLog,
}

impl StringFieldHooks for DoubleCaller {
    fn on_validate_value(
        &self,
        field: &StringField,
        raw: &str,
        chain: &mut ValidateValueChain<'_>,
    ) -> FieldResult<String> {
        let first = chain.exec_validate_value(field, raw)?;
        let second = chain.exec_validate_value(field, raw)?;
        log_entry(&self.log, format!("equal={}", first == second));
        Ok(second)
    }
}

#[test]
fn calling_onward_twice_reruns_the_remainder_twice() {
    let registry = Arc::new(ExtensionRegistry::new());
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));

    let caller_log = Arc::clone(&log);
    registry
        .register(ExtensionRegistration::new(
            "test.validate.double",
            10.0,
            ExtensionFactory::new(move |_field: &StringField| {
                Rc::new(DoubleCaller {
                    log: Arc::clone(&caller_log),
                }) as Rc<dyn StringFieldHooks>
            }),
        ))
        .expect("double caller registration is valid");
    let counter_log = Arc::clone(&log);
    registry
        .register(ExtensionRegistration::new(
            "test.validate.innermost",
            90.0,
            ExtensionFactory::new(move |_field: &StringField| {
                Rc::new(ValidateMarker {
                    name: "inner",
                    log: Arc::clone(&counter_log),
                }) as Rc<dyn StringFieldHooks>
            }),
        ))
        .expect("innermost registration is valid");

    let field = StringField::new(registry, "City");
    let accepted = field
        .intercept_validate_value("twice")
        .expect("both passes accept the value");
    assert_eq!(accepted, "twice");

    let entries = log.lock().expect("call log lock").clone();
    assert_eq!(
        entries,
        vec!["inner", "inner", "equal=true"],
        "the remainder of the chain, base included, ran twice with equal results"
    );
}

struct UpperCaseExtension;

impl StringFieldHooks for UpperCaseExtension {
    fn on_validate_value(
        &self,
        field: &StringField,
        raw: &str,
        chain: &mut ValidateValueChain<'_>,
    ) -> FieldResult<String> {
        let accepted = chain.exec_validate_value(field, raw)?;
        Ok(accepted.to_uppercase())
    }
}

struct TrimExtension;

impl StringFieldHooks for TrimExtension {
    fn on_validate_value(
        &self,
        field: &StringField,
        raw: &str,
        chain: &mut ValidateValueChain<'_>,
    ) -> FieldResult<String> {
        let accepted = chain.exec_validate_value(field, raw)?;
        Ok(accepted.trim().to_string())
    }
}

#[test]
fn uppercase_and_trim_extensions_compose_deterministically() {
    let registry = Arc::new(ExtensionRegistry::new());
    registry
        .register(ExtensionRegistration::new(
            "test.validate.uppercase",
            10.0,
            ExtensionFactory::new(|_field: &StringField| {
                Rc::new(UpperCaseExtension) as Rc<dyn StringFieldHooks>
            }),
        ))
        .expect("uppercase registration is valid");
    registry
        .register(ExtensionRegistration::new(
            "test.validate.trim",
            20.0,
            ExtensionFactory::new(|_field: &StringField| {
                Rc::new(TrimExtension) as Rc<dyn StringFieldHooks>
            }),
        ))
        .expect("trim registration is valid");

    let field = StringField::new(registry, "Greeting");
    field.set_value("  hello  ").expect("value is accepted");

    // Base returns "  hello  " unchanged; trim (closer to base) yields
    // "hello"; uppercase (outer) yields "HELLO".
    assert_eq!(field.value().as_deref(), Some("HELLO"));
    assert_eq!(field.display_text(), "HELLO");
}

#[test]
fn dispatch_errors_propagate_unchanged_to_the_caller() {
    let registry = Arc::new(ExtensionRegistry::new());
    registry
        .register(ExtensionRegistration::new(
            "test.validate.trim",
            10.0,
            ExtensionFactory::new(|_field: &StringField| {
                Rc::new(TrimExtension) as Rc<dyn StringFieldHooks>
            }),
        ))
        .expect("trim registration is valid");

    let field = StringField::new(registry, "City");
    field.set_mandatory(true);

    let rejected = field.set_value("   ");
    assert_eq!(
        rejected,
        Err(weft_core::FieldError::MandatoryValueMissing {
            field: "City".to_string()
        }),
        "the base error reaches the caller without translation"
    );
    assert_eq!(field.value(), None);
}
