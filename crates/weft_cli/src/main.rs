//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `weft_core` linkage.
//! - Exercise one register/dispatch round trip with deterministic output.

use std::rc::Rc;
use std::sync::Arc;
use weft_core::{
    ExtensionFactory, ExtensionRegistration, ExtensionRegistry, FieldResult, StringField,
    StringFieldHooks, ValidateValueChain,
};

struct TrimProbe;

impl StringFieldHooks for TrimProbe {
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

fn main() {
    println!("weft_core ping={}", weft_core::ping());
    println!("weft_core version={}", weft_core::core_version());

    let registry = Arc::new(ExtensionRegistry::new());
    let registration = ExtensionRegistration::new(
        "weft.cli.trim-probe",
        10.0,
        ExtensionFactory::new(|_field: &StringField| Rc::new(TrimProbe) as Rc<dyn StringFieldHooks>),
    );
    if let Err(err) = registry.register(registration) {
        eprintln!("weft_core probe registration failed: {err}");
        std::process::exit(1);
    }

    let field = StringField::new(registry, "Probe");
    match field.set_value("  weft  ") {
        Ok(()) => println!("weft_core probe value={:?}", field.value()),
        Err(err) => {
            eprintln!("weft_core probe dispatch failed: {err}");
            std::process::exit(1);
        }
    }
}
