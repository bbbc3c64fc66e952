//! Post-fill checks.
//!
//! The model is free to answer with anything that parses. When validation is
//! enabled, a filled invocation is kept only if it still names the same
//! tool, sets the same fields as before filling, has no placeholders left,
//! and validates against the tool's parameter schema.

use super::Invocation;
use crate::ToolDef;
use crate::permute::is_placeholder;

/// Every problem found with a filled invocation. Empty means valid.
pub fn fill_violations(pending: &Invocation, filled: &Invocation, tool: &ToolDef) -> Vec<String> {
    let mut violations = Vec::new();

    if filled.name != tool.name() {
        violations.push(format!(
            "name: expected `{}`, got `{}`",
            tool.name(),
            filled.name
        ));
    }

    for key in pending.arguments.keys() {
        if !filled.arguments.contains_key(key) {
            violations.push(format!("/{key}: missing after fill"));
        }
    }
    for key in filled.arguments.keys() {
        if !pending.arguments.contains_key(key) {
            violations.push(format!("/{key}: not part of the pending invocation"));
        }
    }

    for (key, value) in &filled.arguments {
        if is_placeholder(value) {
            violations.push(format!("/{key}: placeholder {value} was not replaced"));
        }
    }

    // A schema the validator cannot compile is not the fill's fault.
    if let Ok(validator) = jsonschema::validator_for(&tool.function.parameters) {
        let instance = serde_json::Value::Object(filled.arguments.clone());
        violations.extend(
            validator
                .iter_errors(&instance)
                .map(|e| format!("{}: {e}", e.instance_path())),
        );
    }

    violations
}
