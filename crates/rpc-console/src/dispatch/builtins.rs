//! Methods shipped with the stand-alone console.

use serde_json::{Value, json};

use super::{DispatchError, MethodCall, MethodTable};

/// Registers `echo`, `methods` and `about` on `table`.
pub fn install_builtins(table: &MethodTable) {
    table.register("echo", echo);
    table.register("methods", methods);
    table.register("about", about);
}

/// Returns the single argument, or every argument as an array.
fn echo(call: MethodCall<'_>) -> Result<Value, DispatchError> {
    let mut arguments = call.arguments;
    if arguments.len() == 1 {
        return Ok(arguments.pop().unwrap_or_default());
    }
    Ok(Value::Array(arguments))
}

fn methods(call: MethodCall<'_>) -> Result<Value, DispatchError> {
    if !call.arguments.is_empty() {
        return Err(DispatchError::invalid_arguments(
            "methods takes no arguments",
        ));
    }
    Ok(json!(call.table.names()))
}

fn about(call: MethodCall<'_>) -> Result<Value, DispatchError> {
    if !call.arguments.is_empty() {
        return Err(DispatchError::invalid_arguments("about takes no arguments"));
    }
    Ok(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
