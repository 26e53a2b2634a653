//! Generated Script Surface
//!
//! Each registered function is exposed to the page as
//! `app.<name>(args.., callback)`, whose body forwards into the native
//! dispatch. The generated code is a templating convenience; the
//! protocol itself never depends on it.

/// Prelude ensuring the `app` namespace object exists.
pub(crate) const SCRIPT_PRELUDE: &str = "var app; if(!app) app={};\n";

/// Builds the parameter list for a generated function: the declared
/// argument names, plus an implicit trailing `callback` when the
/// function reports a result or keeps a persistent callback.
pub(crate) fn format_arg_list(arg_names: &[String], wants_callback: bool) -> String {
    let mut arg_list = arg_names.join(", ");
    if wants_callback {
        if !arg_names.is_empty() {
            arg_list.push(',');
        }
        arg_list.push_str("callback");
    }
    arg_list
}

/// Emits one `app.<name> = function(...) {...};` block. A custom body
/// replaces the default forwarding body verbatim.
pub(crate) fn format_function(name: &str, arg_list: &str, custom_body: Option<&str>) -> String {
    let mut code = String::new();
    code.push_str("app.");
    code.push_str(name);
    code.push_str("=function(");
    code.push_str(arg_list);
    code.push_str("){\n");
    code.push_str("  native function ");
    code.push_str(name);
    code.push_str("();\n");

    match custom_body {
        None => {
            code.push_str("  return ");
            code.push_str(name);
            code.push('(');
            code.push_str(arg_list);
            code.push_str(");");
        }
        Some(body) => code.push_str(body),
    }

    code.push_str("\n};\n");
    code
}
