//! Descriptor tables for the natively shipped standard-library modules.
//!
//! Each table is a plain function so the registry can defer building the
//! entry vectors until a module is actually used.
use crate::runtime::builtins;

use super::{FunctionMetadata, ModuleMetadata, ParamSpec};

/// The module whose members are reachable as bare identifiers in every
/// compilation unit.
pub const BUILTIN_MODULE: &str = "builtin";

pub fn native_modules() -> Vec<ModuleMetadata> {
    vec![
        ModuleMetadata::native(
            BUILTIN_MODULE,
            "1.0.0",
            "Implicitly imported core routines.",
            builtin_entries,
        ),
        ModuleMetadata::native("math", "1.0.0", "Numeric routines.", math_entries),
        ModuleMetadata::native("string", "1.0.0", "String routines.", string_entries),
        ModuleMetadata::native("json", "1.0.0", "JSON encoding and decoding.", json_entries),
        ModuleMetadata::native(
            "file",
            "1.0.0",
            "Capability-gated file access.",
            file_entries,
        ),
    ]
}

fn builtin_entries() -> Vec<FunctionMetadata> {
    vec![
        FunctionMetadata::native(
            "int",
            "Convert a value to an integer.",
            &[],
            ParamSpec::fixed(&["value"]),
            builtins::int,
        ),
        FunctionMetadata::native(
            "float",
            "Convert a value to a float.",
            &[],
            ParamSpec::fixed(&["value"]),
            builtins::float,
        ),
        FunctionMetadata::native(
            "str",
            "Render a value as a string.",
            &[],
            ParamSpec::fixed(&["value"]),
            builtins::str,
        ),
        FunctionMetadata::native(
            "len",
            "Length of a string, array, or object.",
            &[],
            ParamSpec::fixed(&["value"]),
            builtins::len,
        ),
        FunctionMetadata::native(
            "range",
            "Array of integers from start to end.",
            &[],
            ParamSpec::with_optional(&["start", "end", "step"], 1),
            builtins::range,
        ),
        FunctionMetadata::native(
            "print",
            "Print values separated by spaces.",
            &[],
            ParamSpec::variadic(&["values"], 0),
            builtins::print,
        ),
        FunctionMetadata::native(
            "typeof",
            "Type name of a value.",
            &[],
            ParamSpec::fixed(&["value"]),
            builtins::typeof_,
        ),
        FunctionMetadata::native(
            "abs",
            "Absolute value.",
            &[],
            ParamSpec::fixed(&["value"]),
            builtins::abs,
        ),
        FunctionMetadata::native(
            "min",
            "Smallest of the arguments or array elements.",
            &[],
            ParamSpec::variadic(&["values"], 1),
            builtins::min,
        ),
        FunctionMetadata::native(
            "max",
            "Largest of the arguments or array elements.",
            &[],
            ParamSpec::variadic(&["values"], 1),
            builtins::max,
        ),
        FunctionMetadata::native(
            "keys",
            "Keys of an object.",
            &[],
            ParamSpec::fixed(&["object"]),
            builtins::keys,
        ),
        FunctionMetadata::native(
            "values",
            "Values of an object.",
            &[],
            ParamSpec::fixed(&["object"]),
            builtins::values,
        ),
        FunctionMetadata::native(
            "getattr",
            "Attribute of an object through the safety checks.",
            &[],
            ParamSpec::with_optional(&["object", "name", "default"], 2),
            builtins::getattr,
        ),
        FunctionMetadata::native(
            "hasattr",
            "Whether an attribute is present and reachable.",
            &[],
            ParamSpec::fixed(&["object", "name"]),
            builtins::hasattr,
        ),
        FunctionMetadata::native(
            "setattr",
            "Set an attribute on an ML object through the safety checks.",
            &[],
            ParamSpec::fixed(&["object", "name", "value"]),
            builtins::setattr,
        ),
        FunctionMetadata::native(
            "call",
            "Call a callable value through the safety checks.",
            &[],
            ParamSpec::variadic(&["callable", "args"], 1),
            builtins::call,
        ),
        FunctionMetadata::native(
            "has_capability",
            "Whether a capability is live on this thread.",
            &[],
            ParamSpec::fixed(&["name"]),
            builtins::has_capability,
        ),
        FunctionMetadata::native(
            "get_capabilities",
            "Names of all live capabilities.",
            &[],
            ParamSpec::fixed(&[]),
            builtins::get_capabilities,
        ),
        FunctionMetadata::native(
            "get_capability_info",
            "Details of a live capability, or null.",
            &[],
            ParamSpec::fixed(&["name"]),
            builtins::get_capability_info,
        ),
        FunctionMetadata::native(
            "required_capabilities",
            "Capability types a function requires.",
            &[],
            ParamSpec::fixed(&["function"]),
            builtins::required_capabilities,
        ),
    ]
}

fn math_entries() -> Vec<FunctionMetadata> {
    vec![
        FunctionMetadata::native(
            "sqrt",
            "Square root.",
            &[],
            ParamSpec::fixed(&["value"]),
            builtins::sqrt,
        ),
        FunctionMetadata::native(
            "floor",
            "Round down to an integer.",
            &[],
            ParamSpec::fixed(&["value"]),
            builtins::floor,
        ),
        FunctionMetadata::native(
            "ceil",
            "Round up to an integer.",
            &[],
            ParamSpec::fixed(&["value"]),
            builtins::ceil,
        ),
        FunctionMetadata::native(
            "pow",
            "Raise a base to an exponent.",
            &[],
            ParamSpec::fixed(&["base", "exponent"]),
            builtins::pow,
        ),
        FunctionMetadata::native(
            "sin",
            "Sine of an angle in radians.",
            &[],
            ParamSpec::fixed(&["value"]),
            builtins::sin,
        ),
        FunctionMetadata::native(
            "cos",
            "Cosine of an angle in radians.",
            &[],
            ParamSpec::fixed(&["value"]),
            builtins::cos,
        ),
    ]
}

fn string_entries() -> Vec<FunctionMetadata> {
    vec![
        FunctionMetadata::native(
            "upper",
            "Uppercased copy.",
            &[],
            ParamSpec::fixed(&["value"]),
            builtins::upper,
        ),
        FunctionMetadata::native(
            "lower",
            "Lowercased copy.",
            &[],
            ParamSpec::fixed(&["value"]),
            builtins::lower,
        ),
        FunctionMetadata::native(
            "strip",
            "Copy without surrounding whitespace.",
            &[],
            ParamSpec::fixed(&["value"]),
            builtins::strip,
        ),
        FunctionMetadata::native(
            "split",
            "Split on a separator.",
            &[],
            ParamSpec::fixed(&["value", "separator"]),
            builtins::split,
        ),
        FunctionMetadata::native(
            "join",
            "Join parts with a separator.",
            &[],
            ParamSpec::fixed(&["parts", "separator"]),
            builtins::join,
        ),
        FunctionMetadata::native(
            "replace",
            "Copy with occurrences replaced.",
            &[],
            ParamSpec::fixed(&["value", "from", "to"]),
            builtins::replace,
        ),
        FunctionMetadata::native(
            "contains",
            "Whether a substring occurs.",
            &[],
            ParamSpec::fixed(&["value", "needle"]),
            builtins::contains,
        ),
    ]
}

fn json_entries() -> Vec<FunctionMetadata> {
    vec![
        FunctionMetadata::native(
            "dumps",
            "Serialize a value to JSON text.",
            &[],
            ParamSpec::fixed(&["value"]),
            builtins::dumps,
        ),
        FunctionMetadata::native(
            "loads",
            "Parse JSON text into a value.",
            &[],
            ParamSpec::fixed(&["text"]),
            builtins::loads,
        ),
    ]
}

fn file_entries() -> Vec<FunctionMetadata> {
    vec![
        FunctionMetadata::native(
            "read_text",
            "Read a file as text.",
            &["FileRead"],
            ParamSpec::fixed(&["path"]),
            builtins::read_text,
        ),
        FunctionMetadata::native(
            "write_text",
            "Write text to a file.",
            &["FileWrite"],
            ParamSpec::fixed(&["path", "content"]),
            builtins::write_text,
        ),
        FunctionMetadata::native(
            "exists",
            "Whether a path exists.",
            &["FileRead"],
            ParamSpec::fixed(&["path"]),
            builtins::exists,
        ),
    ]
}
