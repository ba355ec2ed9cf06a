//! Custom Tera filters for case conversion and protobuf names.

use std::collections::HashMap;

use heck::{ToKebabCase, ToLowerCamelCase, ToPascalCase, ToShoutySnakeCase, ToSnakeCase};
use tera::{Filter, Result, Tera, Value};

/// Register every custom filter on a Tera instance.
pub(crate) fn register(tera: &mut Tera) {
    tera.register_filter("snake_case", case_filter("snake_case", |s| s.to_snake_case()));
    tera.register_filter("pascal_case", case_filter("pascal_case", |s| s.to_pascal_case()));
    tera.register_filter(
        "camel_case",
        case_filter("camel_case", |s| s.to_lower_camel_case()),
    );
    tera.register_filter("kebab_case", case_filter("kebab_case", |s| s.to_kebab_case()));
    tera.register_filter(
        "shouty_snake_case",
        case_filter("shouty_snake_case", |s| s.to_shouty_snake_case()),
    );
    tera.register_filter("base_type", base_type);
    tera.register_filter("go_package_name", go_package_name);
}

fn case_filter(name: &'static str, convert: fn(&str) -> String) -> impl Filter {
    move |value: &Value, _args: &HashMap<String, Value>| -> Result<Value> {
        let s = expect_str(name, value)?;
        Ok(Value::String(convert(s)))
    }
}

fn expect_str<'a>(filter: &str, value: &'a Value) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| tera::Error::msg(format!("{filter} filter expects a string")))
}

/// `.google.protobuf.Timestamp` → `Timestamp`.
pub(crate) fn base_type(value: &Value, _args: &HashMap<String, Value>) -> Result<Value> {
    let s = expect_str("base_type", value)?;
    let base = s.rsplit('.').next().unwrap_or(s);
    Ok(Value::String(base.to_string()))
}

/// Go package name from a `go_package` option.
///
/// An explicit `;name` suffix wins, otherwise the last path element is used.
pub(crate) fn go_package_name(value: &Value, _args: &HashMap<String, Value>) -> Result<Value> {
    let s = expect_str("go_package_name", value)?;
    let name = match s.split_once(';') {
        Some((_, explicit)) => explicit,
        None => s.rsplit('/').next().unwrap_or(s),
    };
    Ok(Value::String(name.replace(['-', '.'], "_")))
}
