//! Component naming helpers
//!
//! Name validation, case conversion and the display name used by perf
//! measures and diagnostics.

use std::sync::OnceLock;

use regex_lite::Regex;

use crate::instance::Instance;

/// Tags a component may never be registered under
const BUILTIN_TAGS: &[&str] = &["slot", "component"];

/// Host element names reserved by the platform
const RESERVED_TAGS: &[&str] = &[
    "html", "body", "head", "template", "div", "span", "p", "a", "img", "button", "input",
    "form", "table", "ul", "li", "svg",
];

/// Why a component name was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidComponentName {
    #[error("invalid component name \"{0}\": must start with a letter and contain only alphanumerics, '_' or '-'")]
    Malformed(String),

    #[error("do not use built-in or reserved tag \"{0}\" as component name")]
    Reserved(String),
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z][\w-]*$").expect("component name pattern"))
}

fn camel_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-(\w)").expect("camelize pattern"))
}

fn classify_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?:^|[-_])(\w)").expect("classify pattern"))
}

fn component_file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"([^/\\]+)\.vue$").expect("file pattern"))
}

/// Check a name before it is used to register a component
pub fn validate_component_name(name: &str) -> Result<(), InvalidComponentName> {
    if !name_pattern().is_match(name) {
        return Err(InvalidComponentName::Malformed(name.to_string()));
    }
    let lower = name.to_ascii_lowercase();
    if BUILTIN_TAGS.contains(&lower.as_str()) || RESERVED_TAGS.contains(&lower.as_str()) {
        return Err(InvalidComponentName::Reserved(name.to_string()));
    }
    Ok(())
}

/// `my-prop` → `myProp`
pub fn camelize(s: &str) -> String {
    camel_pattern()
        .replace_all(s, |caps: &regex_lite::Captures<'_>| caps[1].to_uppercase())
        .into_owned()
}

/// `myProp` → `MyProp`
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `my-component_name` → `MyComponentName`
pub fn classify(s: &str) -> String {
    classify_pattern()
        .replace_all(s, |caps: &regex_lite::Captures<'_>| caps[1].to_uppercase())
        .into_owned()
}

/// Display name of an instance: `<Root>`, `<Name>` or `<Anonymous>`,
/// optionally followed by ` at <file>`.
pub fn format_component_name(vm: &Instance, include_file: bool) -> String {
    let options = vm.options();
    if options.get("parent").is_none() {
        return "<Root>".to_string();
    }

    let file = options.get("__file").and_then(|f| f.as_str().map(str::to_string));
    let mut name = options
        .get("name")
        .or_else(|| options.get("_componentTag"))
        .and_then(|n| n.as_str().map(str::to_string));

    if name.is_none() {
        if let Some(file) = &file {
            name = component_file_pattern()
                .captures(file)
                .map(|caps| caps[1].to_string());
        }
    }

    let mut formatted = match name {
        Some(name) => format!("<{}>", classify(&name)),
        None => "<Anonymous>".to_string(),
    };
    if let (Some(file), true) = (file, include_file) {
        formatted.push_str(" at ");
        formatted.push_str(&file);
    }
    formatted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_component_name("todo-item").is_ok());
        assert!(validate_component_name("TodoItem").is_ok());
        assert!(validate_component_name("x_1").is_ok());
    }

    #[test]
    fn test_malformed_names() {
        assert_eq!(
            validate_component_name("1item"),
            Err(InvalidComponentName::Malformed("1item".to_string()))
        );
        assert!(validate_component_name("my item").is_err());
        assert!(validate_component_name("").is_err());
    }

    #[test]
    fn test_reserved_names() {
        assert_eq!(
            validate_component_name("slot"),
            Err(InvalidComponentName::Reserved("slot".to_string()))
        );
        assert!(validate_component_name("Div").is_err());
    }

    #[test]
    fn test_case_conversion() {
        assert_eq!(camelize("my-long-prop"), "myLongProp");
        assert_eq!(camelize("plain"), "plain");
        assert_eq!(capitalize("myProp"), "MyProp");
        assert_eq!(capitalize(""), "");
        assert_eq!(classify("todo-list_item"), "TodoListItem");
    }
}
