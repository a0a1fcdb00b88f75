//! Build-time template values and token substitution.
//! Source files reference a value `name` with a `{{name}}` placeholder.

use crate::config::BuildConfig;
use crate::project::Project;
use indexmap::IndexMap;
use log::warn;
use regex::{Captures, Regex};
use serde_yaml::{Mapping, Value};
use std::borrow::Cow;
use std::sync::LazyLock;

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").unwrap());

/// Named template values, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateSet {
    values: IndexMap<String, Value>,
}

impl TemplateSet {
    pub fn from_mapping(mapping: &Mapping) -> Self {
        let values = mapping
            .iter()
            .filter_map(|(key, value)| Some((key_to_string(key)?, value.clone())))
            .collect();
        Self { values }
    }

    pub fn insert<K: Into<String>>(&mut self, name: K, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// The value of `name` as it is written into source files.
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.values.get(name).map(stringify)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names no `{{name}}` placeholder can ever refer to: empty names, names with braces,
    /// and names with leading or trailing whitespace.
    pub fn unreachable_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str).filter(|name| {
            name.trim().is_empty() || name.trim() != *name || name.contains(['{', '}'])
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Adds every value of `defaults` whose name is not defined here yet.
    pub fn with_defaults(mut self, defaults: &TemplateSet) -> Self {
        for (name, value) in &defaults.values {
            if !self.values.contains_key(name) {
                self.values.insert(name.clone(), value.clone());
            }
        }
        self
    }

    /// Replaces every `{{name}}` placeholder whose name is defined in this set.
    ///
    /// A single pass over `content`: substituted values are never scanned again, and
    /// placeholders naming unknown values are left as they are.
    pub fn substitute<'a>(&self, content: &'a str) -> Cow<'a, str> {
        if self.values.is_empty() {
            return Cow::Borrowed(content);
        }

        TOKEN_PATTERN.replace_all(content, |caps: &Captures| match self.get_str(&caps[1]) {
            Some(value) => value,
            None => caps[0].to_string(),
        })
    }
}

/// Computes the template values of one build.
///
/// Project values always win. Release builds layer the project's `release.templates`
/// over them; other builds fill the gaps from the resolved configuration.
pub fn resolve(project: &Project, config: &BuildConfig, release: bool) -> TemplateSet {
    let base = project.templates();

    let templates = if release {
        project.release_templates().with_defaults(&base)
    } else {
        base.with_defaults(&config.templates())
    };

    for name in templates.unreachable_names() {
        warn!("Template value '{}' can never be substituted: no {{{{name}}}} token matches it", name);
    }
    templates
}

fn key_to_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) => Some(stringify(key)),
        _ => None,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Tagged(tagged) => stringify(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => {
            serde_yaml::to_string(value).map(|s| s.trim_end().to_string()).unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(pairs: &[(&str, Value)]) -> TemplateSet {
        let mut set = TemplateSet::default();
        for (name, value) in pairs {
            set.insert(*name, value.clone());
        }
        set
    }

    #[test]
    fn test_substitute_replaces_all_occurrences() {
        let templates = set(&[("debug", Value::Bool(false)), ("name", Value::from("Seasons"))]);
        let out = templates.substitute("DEBUG = {{debug}}\n-- {{ name }} / {{name}}\n");
        assert_eq!(out, "DEBUG = false\n-- Seasons / Seasons\n");
    }

    #[test]
    fn test_substitute_leaves_unknown_tokens() {
        let templates = set(&[("a", Value::from(1))]);
        assert_eq!(templates.substitute("{{a}} {{b}}"), "1 {{b}}");
    }

    #[test]
    fn test_substitute_does_not_rescan_values() {
        let templates = set(&[("a", Value::from("{{b}}")), ("b", Value::from("x"))]);
        assert_eq!(templates.substitute("{{a}}"), "{{b}}");
    }

    #[test]
    fn test_substitute_accepts_any_name_without_braces() {
        let templates = set(&[
            ("my key", Value::from("spaced")),
            ("a:b", Value::from("colon")),
            ("größe", Value::from(3)),
        ]);
        assert_eq!(
            templates.substitute("{{my key}} {{ a:b }} {{größe}} {{a:c}}"),
            "spaced colon 3 {{a:c}}"
        );
    }

    #[test]
    fn test_unreachable_names() {
        let templates = set(&[
            ("ok", Value::from(1)),
            (" padded", Value::from(2)),
            ("a}b", Value::from(3)),
            ("", Value::from(4)),
        ]);
        let names: Vec<&str> = templates.unreachable_names().collect();
        assert_eq!(names, vec![" padded", "a}b", ""]);
        assert_eq!(templates.substitute("{{ padded}}"), "{{ padded}}");
    }

    #[test]
    fn test_stringify_scalars() {
        assert_eq!(stringify(&Value::Null), "");
        assert_eq!(stringify(&Value::from(1.5)), "1.5");
        assert_eq!(stringify(&Value::from("text")), "text");
    }
}
