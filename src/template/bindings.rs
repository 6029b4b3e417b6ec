//! Variable bindings for templates.

use std::collections::BTreeMap;

use serde_yaml::{Mapping, Value};

/// Flat, dotted-key variable bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    values: BTreeMap<String, String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bind every `(name, value)` pair as `<prefix>.<name>`.
    pub fn extend_prefixed<K, V>(&mut self, prefix: &str, pairs: impl IntoIterator<Item = (K, V)>)
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in pairs {
            self.insert(format!("{}.{}", prefix, key.as_ref()), value);
        }
    }

    /// Bind the process environment as `env.<NAME>`.
    pub fn with_process_env(mut self) -> Self {
        self.extend_prefixed("env", std::env::vars());
        self
    }

    /// Flatten a YAML value under `prefix`: mapping keys become dotted
    /// segments, sequence items become numeric segments, scalars are bound
    /// as text.
    pub fn extend_yaml(&mut self, prefix: &str, value: &Value) {
        match value {
            Value::Mapping(map) => {
                for (key, child) in map {
                    if let Some(key) = scalar_text(key) {
                        self.extend_yaml(&format!("{}.{}", prefix, key), child);
                    }
                }
            }
            Value::Sequence(items) => {
                for (index, child) in items.iter().enumerate() {
                    self.extend_yaml(&format!("{}.{}", prefix, index), child);
                }
            }
            Value::Tagged(tagged) => self.extend_yaml(prefix, &tagged.value),
            scalar => {
                if let Some(text) = scalar_text(scalar) {
                    self.insert(prefix, text);
                }
            }
        }
    }

    /// Rebuild a nested YAML mapping from the dotted keys.
    pub fn to_yaml(&self) -> Value {
        let mut root = Mapping::new();
        for (key, value) in &self.values {
            let parts: Vec<&str> = key.split('.').collect();
            insert_path(&mut root, &parts, value);
        }
        Value::Mapping(root)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

fn insert_path(map: &mut Mapping, parts: &[&str], value: &str) {
    let Some((head, rest)) = parts.split_first() else {
        return;
    };
    let key = Value::String(head.to_string());
    if rest.is_empty() {
        map.insert(key, Value::String(value.to_string()));
        return;
    }
    if !map.get(&key).is_some_and(Value::is_mapping) {
        map.insert(key.clone(), Value::Mapping(Mapping::new()));
    }
    if let Some(Value::Mapping(child)) = map.get_mut(&key) {
        insert_path(child, rest, value);
    }
}
