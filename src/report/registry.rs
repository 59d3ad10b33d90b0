// Formatter registry - explicit name to constructor table

use std::collections::BTreeMap;

use super::{
    DocumentationFormatter, Formatter, JsonFormatter, JunitFormatter, Output, ProgressFormatter,
    StreamingJsonFormatter,
};
use crate::error::ConfigError;

/// Builds a formatter for a registered name and an already opened output
pub type FormatterConstructor = Box<dyn Fn(&str, Output) -> Box<dyn Formatter> + Send + Sync>;

/// Name to constructor table, populated before the run starts
pub struct FormatterRegistry {
    entries: BTreeMap<String, FormatterConstructor>,
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl FormatterRegistry {
    /// Registry without any formatter
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registry holding the built-in formatters and their short aliases
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for name in ["p", "progress"] {
            registry.register(name, |name, output| {
                Box::new(ProgressFormatter::new(name, output))
            });
        }
        for name in ["d", "documentation"] {
            registry.register(name, |name, output| {
                Box::new(DocumentationFormatter::new(name, output))
            });
        }
        for name in ["j", "json"] {
            registry.register(name, |name, output| {
                Box::new(JsonFormatter::new(name, output))
            });
        }
        registry.register("junit", |name, output| {
            Box::new(JunitFormatter::new(name, output))
        });
        for name in ["stream", "ndjson"] {
            registry.register(name, |name, output| {
                Box::new(StreamingJsonFormatter::new(name, output))
            });
        }
        registry
    }

    /// Add or replace a formatter kind
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&str, Output) -> Box<dyn Formatter> + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Box::new(constructor));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Fail with a configuration error when `name` is not registered
    pub fn ensure_known(&self, name: &str) -> Result<(), ConfigError> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(ConfigError::UnknownFormatter(
                name.to_string(),
                self.names().join(", "),
            ))
        }
    }

    /// Construct the formatter registered under `name`
    pub fn create(&self, name: &str, output: Output) -> Result<Box<dyn Formatter>, ConfigError> {
        let constructor = self.entries.get(name).ok_or_else(|| {
            ConfigError::UnknownFormatter(name.to_string(), self.names().join(", "))
        })?;
        Ok(constructor(name, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Capability, SharedBuffer};

    #[test]
    fn test_builtin_aliases() {
        let registry = FormatterRegistry::with_builtins();
        for name in ["p", "progress", "d", "documentation", "j", "json", "junit", "stream"] {
            assert!(registry.contains(name), "missing {}", name);
        }
    }

    #[test]
    fn test_unknown_formatter_is_config_error() {
        let registry = FormatterRegistry::with_builtins();
        let err = registry.ensure_known("Fuubar").expect_err("unknown");
        match err {
            ConfigError::UnknownFormatter(name, available) => {
                assert_eq!(name, "Fuubar");
                assert!(available.contains("progress"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_create_keeps_registered_name() {
        let registry = FormatterRegistry::with_builtins();
        let formatter = registry
            .create("d", Output::writer("buf", SharedBuffer::new()))
            .expect("create");
        assert_eq!(formatter.name(), "d");
        assert!(formatter.supports(Capability::GroupStarted));
    }

    #[test]
    fn test_register_custom_formatter() {
        struct Silent;
        impl Formatter for Silent {
            fn name(&self) -> &str {
                "silent"
            }
            fn capabilities(&self) -> &'static [Capability] {
                &[]
            }
        }

        let mut registry = FormatterRegistry::empty();
        registry.register("silent", |_, _| Box::new(Silent));
        assert_eq!(registry.names(), ["silent"]);
        assert!(registry.ensure_known("progress").is_err());
    }
}
