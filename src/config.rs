//! Engine configuration.
//!
//! A [`Config`] is consumed once at engine construction. Different
//! configurations (different envelope field names, say) belong to different
//! engine instances; there is no process-wide state.

use std::collections::HashMap;

/// Configuration options consumed by the codec core.
#[derive(Debug, Clone)]
pub struct Config {
    /// Discriminator field name in dynamic-type envelopes.
    pub type_field: String,
    /// Key field name in non-string-keyed map entries.
    pub key_field: String,
    /// Value field name in dynamic envelopes and non-string-keyed map entries.
    pub value_field: String,
    /// If true, unknown object fields fail the decode instead of being skipped.
    pub fail_on_unknown_fields: bool,
    /// The minimum event lookahead every adapter must honour.
    ///
    /// Dynamic-envelope detection inspects events 0 through 3; adapters in
    /// this crate peek without bound, so the default of 3 is a floor for
    /// third-party adapters, not a ceiling the core relies on.
    pub max_parser_lookahead: usize,
    class_to_name: HashMap<String, String>,
    name_to_class: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            type_field: "@type".to_string(),
            key_field: "@key".to_string(),
            value_field: "@value".to_string(),
            fail_on_unknown_fields: false,
            max_parser_lookahead: 3,
            class_to_name: HashMap::new(),
            name_to_class: HashMap::new(),
        }
    }
}

impl Config {
    /// A configuration with the default envelope field names.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the discriminator field name (default `"@type"`).
    pub fn with_type_field(mut self, name: impl Into<String>) -> Self {
        self.type_field = name.into();
        self
    }

    /// Override the map-entry key field name (default `"@key"`).
    pub fn with_key_field(mut self, name: impl Into<String>) -> Self {
        self.key_field = name.into();
        self
    }

    /// Override the envelope/map-entry value field name (default `"@value"`).
    pub fn with_value_field(mut self, name: impl Into<String>) -> Self {
        self.value_field = name.into();
        self
    }

    /// Fail decodes on unknown object fields instead of skipping them.
    pub fn with_fail_on_unknown_fields(mut self, fail: bool) -> Self {
        self.fail_on_unknown_fields = fail;
        self
    }

    /// Register a bidirectional alias: `class` is written as `wire_name` in
    /// dynamic-type envelopes, and `wire_name` resolves back to `class`.
    ///
    /// Aliases give wire names cross-process stability when in-process type
    /// names differ between producer and consumer.
    pub fn with_alias(
        mut self,
        class: impl Into<String>,
        wire_name: impl Into<String>,
    ) -> Self {
        let class = class.into();
        let wire = wire_name.into();
        self.class_to_name.insert(class.clone(), wire.clone());
        self.name_to_class.insert(wire, class);
        self
    }

    /// The wire name a class is written under; identity when unaliased.
    pub fn wire_name<'a>(&'a self, class: &'a str) -> &'a str {
        self.class_to_name.get(class).map_or(class, String::as_str)
    }

    /// The class a wire name resolves to; identity when unaliased.
    pub fn class_for<'a>(&'a self, wire_name: &'a str) -> &'a str {
        self.name_to_class
            .get(wire_name)
            .map_or(wire_name, String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::new();
        assert_eq!(cfg.type_field, "@type");
        assert_eq!(cfg.key_field, "@key");
        assert_eq!(cfg.value_field, "@value");
        assert!(!cfg.fail_on_unknown_fields);
        assert_eq!(cfg.max_parser_lookahead, 3);
    }

    #[test]
    fn aliases_are_bidirectional() {
        let cfg = Config::new().with_alias("interop::Circle", "Circle");
        assert_eq!(cfg.wire_name("interop::Circle"), "Circle");
        assert_eq!(cfg.class_for("Circle"), "interop::Circle");
        assert_eq!(cfg.wire_name("Square"), "Square");
        assert_eq!(cfg.class_for("Square"), "Square");
    }
}
