//! Field setter extraction.
//!
//! Maps a chain segment such as `.Str("user", u)` to the key/value pair it
//! contributes to a flat call.

use crate::chain::{CallSegment, ChainError};
use crate::config::{FieldRule, FieldSpec};
use crate::scan::split_arguments;
use std::collections::HashMap;

/// Key used for pairs produced by error setters.
pub const ERROR_KEY: &str = "\"error\"";

/// A key/value pair, both as source expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub key: String,
    pub value_expr: String,
    /// Derived from an error setter rather than written by the author.
    pub synthetic: bool,
}

impl Field {
    pub fn error(value_expr: impl Into<String>) -> Self {
        Self {
            key: ERROR_KEY.to_string(),
            value_expr: value_expr.into(),
            synthetic: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FieldTable {
    rules: HashMap<String, FieldRule>,
}

impl FieldTable {
    pub fn from_specs(specs: &[FieldSpec]) -> Self {
        let rules = specs
            .iter()
            .flat_map(|spec| spec.methods.iter().map(|m| (m.clone(), spec.rule)))
            .collect();
        Self { rules }
    }

    pub fn rule(&self, method: &str) -> Option<FieldRule> {
        self.rules.get(method).copied()
    }

    /// Extract the pair a segment contributes.
    ///
    /// Unknown methods yield [`ChainError::UnrecognizedField`]; argument
    /// lists of the wrong arity yield [`ChainError::MalformedChain`].
    pub fn extract(&self, segment: &CallSegment) -> Result<Field, ChainError> {
        let rule = self
            .rule(&segment.method_name)
            .ok_or_else(|| ChainError::UnrecognizedField {
                method: segment.method_name.clone(),
            })?;

        let args = split_arguments(&segment.raw_args);
        match (rule, args.as_slice()) {
            (FieldRule::KeyValue, [key, value]) if !key.is_empty() && !value.is_empty() => {
                Ok(Field {
                    key: key.to_string(),
                    value_expr: value.to_string(),
                    synthetic: false,
                })
            }
            (FieldRule::Error, [value]) if !value.is_empty() => Ok(Field::error(*value)),
            _ => Err(ChainError::malformed_chain(
                segment.start,
                format!(
                    "`{}` expects {} argument(s), found {}",
                    segment.method_name,
                    if rule == FieldRule::Error { 1 } else { 2 },
                    args.len()
                ),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::builtin;

    fn segment(name: &str, args: &str) -> CallSegment {
        CallSegment {
            method_name: name.to_string(),
            raw_args: args.to_string(),
            start: 0,
            end: 0,
        }
    }

    #[test]
    fn key_value_split_at_first_top_level_comma() {
        let table = builtin::zerolog().field_table();
        let field = table
            .extract(&segment("Str", "\"ids\", strings.Join(ids, \", \")"))
            .unwrap();
        assert_eq!(field.key, "\"ids\"");
        assert_eq!(field.value_expr, "strings.Join(ids, \", \")");
        assert!(!field.synthetic);
    }

    #[test]
    fn error_setter_is_synthetic() {
        let table = builtin::zerolog().field_table();
        let field = table.extract(&segment("Err", " err ")).unwrap();
        assert_eq!(field, Field::error("err"));
    }

    #[test]
    fn unknown_method() {
        let table = builtin::zerolog().field_table();
        assert_eq!(
            table.extract(&segment("Caller", "")),
            Err(ChainError::UnrecognizedField {
                method: "Caller".to_string()
            })
        );
    }

    #[test]
    fn wrong_arity() {
        let table = builtin::zerolog().field_table();
        assert!(matches!(
            table.extract(&segment("Str", "\"only-key\"")),
            Err(ChainError::MalformedChain { .. })
        ));
        assert!(matches!(
            table.extract(&segment("Err", "a, b")),
            Err(ChainError::MalformedChain { .. })
        ));
    }
}
