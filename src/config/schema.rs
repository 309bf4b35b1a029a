use crate::chain::ChainGrammar;
use crate::fields::FieldTable;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

/// A set of rewrite profiles, as loaded from TOML.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ProfileSet {
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

/// Everything that varies between chain shapes: which calls open and close
/// a chain, how field setters map to key/value pairs, and what the rewrite
/// emits.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    /// Zero-argument calls that open a chain. Empty means the terminator
    /// opens its own chain.
    #[serde(default)]
    pub anchors: Vec<String>,
    pub terminators: Vec<TerminatorSpec>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    pub emit: Emit,
    /// Function that builds a message from a format string.
    #[serde(default = "default_format_function")]
    pub format_function: String,
    /// Import path `format_function` lives in.
    #[serde(default = "default_format_import")]
    pub format_import: Option<String>,
}

fn default_format_function() -> String {
    "fmt.Sprintf".to_string()
}

fn default_format_import() -> Option<String> {
    Some("fmt".to_string())
}

impl Profile {
    pub fn grammar(&self) -> Result<ChainGrammar, regex::Error> {
        ChainGrammar::new(&self.anchors, &self.terminators)
    }

    pub fn field_table(&self) -> FieldTable {
        FieldTable::from_specs(&self.fields)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TerminatorSpec {
    pub name: String,
    pub kind: TerminatorKind,
}

impl TerminatorSpec {
    pub fn new(name: &str, kind: TerminatorKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TerminatorKind {
    /// `Msg(message)`
    Plain,
    /// `Msgf(format, args...)`
    Format,
    /// `Send()`, an empty message
    Empty,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub methods: Vec<String>,
    pub rule: FieldRule,
}

impl FieldSpec {
    pub fn new(methods: &[&str], rule: FieldRule) -> Self {
        Self {
            methods: methods.iter().map(|m| m.to_string()).collect(),
            rule,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FieldRule {
    /// `Str("key", value)`: split at the first top-level comma.
    KeyValue,
    /// `Err(err)`: single argument under the fixed `"error"` key.
    Error,
}

/// Shape of the replacement text.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "style", rename_all = "kebab-case")]
pub enum Emit {
    /// `.Level(message, "k", v, ...)` named after the anchor.
    Flat,
    /// `.Message(message).Cause(err)`
    Builder { message: String, cause: String },
}

impl ProfileSet {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.profiles.is_empty() {
            issues.push(ValidationIssue::EmptyProfileList);
        }

        let mut seen = HashSet::new();
        for profile in &self.profiles {
            if !seen.insert(profile.name.as_str()) {
                issues.push(ValidationIssue::DuplicateProfile {
                    name: profile.name.clone(),
                });
            }
            profile.collect_issues(&mut issues);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

impl Profile {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        self.collect_issues(&mut issues);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    fn collect_issues(&self, issues: &mut Vec<ValidationIssue>) {
        let id = || {
            if self.name.trim().is_empty() {
                None
            } else {
                Some(self.name.clone())
            }
        };

        if self.name.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                profile: None,
                field: "name",
            });
        }
        if self.terminators.is_empty() {
            issues.push(ValidationIssue::MissingField {
                profile: id(),
                field: "terminators",
            });
        }

        let method_names = self
            .anchors
            .iter()
            .chain(self.terminators.iter().map(|t| &t.name))
            .chain(self.fields.iter().flat_map(|f| f.methods.iter()));
        for name in method_names {
            if !is_identifier(name) {
                issues.push(ValidationIssue::InvalidIdentifier {
                    profile: id(),
                    name: name.clone(),
                });
            }
        }

        for terminator in &self.terminators {
            if self.anchors.contains(&terminator.name) {
                issues.push(ValidationIssue::InvalidCombo {
                    profile: id(),
                    message: format!("`{}` is both an anchor and a terminator", terminator.name),
                });
            }
        }

        let mut field_methods = HashSet::new();
        for field in &self.fields {
            if field.methods.is_empty() {
                issues.push(ValidationIssue::MissingField {
                    profile: id(),
                    field: "fields.methods",
                });
            }
            for method in &field.methods {
                if !field_methods.insert(method.as_str()) {
                    issues.push(ValidationIssue::InvalidCombo {
                        profile: id(),
                        message: format!("field method `{method}` is mapped twice"),
                    });
                }
            }
        }

        match &self.emit {
            Emit::Flat => {
                if self.anchors.is_empty() {
                    issues.push(ValidationIssue::InvalidCombo {
                        profile: id(),
                        message: "flat emission requires anchors to name the call".to_string(),
                    });
                }
            }
            Emit::Builder { message, cause } => {
                for (field, value) in [("emit.message", message), ("emit.cause", cause)] {
                    if value.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            profile: id(),
                            field,
                        });
                    } else if !is_identifier(value) {
                        issues.push(ValidationIssue::InvalidIdentifier {
                            profile: id(),
                            name: value.clone(),
                        });
                    } else if self.terminators.iter().any(|t| &t.name == value) {
                        issues.push(ValidationIssue::InvalidCombo {
                            profile: id(),
                            message: format!("`{field}` emits terminator `{value}`"),
                        });
                    }
                }
            }
        }

        if self.format_function.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                profile: id(),
                field: "format_function",
            });
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut bytes = name.bytes();
    matches!(bytes.next(), Some(first) if first.is_ascii_alphabetic() || first == b'_')
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyProfileList,
    DuplicateProfile {
        name: String,
    },
    MissingField {
        profile: Option<String>,
        field: &'static str,
    },
    InvalidIdentifier {
        profile: Option<String>,
        name: String,
    },
    InvalidCombo {
        profile: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyProfileList => write!(f, "config contains no profiles"),
            ValidationIssue::DuplicateProfile { name } => {
                write!(f, "profile '{name}' is defined more than once")
            }
            ValidationIssue::MissingField { profile, field } => match profile {
                Some(name) => write!(f, "profile '{name}' missing required field '{field}'"),
                None => write!(f, "profile missing required field '{field}'"),
            },
            ValidationIssue::InvalidIdentifier { profile, name } => match profile {
                Some(profile) => {
                    write!(f, "profile '{profile}' uses invalid method name '{name}'")
                }
                None => write!(f, "invalid method name '{name}'"),
            },
            ValidationIssue::InvalidCombo { profile, message } => match profile {
                Some(name) => write!(f, "profile '{name}' has invalid configuration: {message}"),
                None => write!(f, "invalid profile configuration: {message}"),
            },
        }
    }
}
