pub mod builtin;
pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, select, with_builtins, ConfigError};
pub use schema::{
    Emit, FieldRule, FieldSpec, Profile, ProfileSet, TerminatorKind, TerminatorSpec,
    ValidationError, ValidationIssue,
};
