//! Profiles compiled into the binary.

use crate::config::schema::{Emit, FieldRule, FieldSpec, Profile, TerminatorKind, TerminatorSpec};

/// Severity-level calls that open a zerolog chain.
pub const LOG_LEVELS: [&str; 4] = ["Debug", "Info", "Warn", "Error"];

/// zerolog chains (`log.Info().Str("k", v).Msg("m")`) to flat calls
/// (`log.Info("m", "k", v)`).
pub fn zerolog() -> Profile {
    Profile {
        name: "zerolog".to_string(),
        anchors: LOG_LEVELS.iter().map(|l| l.to_string()).collect(),
        terminators: vec![
            TerminatorSpec::new("Msg", TerminatorKind::Plain),
            TerminatorSpec::new("Msgf", TerminatorKind::Format),
            TerminatorSpec::new("Send", TerminatorKind::Empty),
        ],
        fields: vec![
            FieldSpec::new(&["Str", "Strs", "Stringer"], FieldRule::KeyValue),
            FieldSpec::new(
                &[
                    "Int", "Int8", "Int16", "Int32", "Int64", "Uint", "Uint8", "Uint16", "Uint32",
                    "Uint64", "Ints",
                ],
                FieldRule::KeyValue,
            ),
            FieldSpec::new(&["Float32", "Float64"], FieldRule::KeyValue),
            FieldSpec::new(&["Bool", "Bools"], FieldRule::KeyValue),
            FieldSpec::new(&["Dur", "Time"], FieldRule::KeyValue),
            FieldSpec::new(
                &["Interface", "Any", "RawJSON", "AnErr"],
                FieldRule::KeyValue,
            ),
            FieldSpec::new(&["Err"], FieldRule::Error),
        ],
        emit: Emit::Flat,
        format_function: "fmt.Sprintf".to_string(),
        format_import: Some("fmt".to_string()),
    }
}

/// Error-builder messages that wrap with `%w`
/// (`.Messagef("x: %w", err)`) to `.Message("x").Cause(err)`.
pub fn errors() -> Profile {
    Profile {
        name: "errors".to_string(),
        anchors: Vec::new(),
        terminators: vec![TerminatorSpec::new("Messagef", TerminatorKind::Format)],
        fields: Vec::new(),
        emit: Emit::Builder {
            message: "Message".to_string(),
            cause: "Cause".to_string(),
        },
        format_function: "fmt.Sprintf".to_string(),
        format_import: Some("fmt".to_string()),
    }
}

pub fn builtin_profiles() -> Vec<Profile> {
    vec![zerolog(), errors()]
}
