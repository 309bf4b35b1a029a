use crate::config::builtin::builtin_profiles;
use crate::config::schema::{Profile, ProfileSet, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
    UnknownProfile {
        name: String,
        suggestion: Option<String>,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read profile config from {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse profile config TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse profile config TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid profile config ({}): {}", path.display(), source),
                None => write!(f, "invalid profile config: {}", source),
            },
            ConfigError::UnknownProfile { name, suggestion } => match suggestion {
                Some(hint) => write!(f, "unknown profile '{name}' (did you mean '{hint}'?)"),
                None => write!(f, "unknown profile '{name}'"),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
            ConfigError::UnknownProfile { .. } => None,
        }
    }
}

pub fn load_from_str(input: &str) -> Result<ProfileSet, ConfigError> {
    let set: ProfileSet = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    set.validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(set)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<ProfileSet, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// Built-in profiles followed by `extra`, validated as one set so a config
/// cannot shadow a built-in name.
pub fn with_builtins(extra: ProfileSet) -> Result<ProfileSet, ConfigError> {
    let mut profiles = builtin_profiles();
    profiles.extend(extra.profiles);
    let set = ProfileSet { profiles };
    set.validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(set)
}

/// Pick profiles by name, in the requested order. An empty request selects
/// every profile in the set.
pub fn select(set: &ProfileSet, names: &[String]) -> Result<Vec<Profile>, ConfigError> {
    if names.is_empty() {
        return Ok(set.profiles.clone());
    }

    names
        .iter()
        .map(|name| {
            set.profiles
                .iter()
                .find(|p| &p.name == name)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownProfile {
                    name: name.clone(),
                    suggestion: closest_name(set, name),
                })
        })
        .collect()
}

fn closest_name(set: &ProfileSet, name: &str) -> Option<String> {
    set.profiles
        .iter()
        .map(|p| (strsim::jaro_winkler(&p.name, name), &p.name))
        .filter(|(score, _)| *score >= 0.8)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, candidate)| candidate.clone())
}
