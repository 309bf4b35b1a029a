//! Chain Rewriter: statement-level conversion of fluent call chains
//!
//! Rewrites builder-style logging statements such as
//! `logger.Info().Str("user", u).Msg("login")` into flat key/value calls
//! (`logger.Info("login", "user", u)`), and error builders using
//! `Messagef("...: %w", err)` into `.Message("...").Cause(err)`.
//!
//! # Architecture
//!
//! - [`scan`]: delimiter-aware byte scanning that respects string, rune, and
//!   comment context
//! - [`chain`]: locating chain statements and splitting them into segments
//! - [`fields`] and [`format`]: setter-to-pair mapping and printf analysis
//! - [`synth`]: planning and rendering the replacement text
//! - [`engine`]: running profiles over a buffer through verified [`Edit`]s
//! - [`driver`]: batch conversion of files on disk
//!
//! What a chain looks like and what it becomes is data: a [`Profile`].
//!
//! # Example
//!
//! ```
//! use chain_rewriter::{builtin_profiles, Engine, Outcome};
//!
//! let engine = Engine::new(builtin_profiles()).unwrap();
//! let output = engine
//!     .rewrite(r#"logger.Info().Str("user", u).Msg("login")"#)
//!     .unwrap();
//!
//! assert_eq!(
//!     output.outcome,
//!     Outcome::Rewritten(r#"logger.Info("login", "user", u)"#.to_string())
//! );
//! ```

pub mod chain;
pub mod config;
pub mod driver;
pub mod edit;
pub mod engine;
pub mod fields;
pub mod format;
pub mod report;
pub mod scan;
pub mod synth;

// Re-exports
pub use chain::ChainError;
pub use config::builtin::builtin_profiles;
pub use config::{load_from_path, load_from_str, ConfigError, Profile, ProfileSet};
pub use driver::{process_file, run_batch, DriverError, FileOutcome};
pub use edit::{Edit, EditError, EditVerification};
pub use engine::{Engine, EngineOutput, Outcome};
