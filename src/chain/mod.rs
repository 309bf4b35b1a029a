//! Call-chain location and tokenization.
//!
//! A chain is a run of `.Name(args)` calls on one receiver, opened by an
//! anchor call (`.Info()`) and closed by a terminator (`.Msg("...")`).
//! [`StatementLocator`] finds the byte span of each chain and
//! [`tokenize`] splits a span into its call segments.

pub mod errors;
pub mod locator;
pub mod tokenizer;

pub use errors::ChainError;
pub use locator::{Candidate, SourceSpan, StatementLocator};
pub use tokenizer::{tokenize, CallSegment, Chain};

use crate::config::{TerminatorKind, TerminatorSpec};
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Anchor and terminator vocabulary of one profile, with the compiled
/// anchor pattern.
#[derive(Debug, Clone)]
pub struct ChainGrammar {
    anchors: HashSet<String>,
    terminators: HashMap<String, TerminatorKind>,
    anchor_pattern: Regex,
}

impl ChainGrammar {
    /// Build the grammar for a profile.
    ///
    /// With anchors, the pattern matches a zero-argument anchor call
    /// (`.Info()`). Without anchors, the terminator opens its own chain and
    /// the pattern matches `.Messagef(`. Whitespace may follow the `.`.
    pub fn new(anchors: &[String], terminators: &[TerminatorSpec]) -> Result<Self, regex::Error> {
        let anchor_pattern = if anchors.is_empty() {
            let names = alternation(terminators.iter().map(|t| t.name.as_str()));
            Regex::new(&format!(r"\.\s*(?:{names})\("))?
        } else {
            let names = alternation(anchors.iter().map(String::as_str));
            Regex::new(&format!(r"\.\s*(?:{names})\(\s*\)"))?
        };

        Ok(Self {
            anchors: anchors.iter().cloned().collect(),
            terminators: terminators
                .iter()
                .map(|t| (t.name.clone(), t.kind))
                .collect(),
            anchor_pattern,
        })
    }

    pub fn has_anchors(&self) -> bool {
        !self.anchors.is_empty()
    }

    pub fn is_anchor(&self, name: &str) -> bool {
        self.anchors.contains(name)
    }

    pub fn is_terminator(&self, name: &str) -> bool {
        self.terminators.contains_key(name)
    }

    pub fn terminator_kind(&self, name: &str) -> Option<TerminatorKind> {
        self.terminators.get(name).copied()
    }

    pub fn anchor_pattern(&self) -> &Regex {
        &self.anchor_pattern
    }
}

fn alternation<'n>(names: impl Iterator<Item = &'n str>) -> String {
    names.map(regex::escape).collect::<Vec<_>>().join("|")
}

pub(crate) fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}
