//! The rewrite engine: runs every profile over a buffer and collects the
//! result.
//!
//! Profiles run one after another, each over the previous profile's output.
//! Within a pass, statements are rewritten left to right and never overlap.

use crate::chain::{tokenize, ChainError, ChainGrammar, StatementLocator};
use crate::config::Profile;
use crate::edit::{apply_to_string, Edit, EditError};
use crate::fields::FieldTable;
use crate::synth::{self, SynthContext};
use std::collections::BTreeSet;

/// A profile with its grammar and field table built once.
#[derive(Debug, Clone)]
pub struct CompiledProfile {
    pub profile: Profile,
    pub grammar: ChainGrammar,
    pub fields: FieldTable,
}

impl CompiledProfile {
    pub fn new(profile: Profile) -> Result<Self, regex::Error> {
        Ok(Self {
            grammar: profile.grammar()?,
            fields: profile.field_table(),
            profile,
        })
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }
}

/// Immutable and shareable across threads.
#[derive(Debug, Clone)]
pub struct Engine {
    profiles: Vec<CompiledProfile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Unchanged,
    Rewritten(String),
}

/// One statement that was converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedRewrite {
    /// 1-based line of the statement in the text its pass saw.
    pub line: usize,
    pub profile: String,
    pub before: String,
    pub after: String,
}

/// One located statement that was left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedStatement {
    pub line: usize,
    pub offset: usize,
    pub profile: String,
    pub error: ChainError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutput {
    pub outcome: Outcome,
    pub rewrites: Vec<AppliedRewrite>,
    pub skipped: Vec<SkippedStatement>,
    /// Import paths the rewritten text relies on.
    pub imports: BTreeSet<String>,
}

impl EngineOutput {
    pub fn is_changed(&self) -> bool {
        matches!(self.outcome, Outcome::Rewritten(_))
    }

    /// Required imports whose quoted path does not appear in `content`.
    pub fn missing_imports<'a>(&'a self, content: &str) -> Vec<&'a str> {
        self.imports
            .iter()
            .filter(|import| !content.contains(&format!("\"{import}\"")))
            .map(String::as_str)
            .collect()
    }
}

impl Engine {
    pub fn new(profiles: Vec<Profile>) -> Result<Self, regex::Error> {
        let profiles = profiles
            .into_iter()
            .map(CompiledProfile::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { profiles })
    }

    pub fn profiles(&self) -> &[CompiledProfile] {
        &self.profiles
    }

    /// Rewrite every recognized chain in `content`.
    ///
    /// Statement-level failures never fail the call; they are reported in
    /// [`EngineOutput::skipped`]. An `Err` means an internally produced edit
    /// did not apply.
    pub fn rewrite(&self, content: &str) -> Result<EngineOutput, EditError> {
        let mut current = content.to_string();
        let mut rewrites = Vec::new();
        let mut skipped = Vec::new();
        let mut imports = BTreeSet::new();

        for compiled in &self.profiles {
            // Chains nested in a rewritten statement surface on the next
            // pass. Every rewrite consumes an anchor, so this terminates.
            loop {
                let pass = run_pass(compiled, &current, &mut imports);
                rewrites.extend(pass.rewrites);
                if pass.edits.is_empty() {
                    skipped.extend(pass.skipped);
                    break;
                }
                current = apply_to_string(&current, pass.edits)?;
            }
        }

        let outcome = if current == content {
            Outcome::Unchanged
        } else {
            Outcome::Rewritten(current)
        };
        Ok(EngineOutput {
            outcome,
            rewrites,
            skipped,
            imports,
        })
    }
}

#[derive(Default)]
struct Pass {
    edits: Vec<Edit>,
    rewrites: Vec<AppliedRewrite>,
    skipped: Vec<SkippedStatement>,
}

fn run_pass(compiled: &CompiledProfile, content: &str, imports: &mut BTreeSet<String>) -> Pass {
    let lines = LineIndex::new(content);
    let mut pass = Pass::default();
    let mut locator = StatementLocator::new(content, &compiled.grammar);

    while let Some(candidate) = locator.next() {
        let line = lines.line_of(candidate.anchor_start);
        let skip = |error: ChainError| {
            tracing::debug!(
                profile = compiled.name(),
                line,
                kind = error.kind(),
                "skipping statement: {error}"
            );
            SkippedStatement {
                line,
                offset: candidate.anchor_start,
                profile: compiled.name().to_string(),
                error,
            }
        };

        let span = match candidate.span {
            Ok(span) => span,
            Err(error) => {
                pass.skipped.push(skip(error));
                continue;
            }
        };
        let planned = tokenize(content, &span, &compiled.grammar).and_then(|chain| {
            let terminator_kind = compiled
                .grammar
                .terminator_kind(&chain.terminator.method_name)
                .ok_or_else(|| {
                    ChainError::malformed_chain(chain.terminator.start, "unknown terminator")
                })?;
            let ctx = SynthContext {
                profile: &compiled.profile,
                fields: &compiled.fields,
                terminator_kind,
            };
            let planned = synth::plan(&chain, ctx)?;
            Ok(planned.map(|plan| {
                let replacement = synth::render(&plan, &chain, &compiled.profile);
                (replacement, plan, chain)
            }))
        });

        match planned {
            Ok(Some((replacement, plan, chain))) => {
                tracing::debug!(profile = compiled.name(), line, "rewriting statement");
                pass.rewrites.push(AppliedRewrite {
                    line,
                    profile: compiled.name().to_string(),
                    before: format!("{}{}", chain.anchor_prefix, span.text),
                    after: format!("{}{}", chain.anchor_prefix, replacement),
                });
                imports.extend(plan.imports);
                pass.edits
                    .push(Edit::new(span.start, span.end, replacement, span.text));
                locator.resume_at(span.end);
            }
            Ok(None) => locator.resume_at(span.end),
            Err(error) => {
                // Chains nested in a skipped statement stay untouched too.
                pass.skipped.push(skip(error));
                locator.resume_at(span.end);
            }
        }
    }

    pass
}

/// Byte offset to 1-based line number.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(content: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        Self { starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|start| *start <= offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::builtin;

    fn engine() -> Engine {
        Engine::new(builtin::builtin_profiles()).unwrap()
    }

    fn rewritten(content: &str) -> String {
        match engine().rewrite(content).unwrap().outcome {
            Outcome::Rewritten(text) => text,
            Outcome::Unchanged => content.to_string(),
        }
    }

    #[test]
    fn line_index() {
        let index = LineIndex::new("a\nb\n\nc");
        assert_eq!(index.line_of(0), 1);
        assert_eq!(index.line_of(2), 2);
        assert_eq!(index.line_of(4), 3);
        assert_eq!(index.line_of(5), 4);
    }

    #[test]
    fn multiple_statements_left_to_right() {
        let content = "func f() {\n\tlog.Info().Msg(\"a\")\n\tlog.Warn().Str(\"k\", v).Msg(\"b\")\n}\n";
        let output = engine().rewrite(content).unwrap();
        assert_eq!(
            output.outcome,
            Outcome::Rewritten(
                "func f() {\n\tlog.Info(\"a\")\n\tlog.Warn(\"b\", \"k\", v)\n}\n".to_string()
            )
        );
        let lines: Vec<usize> = output.rewrites.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![2, 3]);
        assert_eq!(output.rewrites[0].before, "log.Info().Msg(\"a\")");
        assert_eq!(output.rewrites[0].after, "log.Info(\"a\")");
    }

    #[test]
    fn skipped_statement_keeps_text_and_scan_continues() {
        let content = "log.Info().Caller().Msg(\"a\")\nlog.Info().Msg(\"b\")\n";
        let output = engine().rewrite(content).unwrap();
        assert_eq!(
            output.outcome,
            Outcome::Rewritten("log.Info().Caller().Msg(\"a\")\nlog.Info(\"b\")\n".to_string())
        );
        assert_eq!(output.skipped.len(), 1);
        assert_eq!(output.skipped[0].line, 1);
        assert_eq!(output.skipped[0].error.kind(), "unrecognized-field");
    }

    #[test]
    fn imports_collected_and_checked() {
        let content = "b.Messagef(\"save %s: %w\", name, err)\n";
        let output = engine().rewrite(content).unwrap();
        assert!(output.imports.contains("fmt"));
        let Outcome::Rewritten(text) = &output.outcome else {
            panic!("expected a rewrite");
        };
        assert_eq!(output.missing_imports(text), vec!["fmt"]);
        assert!(output
            .missing_imports("import \"fmt\"\n")
            .is_empty());
    }

    #[test]
    fn both_profiles_in_one_buffer() {
        let content = "log.Error().Err(err).Msg(\"x\")\nreturn errors.NewError().Messagef(\"y: %w\", err).Build()\n";
        assert_eq!(
            rewritten(content),
            "log.Error(\"x\", \"error\", err)\nreturn errors.NewError().Message(\"y\").Cause(err).Build()\n"
        );
    }

    #[test]
    fn converted_text_is_stable() {
        let content = "log.Info().Str(\"a\", x).Int(\"b\", y).Msg(\"m\")\nb.Messagef(\"z: %w\", err)\n";
        let once = rewritten(content);
        assert_eq!(rewritten(&once), once);
    }

    #[test]
    fn nested_chain_inside_skipped_statement_is_untouched() {
        let content = "log.Info().Caller().Str(\"a\", sub.Warn().Msg(\"x\")).Msg(\"y\")\n";
        let output = engine().rewrite(content).unwrap();
        assert_eq!(output.outcome, Outcome::Unchanged);
        assert!(output.rewrites.is_empty());
        assert_eq!(output.skipped.len(), 1);
        assert_eq!(output.skipped[0].error.kind(), "unrecognized-field");
    }

    #[test]
    fn nested_chain_inside_rewritten_statement_converges() {
        let content = "log.Info().Str(\"a\", sub.Warn().Msg(\"x\")).Msg(\"y\")\n";
        let output = engine().rewrite(content).unwrap();
        let expected = "log.Info(\"y\", \"a\", sub.Warn(\"x\"))\n";
        assert_eq!(output.outcome, Outcome::Rewritten(expected.to_string()));
        assert_eq!(output.rewrites.len(), 2);
        assert_eq!(engine().rewrite(expected).unwrap().outcome, Outcome::Unchanged);
    }

    #[test]
    fn unbalanced_arguments_are_skipped() {
        let content = "log.Info().Msg(\"a\"\n";
        let output = engine().rewrite(content).unwrap();
        assert_eq!(output.outcome, Outcome::Unchanged);
    }
}
