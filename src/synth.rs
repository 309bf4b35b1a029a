//! Rewrite planning and serialization.
//!
//! [`plan`] turns a tokenized [`Chain`] into a [`RewritePlan`];
//! [`render`] turns the plan into replacement text for the chain's span.

use crate::chain::{CallSegment, Chain, ChainError};
use crate::config::{Emit, Profile, TerminatorKind};
use crate::fields::{Field, FieldTable, ERROR_KEY};
use crate::format::{is_literal_expr, FormatDirective, StringLiteral};
use crate::scan::split_arguments;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    /// Message plus key/value pairs.
    Flat,
    /// Message with an attached cause.
    MessagePlusCause,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewritePlan {
    pub kind: PlanKind,
    /// Message expression: a literal, an identifier, or a format call.
    pub message_text: String,
    pub fields: Vec<Field>,
    pub cause_expr: Option<String>,
    /// Imports the message expression relies on.
    pub imports: Vec<String>,
}

/// Profile data the synthesizer needs, borrowed from a compiled profile.
#[derive(Debug, Clone, Copy)]
pub struct SynthContext<'p> {
    pub profile: &'p Profile,
    pub fields: &'p FieldTable,
    pub terminator_kind: TerminatorKind,
}

/// Build the rewrite plan for `chain`.
///
/// `Ok(None)` means the chain is already in its target shape (a builder
/// `Messagef` without `%w`).
pub fn plan(chain: &Chain, ctx: SynthContext<'_>) -> Result<Option<RewritePlan>, ChainError> {
    let fields = chain
        .segments
        .iter()
        .map(|segment| ctx.fields.extract(segment))
        .collect::<Result<Vec<_>, _>>()?;

    let terminator = &chain.terminator;
    let args = split_arguments(&terminator.raw_args);

    let plan = match ctx.terminator_kind {
        TerminatorKind::Empty => {
            if !args.is_empty() {
                return Err(arity_error(terminator, "no arguments"));
            }
            flat(String::from("\"\""), fields)
        }
        TerminatorKind::Plain => match args.as_slice() {
            [message] if !message.is_empty() => flat(message.to_string(), fields),
            _ => return Err(arity_error(terminator, "exactly one argument")),
        },
        TerminatorKind::Format => {
            let Some((format, positional)) = args.split_first() else {
                return Err(arity_error(terminator, "a format string"));
            };
            let directive = FormatDirective::parse(format)?;
            if let Some(spread) = positional.iter().find(|arg| arg.ends_with("...")) {
                return Err(ChainError::malformed_format(
                    format,
                    format!("spread argument `{spread}` hides the argument count"),
                ));
            }
            if directive.verbs.len() != positional.len() {
                return Err(ChainError::malformed_format(
                    format,
                    format!(
                        "{} verb(s) but {} argument(s)",
                        directive.verbs.len(),
                        positional.len()
                    ),
                ));
            }

            match directive.wrap_index()? {
                None => match ctx.profile.emit {
                    Emit::Builder { .. } => return Ok(None),
                    Emit::Flat => {
                        let mut plan = flat(String::new(), fields);
                        plan.message_text =
                            message_expr(&directive.format_string, positional, ctx, &mut plan.imports);
                        plan
                    }
                },
                Some(idx) => {
                    if idx + 1 != directive.verbs.len() {
                        return Err(ChainError::AmbiguousCause {
                            message: format!("%w is not the final verb in {format}"),
                        });
                    }
                    let cause = positional[idx];
                    if is_literal_expr(cause) {
                        return Err(ChainError::AmbiguousCause {
                            message: format!("argument `{cause}` for %w is a literal"),
                        });
                    }
                    if ctx.profile.emit == Emit::Flat && fields.iter().any(|f| f.key == ERROR_KEY) {
                        return Err(ChainError::AmbiguousCause {
                            message: format!("%w in {format} duplicates the {ERROR_KEY} field"),
                        });
                    }

                    let mut imports = Vec::new();
                    let remaining = directive.without_verb(idx);
                    let message_text = message_expr(&remaining, &positional[..idx], ctx, &mut imports);
                    RewritePlan {
                        kind: PlanKind::MessagePlusCause,
                        message_text,
                        fields,
                        cause_expr: Some(cause.to_string()),
                        imports,
                    }
                }
            }
        }
    };

    Ok(Some(plan))
}

fn flat(message_text: String, fields: Vec<Field>) -> RewritePlan {
    RewritePlan {
        kind: PlanKind::Flat,
        message_text,
        fields,
        cause_expr: None,
        imports: Vec::new(),
    }
}

fn arity_error(segment: &CallSegment, expected: &str) -> ChainError {
    ChainError::malformed_chain(
        segment.start,
        format!("`{}` expects {expected}", segment.method_name),
    )
}

/// A literal when no verbs remain, otherwise a format call over `args`.
fn message_expr(
    literal: &StringLiteral,
    args: &[&str],
    ctx: SynthContext<'_>,
    imports: &mut Vec<String>,
) -> String {
    if args.is_empty() {
        return literal.unescape_percent().render();
    }
    if let Some(import) = &ctx.profile.format_import {
        imports.push(import.clone());
    }
    format!(
        "{}({}, {})",
        ctx.profile.format_function,
        literal.render(),
        args.join(", ")
    )
}

/// Replacement text for the whole chain span (anchor `.` through the
/// terminator's closing paren).
pub fn render(plan: &RewritePlan, chain: &Chain, profile: &Profile) -> String {
    match &profile.emit {
        Emit::Flat => {
            let method = chain
                .anchor
                .as_ref()
                .map_or(chain.terminator.method_name.as_str(), |a| a.method_name.as_str());
            let mut pairs: Vec<(&str, &str)> = plan
                .fields
                .iter()
                .map(|f| (f.key.as_str(), f.value_expr.as_str()))
                .collect();
            if let Some(cause) = &plan.cause_expr {
                pairs.push((ERROR_KEY, cause.as_str()));
            }
            render_flat(method, &plan.message_text, &pairs, chain)
        }
        Emit::Builder { message, cause } => match &plan.cause_expr {
            Some(cause_expr) => format!(
                ".{message}({}).{cause}({cause_expr})",
                plan.message_text
            ),
            None => format!(".{message}({})", plan.message_text),
        },
    }
}

fn render_flat(method: &str, message: &str, pairs: &[(&str, &str)], chain: &Chain) -> String {
    if pairs.len() <= 1 {
        let mut out = format!(".{method}({message}");
        for (key, value) in pairs {
            out.push_str(&format!(", {key}, {value}"));
        }
        out.push(')');
        return out;
    }

    let newline = chain.line_ending;
    let continuation = format!("{}\t", chain.indent);
    let lines: Vec<String> = pairs
        .iter()
        .map(|(key, value)| format!("{continuation}{key}, {value}"))
        .collect();
    format!(
        ".{method}({message},{newline}{})",
        lines.join(&format!(",{newline}"))
    ) + ")"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{tokenize, StatementLocator};
    use crate::config::builtin;

    fn rewrite(profile: &Profile, content: &str) -> Result<Option<String>, ChainError> {
        let grammar = profile.grammar().unwrap();
        let table = profile.field_table();
        let candidate = StatementLocator::new(content, &grammar).next().unwrap();
        let chain = tokenize(content, &candidate.span?, &grammar)?;
        let ctx = SynthContext {
            profile,
            fields: &table,
            terminator_kind: grammar.terminator_kind(&chain.terminator.method_name).unwrap(),
        };
        Ok(plan(&chain, ctx)?.map(|p| render(&p, &chain, profile)))
    }

    #[test]
    fn flat_single_field_inline() {
        let out = rewrite(
            &builtin::zerolog(),
            r#"logger.Info().Str("user", u).Msg("login")"#,
        );
        assert_eq!(out, Ok(Some(r#".Info("login", "user", u)"#.to_string())));
    }

    #[test]
    fn flat_without_fields() {
        let out = rewrite(&builtin::zerolog(), r#"log.Warn().Msg("careful")"#);
        assert_eq!(out, Ok(Some(r#".Warn("careful")"#.to_string())));
    }

    #[test]
    fn flat_many_fields_one_per_line() {
        let content = "\tlog.Info().Str(\"a\", x).Int(\"b\", y).Msg(\"m\")";
        let out = rewrite(&builtin::zerolog(), content).unwrap().unwrap();
        assert_eq!(out, ".Info(\"m\",\n\t\t\"a\", x,\n\t\t\"b\", y)");
    }

    #[test]
    fn send_is_empty_message() {
        let out = rewrite(&builtin::zerolog(), r#"log.Debug().Err(err).Send()"#);
        assert_eq!(out, Ok(Some(r#".Debug("", "error", err)"#.to_string())));
    }

    #[test]
    fn msgf_becomes_format_call() {
        let out = rewrite(
            &builtin::zerolog(),
            r#"log.Info().Msgf("loaded %d items", n)"#,
        );
        assert_eq!(
            out,
            Ok(Some(r#".Info(fmt.Sprintf("loaded %d items", n))"#.to_string()))
        );
    }

    #[test]
    fn msgf_with_wrap_appends_error_field() {
        let out = rewrite(
            &builtin::zerolog(),
            r#"log.Error().Msgf("load failed: %w", err)"#,
        );
        assert_eq!(
            out,
            Ok(Some(r#".Error("load failed", "error", err)"#.to_string()))
        );
    }

    #[test]
    fn builder_single_wrap() {
        let out = rewrite(&builtin::errors(), r#"b.Messagef("save failed: %w", err)"#);
        assert_eq!(
            out,
            Ok(Some(r#".Message("save failed").Cause(err)"#.to_string()))
        );
    }

    #[test]
    fn builder_wrap_with_other_verbs() {
        let out = rewrite(
            &builtin::errors(),
            r#"b.Messagef("save %s failed: %w", name, err)"#,
        );
        assert_eq!(
            out,
            Ok(Some(
                r#".Message(fmt.Sprintf("save %s failed", name)).Cause(err)"#.to_string()
            ))
        );
    }

    #[test]
    fn builder_without_wrap_is_left_alone() {
        let out = rewrite(&builtin::errors(), r#"b.Messagef("missing %s", name)"#);
        assert_eq!(out, Ok(None));
    }

    #[test]
    fn verb_count_mismatch() {
        let out = rewrite(&builtin::errors(), r#"b.Messagef("a %s: %w", err)"#);
        assert!(matches!(out, Err(ChainError::MalformedFormat { .. })));
    }

    #[test]
    fn wrap_not_last_is_flagged() {
        let out = rewrite(&builtin::errors(), r#"b.Messagef("%w while saving %s", err, name)"#);
        assert!(matches!(out, Err(ChainError::AmbiguousCause { .. })));
    }

    #[test]
    fn literal_cause_is_flagged() {
        let out = rewrite(&builtin::errors(), r#"b.Messagef("failed: %w", "oops")"#);
        assert!(matches!(out, Err(ChainError::AmbiguousCause { .. })));
    }

    #[test]
    fn spread_argument_is_malformed_format() {
        let out = rewrite(&builtin::errors(), r#"b.Messagef("failed: %w", errs...)"#);
        assert!(matches!(out, Err(ChainError::MalformedFormat { .. })));
    }

    #[test]
    fn error_field_and_wrap_conflict() {
        let out = rewrite(
            &builtin::zerolog(),
            r#"log.Error().Err(e1).Msgf("x: %w", e2)"#,
        );
        assert!(matches!(out, Err(ChainError::AmbiguousCause { .. })));

        let out = rewrite(
            &builtin::zerolog(),
            r#"log.Error().Str("error", e1).Msgf("x: %w", e2)"#,
        );
        assert!(matches!(out, Err(ChainError::AmbiguousCause { .. })));
    }

    #[test]
    fn multi_line_flat_keeps_crlf() {
        let content = "\tlog.Info().Str(\"a\", x).\r\n\t\tInt(\"b\", y).Msg(\"m\")\r\n";
        let out = rewrite(&builtin::zerolog(), content).unwrap().unwrap();
        assert_eq!(out, ".Info(\"m\",\r\n\t\t\"a\", x,\r\n\t\t\"b\", y)");
    }

    #[test]
    fn unknown_segment_blocks_rewrite() {
        let out = rewrite(
            &builtin::zerolog(),
            r#"log.Info().Caller().Str("a", b).Msg("m")"#,
        );
        assert!(matches!(out, Err(ChainError::UnrecognizedField { .. })));
    }

    #[test]
    fn imports_recorded_for_format_calls() {
        let profile = builtin::errors();
        let grammar = profile.grammar().unwrap();
        let table = profile.field_table();
        let content = r#"b.Messagef("save %s failed: %w", name, err)"#;
        let candidate = StatementLocator::new(content, &grammar).next().unwrap();
        let chain = tokenize(content, &candidate.span.unwrap(), &grammar).unwrap();
        let ctx = SynthContext {
            profile: &profile,
            fields: &table,
            terminator_kind: TerminatorKind::Format,
        };
        let plan = plan(&chain, ctx).unwrap().unwrap();
        assert_eq!(plan.kind, PlanKind::MessagePlusCause);
        assert_eq!(plan.imports, vec!["fmt".to_string()]);
        assert_eq!(plan.cause_expr.as_deref(), Some("err"));
    }
}
