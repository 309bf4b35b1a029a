//! End-to-end conversions through the public engine API.

use chain_rewriter::{builtin_profiles, ChainError, Engine, EngineOutput, Outcome};

fn engine() -> Engine {
    Engine::new(builtin_profiles()).unwrap()
}

fn convert(content: &str) -> EngineOutput {
    engine().rewrite(content).unwrap()
}

fn converted_text(content: &str) -> String {
    match convert(content).outcome {
        Outcome::Rewritten(text) => text,
        Outcome::Unchanged => content.to_string(),
    }
}

#[test]
fn test_single_field_chain() {
    assert_eq!(
        converted_text(r#"logger.Info().Str("user", u).Msg("login")"#),
        r#"logger.Info("login", "user", u)"#
    );
}

#[test]
fn test_multi_line_chain_with_error() {
    assert_eq!(
        converted_text("logger.Error()\n  .Err(err)\n  .Msg(\"failed\")"),
        r#"logger.Error("failed", "error", err)"#
    );
}

#[test]
fn test_trailing_dot_continuation() {
    let content = "\ts.log.Warn().\n\t\tStr(\"id\", id).\n\t\tMsg(\"retrying\")\n";
    assert_eq!(
        converted_text(content),
        "\ts.log.Warn(\"retrying\", \"id\", id)\n"
    );
}

#[test]
fn test_messagef_single_wrap() {
    assert_eq!(
        converted_text(r#"b.Messagef("save failed: %w", err)"#),
        r#"b.Message("save failed").Cause(err)"#
    );
}

#[test]
fn test_messagef_wrap_with_other_verbs() {
    let output = convert(r#"b.Messagef("save %s failed: %w", name, err)"#);
    assert_eq!(
        output.outcome,
        Outcome::Rewritten(r#"b.Message(fmt.Sprintf("save %s failed", name)).Cause(err)"#.to_string())
    );
    assert!(output.imports.contains("fmt"));
}

#[test]
fn test_missing_terminator_is_unchanged() {
    let content = "func f() {\n\tev := log.Info()\n\tev.Str(\"a\", b)\n}\n";
    let output = convert(content);
    assert_eq!(output.outcome, Outcome::Unchanged);
    assert!(output.rewrites.is_empty());
    assert!(output.skipped.is_empty());
}

#[test]
fn test_unknown_segment_passes_through() {
    let content = "log.Info().Str(\"a\", a).Caller().Msg(\"m\")\n";
    let output = convert(content);
    assert_eq!(output.outcome, Outcome::Unchanged);
    assert_eq!(
        output.skipped[0].error,
        ChainError::UnrecognizedField {
            method: "Caller".to_string()
        }
    );
}

#[test]
fn test_nested_arguments_with_commas() {
    let content = r#"log.Info().Str("k", fmt.Sprintf("%s,%s", a, strings.Join(xs, ", "))).Msg("ok")"#;
    assert_eq!(
        converted_text(content),
        r#"log.Info("ok", "k", fmt.Sprintf("%s,%s", a, strings.Join(xs, ", ")))"#
    );
}

#[test]
fn test_field_order_preserved_multi_line() {
    let content = "func f() {\n\tlog.Debug().Int(\"n\", n).Str(\"s\", s).Bool(\"ok\", ok).Msg(\"state\")\n}\n";
    assert_eq!(
        converted_text(content),
        "func f() {\n\tlog.Debug(\"state\",\n\t\t\"n\", n,\n\t\t\"s\", s,\n\t\t\"ok\", ok)\n}\n"
    );
}

#[test]
fn test_anchor_in_string_or_comment_ignored() {
    let content = "// log.Info().Msg(\"x\")\ns := \"log.Info().Msg(\\\"y\\\")\"\n";
    assert_eq!(convert(content).outcome, Outcome::Unchanged);
}

#[test]
fn test_messagef_without_wrap_untouched() {
    let content = "return errors.NewError().Messagef(\"bad id %d\", id).Build()\n";
    assert_eq!(convert(content).outcome, Outcome::Unchanged);
}

#[test]
fn test_ambiguous_cause_reported() {
    let output = convert(r#"b.Messagef("%w: saving %s", err, name)"#);
    assert_eq!(output.outcome, Outcome::Unchanged);
    assert!(matches!(
        output.skipped[0].error,
        ChainError::AmbiguousCause { .. }
    ));
}

#[test]
fn test_nested_chain_in_skipped_statement_untouched() {
    let content = "log.Info().Caller().Str(\"a\", sub.Warn().Msg(\"x\")).Msg(\"y\")\n";
    let output = convert(content);
    assert_eq!(output.outcome, Outcome::Unchanged);
    assert!(output.rewrites.is_empty());
    assert_eq!(output.skipped.len(), 1);
}

#[test]
fn test_nested_chain_in_rewritten_statement() {
    let content = "log.Info().Str(\"a\", sub.Warn().Msg(\"x\")).Msg(\"y\")\n";
    let once = converted_text(content);
    assert_eq!(once, "log.Info(\"y\", \"a\", sub.Warn(\"x\"))\n");
    assert_eq!(convert(&once).outcome, Outcome::Unchanged);
}

#[test]
fn test_spread_argument_not_paired_with_wrap() {
    let output = convert(r#"b.Messagef("failed: %w", errs...)"#);
    assert_eq!(output.outcome, Outcome::Unchanged);
    assert!(matches!(
        output.skipped[0].error,
        ChainError::MalformedFormat { .. }
    ));
}

#[test]
fn test_error_field_and_wrap_not_duplicated() {
    let output = convert(r#"log.Error().Err(e1).Msgf("x: %w", e2)"#);
    assert_eq!(output.outcome, Outcome::Unchanged);
    assert!(matches!(
        output.skipped[0].error,
        ChainError::AmbiguousCause { .. }
    ));
}

#[test]
fn test_anchor_after_trailing_dot() {
    assert_eq!(
        converted_text("logger.\n\tInfo().\n\tMsg(\"x\")\n"),
        "logger.Info(\"x\")\n"
    );
}

#[test]
fn test_crlf_line_endings_preserved() {
    let content = "func f() {\r\n\tlog.Debug().Int(\"n\", n).Str(\"s\", s).Msg(\"state\")\r\n}\r\n";
    assert_eq!(
        converted_text(content),
        "func f() {\r\n\tlog.Debug(\"state\",\r\n\t\t\"n\", n,\r\n\t\t\"s\", s)\r\n}\r\n"
    );
}

#[test]
fn test_rerun_is_noop() {
    let content = "package p\n\nfunc f() error {\n\tlog.Info().Str(\"a\", a).Int(\"b\", b).Msg(\"x\")\n\tlog.Warn().Msgf(\"%d%% done\", pct)\n\treturn errors.NewError().Messagef(\"load: %w\", err).Build()\n}\n";
    let once = converted_text(content);
    assert_ne!(once, content);
    assert_eq!(convert(&once).outcome, Outcome::Unchanged);
}
