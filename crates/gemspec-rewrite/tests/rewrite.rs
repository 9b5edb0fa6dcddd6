//! End-to-end rewrite tests

use gemspec_rewrite::{
    Category, DependencyRequest, EvaluationContext, ManifestEditor, ManifestSnapshot, MethodKind,
    QuoteStyle, RewriteConfig, RewriteError, RewriteSession, SessionState, SnapshotEvaluator,
};
use std::panic::{catch_unwind, AssertUnwindSafe};

const LABEL: &str = "demo.gemspec";

fn rewrite<F>(source: &str, instructions: F) -> Result<String, RewriteError>
where
    F: FnOnce(&mut dyn ManifestEditor) -> Result<(), RewriteError>,
{
    RewriteSession::default().rewrite(source, LABEL, instructions)
}

fn manifest(body: &str) -> String {
    format!("Gem::Specification.new do |spec|\n{}end\n", body)
}

#[test]
fn test_add_to_configured_single_segment_constructor() {
    let source = "Block.new do |spec|\n  spec.name = 'foo'\nend\n";
    let config = RewriteConfig::default().with_constructor("Block");
    let output = RewriteSession::new(config)
        .rewrite(source, LABEL, |editor| {
            editor.add_dependency("bar", &[">= 1.0"])
        })
        .unwrap();
    assert_eq!(
        output,
        "Block.new do |spec|\n  spec.name = 'foo'\n  spec.add_dependency 'bar', '>= 1.0'\nend\n"
    );
}

#[test]
fn test_update_existing_requirement() {
    let source = manifest("  spec.name = 'foo-tool'\n  spec.add_dependency 'foo', '>= 0.9'\n");
    let output = rewrite(&source, |editor| editor.add_dependency("foo", &[">= 1.0"])).unwrap();
    assert_eq!(
        output,
        manifest("  spec.name = 'foo-tool'\n  spec.add_dependency 'foo', '>= 1.0'\n")
    );
}

#[test]
fn test_generic_request_keeps_runtime_verb() {
    let source = manifest("  spec.add_runtime_dependency 'foo', '>= 0.9'\n");
    let output = rewrite(&source, |editor| editor.add_dependency("foo", &[">= 1.0"])).unwrap();
    assert_eq!(
        output,
        manifest("  spec.add_runtime_dependency 'foo', '>= 1.0'\n")
    );

    let source = manifest("  spec.add_dependency 'foo', '>= 0.9'\n");
    let output =
        rewrite(&source, |editor| editor.add_runtime_dependency("foo", &["~> 2"])).unwrap();
    assert_eq!(output, manifest("  spec.add_dependency 'foo', '~> 2'\n"));
}

#[test]
fn test_category_conflict_fails_without_force() {
    let source = manifest("  spec.add_runtime_dependency 'foo', '>= 0.9'\n");
    let err = rewrite(&source, |editor| {
        editor.add_development_dependency("foo", &[">= 1.0"])
    })
    .unwrap_err();

    assert_eq!(
        err,
        RewriteError::TypeConflict {
            gem: "foo".to_string(),
            existing: Category::Runtime,
            requested: Category::Development,
        }
    );
    let message = err.to_string();
    assert!(message.contains("RUNTIME"));
    assert!(message.contains("DEVELOPMENT"));
    assert!(message.contains("foo"));
}

#[test]
fn test_forced_category_change_uses_requested_verb() {
    let source = manifest("  spec.add_runtime_dependency 'foo', '>= 0.9'\n");
    let output = rewrite(&source, |editor| {
        editor.upsert_dependency(
            DependencyRequest::new("foo", [">= 1.0"])
                .with_kind(MethodKind::Development)
                .forced(true),
        )
    })
    .unwrap();
    assert_eq!(
        output,
        manifest("  spec.add_development_dependency 'foo', '>= 1.0'\n")
    );
}

#[test]
fn test_remove_leaves_no_blank_line() {
    let source = manifest(
        "  spec.add_dependency 'bar', '>= 0.9'\n  spec.add_dependency 'baz', '>= 1.0'\n",
    );
    let output = rewrite(&source, |editor| editor.remove_dependency("bar")).unwrap();
    assert_eq!(output, manifest("  spec.add_dependency 'baz', '>= 1.0'\n"));
}

#[test]
fn test_remove_missing_dependency_is_noop() {
    let source = manifest("  spec.add_dependency 'baz', '>= 1.0'\n");
    let output = rewrite(&source, |editor| editor.remove_dependency("nope")).unwrap();
    assert_eq!(output, source);
}

#[test]
fn test_remove_takes_trailing_comment() {
    let source = manifest("  spec.name = 'x'\n  spec.add_dependency 'bar', '1' # pinned\n  spec.version = '1'\n");
    let output = rewrite(&source, |editor| editor.remove_dependency("bar")).unwrap();
    assert_eq!(output, manifest("  spec.name = 'x'\n  spec.version = '1'\n"));
}

#[test]
fn test_repeated_upsert_in_one_session_is_idempotent() {
    let source = manifest("  spec.name = 'foo'\n");
    let once = rewrite(&source, |editor| editor.add_dependency("bar", &["~> 1"])).unwrap();
    let twice = rewrite(&source, |editor| {
        editor.add_dependency("bar", &["~> 1"])?;
        editor.add_dependency("bar", &["~> 1"])
    })
    .unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_upsert_across_sessions_is_idempotent() {
    let source = manifest("  spec.add_dependency \"foo\", \">= 0.9\"\n  spec.name = 'x'\n");
    let first = rewrite(&source, |editor| {
        editor.add_dependency("foo", &[">= 1.0"])?;
        editor.add_dependency("bar", &["~> 2"])
    })
    .unwrap();
    let second = rewrite(&first, |editor| {
        editor.add_dependency("foo", &[">= 1.0"])?;
        editor.add_dependency("bar", &["~> 2"])
    })
    .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_quote_and_parentheses_are_preserved() {
    let source = manifest(
        "  spec.add_dependency \"foo\", \">= 0.9\"\n  spec.add_dependency('zed', '1')\n",
    );
    let output = rewrite(&source, |editor| {
        editor.add_dependency("foo", &[">= 1.0"])?;
        editor.add_dependency("zed", &["2", "< 3"])
    })
    .unwrap();
    assert_eq!(
        output,
        manifest(
            "  spec.add_dependency \"foo\", \">= 1.0\"\n  spec.add_dependency('zed', '2', '< 3')\n"
        )
    );
}

#[test]
fn test_every_duplicate_is_updated_and_removed() {
    let source = manifest(
        "  spec.add_dependency 'foo', '1'\n  spec.name = 'x'\n  spec.add_dependency \"foo\", '2'\n",
    );
    let updated = rewrite(&source, |editor| editor.add_dependency("foo", &["3"])).unwrap();
    assert_eq!(
        updated,
        manifest(
            "  spec.add_dependency 'foo', '3'\n  spec.name = 'x'\n  spec.add_dependency \"foo\", \"3\"\n"
        )
    );

    let removed = rewrite(&source, |editor| editor.remove_dependency("foo")).unwrap();
    assert_eq!(removed, manifest("  spec.name = 'x'\n"));
}

#[test]
fn test_conflict_in_any_duplicate_blocks_all() {
    let source = manifest(
        "  spec.add_dependency 'foo', '1'\n  spec.add_development_dependency 'foo', '2'\n",
    );
    let err = rewrite(&source, |editor| editor.add_dependency("foo", &["3"])).unwrap_err();
    assert!(matches!(err, RewriteError::TypeConflict { .. }));
}

#[test]
fn test_add_to_empty_block() {
    let source = "Gem::Specification.new do |spec|\nend\n";
    let output = rewrite(source, |editor| editor.add_dependency("bar", &[">= 1.0"])).unwrap();
    assert_eq!(
        output,
        "Gem::Specification.new do |spec|\n  spec.add_dependency 'bar', '>= 1.0'\nend\n"
    );
}

#[test]
fn test_add_uses_receiver_name_and_indentation() {
    let source = "module Demo\n  Gem::Specification.new do |s|\n      s.name = 'demo'\n  end\nend\n";
    let output = rewrite(source, |editor| {
        assert_eq!(editor.receiver_name(), "s");
        editor.add_development_dependency("rake", &["~> 13.0"])
    })
    .unwrap();
    assert_eq!(
        output,
        "module Demo\n  Gem::Specification.new do |s|\n      s.name = 'demo'\n      s.add_development_dependency 'rake', '~> 13.0'\n  end\nend\n"
    );
}

#[test]
fn test_remove_then_add_last_statement() {
    let source = manifest("  spec.add_dependency 'a', '1'\n");
    let output = rewrite(&source, |editor| {
        editor.remove_dependency("a")?;
        editor.add_dependency("b", &["2"])
    })
    .unwrap();
    assert_eq!(output, manifest("  spec.add_dependency 'b', '2'\n"));
}

#[test]
fn test_crlf_line_endings() {
    let source = "Gem::Specification.new do |spec|\r\n  spec.name = 'x'\r\n  spec.add_dependency 'a', '1'\r\nend\r\n";
    let output = rewrite(source, |editor| {
        editor.remove_dependency("a")?;
        editor.add_dependency("b", &["2"])
    })
    .unwrap();
    assert_eq!(
        output,
        "Gem::Specification.new do |spec|\r\n  spec.name = 'x'\r\n  spec.add_dependency 'b', '2'\r\nend\r\n"
    );
}

#[test]
fn test_non_literal_and_nested_statements_are_untouched() {
    let source = manifest(
        "  spec.add_dependency \"foo-#{x}\", '1'\n  if ENV['CI']\n    spec.add_dependency 'foo', '1'\n  end\n",
    );
    let output = rewrite(&source, |editor| editor.add_dependency("foo", &["2"])).unwrap();
    assert_eq!(
        output,
        manifest(
            "  spec.add_dependency \"foo-#{x}\", '1'\n  if ENV['CI']\n    spec.add_dependency 'foo', '1'\n  end\n  spec.add_dependency 'foo', '2'\n"
        )
    );
}

#[test]
fn test_attribute_operations() {
    let source = manifest(
        "  spec.name = \"demo\"\n  spec.summary = \"Old summary\"\n  spec.license = 'MIT'\n",
    );
    let output = rewrite(&source, |editor| {
        editor.set_string_attribute("summary", "New summary")?;
        editor.set_attribute("version", "Demo::VERSION")?;
        editor.remove_attribute("license")
    })
    .unwrap();
    assert_eq!(
        output,
        manifest(
            "  spec.name = \"demo\"\n  spec.summary = \"New summary\"\n  spec.version = Demo::VERSION\n"
        )
    );
}

#[test]
fn test_new_string_attribute_uses_configured_quote() {
    let source = manifest("  spec.name = 'demo'\n");
    let config = RewriteConfig::default().with_quote(QuoteStyle::Double);
    let output = RewriteSession::new(config)
        .rewrite(&source, LABEL, |editor| {
            editor.set_string_attribute("homepage", "https://example.org")
        })
        .unwrap();
    assert_eq!(
        output,
        manifest("  spec.name = 'demo'\n  spec.homepage = \"https://example.org\"\n")
    );
}

#[test]
fn test_invalid_instructions() {
    let source = manifest("  spec.name = 'demo'\n");
    let cases: Vec<Box<dyn Fn(&mut dyn ManifestEditor) -> Result<(), RewriteError>>> = vec![
        Box::new(|editor: &mut dyn ManifestEditor| editor.add_dependency("", &["1"])),
        Box::new(|editor: &mut dyn ManifestEditor| editor.add_dependency("foo", &[])),
        Box::new(|editor: &mut dyn ManifestEditor| editor.add_dependency("foo", &[" "])),
        Box::new(|editor: &mut dyn ManifestEditor| editor.set_attribute("", "1")),
        Box::new(|editor: &mut dyn ManifestEditor| editor.set_attribute("summary", "")),
        Box::new(|editor: &mut dyn ManifestEditor| editor.set_attribute("summary", "(1 +")),
        Box::new(|editor: &mut dyn ManifestEditor| editor.remove_attribute("Not-A-Name")),
    ];
    for case in cases {
        let err = rewrite(&source, |editor| case(editor)).unwrap_err();
        assert!(
            matches!(err, RewriteError::InvalidInstruction(_)),
            "unexpected error: {err}"
        );
    }
}

#[test]
fn test_ignored_failure_still_fails_session() {
    let source = manifest("  spec.name = 'demo'\n");
    let err = rewrite(&source, |editor| {
        let _ = editor.add_dependency("", &["1"]);
        editor.add_dependency("ok", &["1"])
    })
    .unwrap_err();
    assert_eq!(err.kind(), "invalid_instruction");
}

#[test]
fn test_missing_block_is_a_structure_error() {
    let err = rewrite("puts 'no manifest here'\n", |_| Ok(())).unwrap_err();
    assert!(matches!(err, RewriteError::Structure { ref label, .. } if label == LABEL));

    let err = rewrite("Gem::Specification.new do |a, b|\nend\n", |_| Ok(())).unwrap_err();
    assert!(matches!(err, RewriteError::Structure { .. }));
}

#[test]
fn test_broken_source_is_a_syntax_error() {
    let err = rewrite("Gem::Specification.new do |spec|\n  spec.name = 'x'\n", |_| Ok(()))
        .unwrap_err();
    match err {
        RewriteError::Syntax(diagnostic) => {
            assert_eq!(diagnostic.label, LABEL);
            assert!(diagnostic.line >= 1);
        }
        other => panic!("expected syntax error, got {other:?}"),
    }
}

#[test]
fn test_no_instructions_returns_source_unchanged() {
    let source = "# header\nGem::Specification.new do |spec|\n    spec.name   =   'odd spacing'   # keep\nend\n";
    assert_eq!(rewrite(source, |_| Ok(())).unwrap(), source);
}

#[test]
fn test_session_state_transitions() {
    let mut session = RewriteSession::default();
    assert_eq!(session.state(), SessionState::Idle);

    let source = manifest("  spec.name = 'demo'\n");
    session.rewrite(&source, LABEL, |_| Ok(())).unwrap();
    assert_eq!(session.state(), SessionState::Done);

    assert!(session.rewrite("nothing", LABEL, |_| Ok(())).is_err());
    assert_eq!(session.state(), SessionState::Failed);

    session.rewrite(&source, LABEL, |_| Ok(())).unwrap();
    assert_eq!(session.state(), SessionState::Done);
}

#[test]
fn test_session_refuses_reentry_after_panicking_callback() {
    let mut session = RewriteSession::default();
    let source = manifest("  spec.name = 'demo'\n");

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        session.rewrite(&source, LABEL, |_| panic!("callback blew up"))
    }));
    assert!(outcome.is_err());
    assert_eq!(session.state(), SessionState::AwaitingInstructions);

    let err = session.rewrite(&source, LABEL, |_| Ok(())).unwrap_err();
    assert!(matches!(err, RewriteError::InternalInvariant(_)));
}

#[test]
fn test_snapshot_reaches_callback() {
    let source = manifest(
        "  spec.name = 'demo'\n  spec.version = '1.2.3'\n  spec.add_dependency 'rack', '>= 2'\n",
    );
    let snapshot = RewriteSession::default().inspect(&source, LABEL).unwrap();
    assert_eq!(snapshot.name.as_deref(), Some("demo"));
    assert_eq!(snapshot.version.as_deref(), Some("1.2.3"));
    assert_eq!(snapshot.dependencies.len(), 1);
    assert_eq!(snapshot.dependencies[0].kind, MethodKind::Generic);
}

struct FixedEvaluator;

impl SnapshotEvaluator for FixedEvaluator {
    fn evaluate(&self, context: &EvaluationContext<'_, '_>) -> Result<ManifestSnapshot, RewriteError> {
        Ok(ManifestSnapshot {
            name: Some(format!("{}:{}", context.label(), context.catalog().len())),
            version: Some(format!("{} lines", context.source().lines().count())),
            ..ManifestSnapshot::default()
        })
    }
}

#[test]
fn test_custom_snapshot_evaluator() {
    let source = manifest("  spec.name = 'demo'\n");
    let mut session = RewriteSession::with_evaluator(RewriteConfig::default(), FixedEvaluator);
    let output = session
        .rewrite(&source, LABEL, |editor| {
            assert_eq!(editor.snapshot().name.as_deref(), Some("demo.gemspec:1"));
            assert_eq!(editor.snapshot().version.as_deref(), Some("3 lines"));
            Ok(())
        })
        .unwrap();
    assert_eq!(output, source);
}

const HEREDOC_BODY: &str =
    "  spec.name = 'x'\n  spec.description = <<~DESC\n    Long text\n  DESC\n";

#[test]
fn test_remove_heredoc_attribute_takes_body() {
    let source = manifest(HEREDOC_BODY);
    let output = rewrite(&source, |editor| editor.remove_attribute("description")).unwrap();
    assert_eq!(output, manifest("  spec.name = 'x'\n"));
}

#[test]
fn test_set_heredoc_attribute_drops_body() {
    let source = manifest(HEREDOC_BODY);
    let output = rewrite(&source, |editor| {
        editor.set_string_attribute("description", "short")
    })
    .unwrap();
    assert_eq!(
        output,
        manifest("  spec.name = 'x'\n  spec.description = 'short'\n")
    );
}

#[test]
fn test_set_heredoc_attribute_keeps_neighbors() {
    let source = manifest(
        "  spec.description = <<~DESC # about\n    Long text\n  DESC\n  spec.add_dependency 'rack', '>= 1'\n",
    );
    let output = rewrite(&source, |editor| {
        editor.set_attribute("description", "Demo::DESCRIPTION")?;
        editor.add_dependency("rack", &[">= 2"])
    })
    .unwrap();
    assert_eq!(
        output,
        manifest(
            "  spec.description = Demo::DESCRIPTION # about\n  spec.add_dependency 'rack', '>= 2'\n"
        )
    );
}

#[test]
fn test_remove_dependency_after_heredoc() {
    let source = manifest(&format!(
        "{}  spec.add_dependency 'rack', '>= 1'\n",
        HEREDOC_BODY
    ));
    let output = rewrite(&source, |editor| editor.remove_dependency("rack")).unwrap();
    assert_eq!(output, manifest(HEREDOC_BODY));
}

#[test]
fn test_escaped_gem_name_updates_in_place() {
    let source = manifest("  spec.add_dependency \"we\\\"ird\", '>= 1'\n");
    let output = rewrite(&source, |editor| editor.add_dependency("we\"ird", &[">= 2"])).unwrap();
    assert_eq!(
        output,
        manifest("  spec.add_dependency \"we\\\"ird\", \">= 2\"\n")
    );
}

#[test]
fn test_uncataloged_declaration_is_never_removed() {
    let source = manifest("  spec.add_dependency 'foo'\n");
    let output = rewrite(&source, |editor| editor.remove_dependency("foo")).unwrap();
    assert_eq!(output, source);
}
