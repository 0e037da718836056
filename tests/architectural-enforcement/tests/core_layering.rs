//! Integration Test: Core Layering
//!
//! **Policy**: `streamchat-core` is headless. Presentation, CLI parsing, and
//! subscriber setup belong to surfaces such as `streamchat-repl`.
//! **Policy**: core production code returns errors instead of panicking.

use architectural_enforcement::{production_lines, read_source, rust_sources, workspace_root};

/// Crates the core must not depend on
const SURFACE_CRATES: &[&str] = &[
    "clap",
    "tracing-subscriber",
    "anyhow",
    "ratatui",
    "crossterm",
];

/// Dependency names declared in a manifest's `[dependencies]` table
fn dependency_names(manifest: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut in_dependencies = false;

    for line in manifest.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_dependencies = line == "[dependencies]";
            continue;
        }
        if !in_dependencies || line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((name, _)) = line.split_once('=') {
            names.push(name.trim().to_string());
        }
    }

    names
}

#[test]
fn test_core_has_no_surface_dependencies() {
    let manifest = read_source(&workspace_root().join("chat/core/Cargo.toml"));
    let names = dependency_names(&manifest);
    assert!(!names.is_empty(), "core manifest has no dependencies table");

    let forbidden: Vec<&String> = names
        .iter()
        .filter(|name| SURFACE_CRATES.contains(&name.as_str()))
        .collect();

    assert!(
        forbidden.is_empty(),
        "streamchat-core depends on surface crates: {forbidden:?}"
    );
}

#[test]
fn test_core_never_installs_a_subscriber() {
    for path in rust_sources("chat/core/src") {
        for line in production_lines(&read_source(&path)) {
            assert!(
                !line.code.contains("tracing_subscriber"),
                "{}:{} installs logging; leave that to the binary",
                path.display(),
                line.number
            );
        }
    }
}

#[test]
fn test_core_production_code_does_not_panic_on_errors() {
    let mut violations = Vec::new();

    for path in rust_sources("chat/core/src") {
        for line in production_lines(&read_source(&path)) {
            if line.code.contains(".unwrap()") || line.code.contains(".expect(") {
                violations.push(format!(
                    "{}:{} - {}",
                    path.display(),
                    line.number,
                    line.code.trim()
                ));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "unwrap/expect in core production code:\n{}",
        violations.join("\n")
    );
}

#[test]
fn test_dependency_names_reads_only_dependencies_table() {
    let manifest = "\
[package]
name = \"x\"

[dependencies]
# comment
tokio = { version = \"1\" }
serde = \"1\"

[dev-dependencies]
tempfile = \"3\"
";
    assert_eq!(dependency_names(manifest), vec!["tokio", "serde"]);
}
