//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce the workspace's
//! layering rules:
//! - The core crate stays headless (no terminal, CLI, or subscriber crates)
//! - Async code performs no blocking I/O
//! - Core production code propagates errors instead of panicking
//!
//! The helpers below give the tests a crude but dependable view of the
//! sources: test modules and comments are stripped, and async function bodies
//! are located by brace counting.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Production source directories checked by the tests
pub const PRODUCTION_DIRS: &[&str] = &["chat/core/src", "chat/repl/src"];

/// A source line with its 1-based line number
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLine {
    pub number: usize,
    pub code: String,
}

/// Root of the workspace
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// All `.rs` files below `dir` (relative to the workspace root)
#[must_use]
pub fn rust_sources(dir: &str) -> Vec<PathBuf> {
    let root = workspace_root().join(dir);
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Read a file, returning an empty string if it cannot be read
#[must_use]
pub fn read_source(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

/// Lines of production code
///
/// Everything from the first `#[cfg(test)]` on is dropped, as are comments.
#[must_use]
pub fn production_lines(content: &str) -> Vec<SourceLine> {
    let mut lines = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed == "#[cfg(test)]" {
            break;
        }
        if trimmed.starts_with("//") {
            continue;
        }

        let code = strip_trailing_comment(line);
        if code.trim().is_empty() {
            continue;
        }
        lines.push(SourceLine {
            number: idx + 1,
            code: code.to_string(),
        });
    }

    lines
}

/// Drop a trailing `// ...` comment, leaving `://` in URLs alone
fn strip_trailing_comment(line: &str) -> &str {
    let mut search = 0;
    while let Some(pos) = line[search..].find("//") {
        let at = search + pos;
        if at > 0 && line.as_bytes()[at - 1] == b':' {
            search = at + 2;
            continue;
        }
        return &line[..at];
    }
    line
}

/// Lines that belong to the bodies of `async fn`s
#[must_use]
pub fn async_fn_lines(lines: &[SourceLine]) -> Vec<SourceLine> {
    let mut inside = Vec::new();
    let mut in_async = false;
    let mut opened = false;
    let mut depth: i32 = 0;

    for line in lines {
        if !in_async && line.code.contains("async fn ") {
            in_async = true;
            opened = false;
            depth = 0;
        }
        if !in_async {
            continue;
        }

        for c in line.code.chars() {
            match c {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        inside.push(line.clone());

        // Trait declarations have no body
        if !opened && line.code.trim_end().ends_with(';') {
            in_async = false;
        }
        if opened && depth <= 0 {
            in_async = false;
        }
    }

    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let source = "fn a() {}\n// note\nconst URL: &str = \"http://x\"; // trailing\n#[cfg(test)]\nmod tests {}\n";
        let lines = production_lines(source);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[1].code, "const URL: &str = \"http://x\"; ");
    }

    #[test]
    fn test_async_fn_lines() {
        let source = "\
fn sync() {
    a();
}
async fn run() {
    if x {
        b();
    }
}
async fn declared(&self) -> u8;
fn after() {
    c();
}
";
        let lines = production_lines(source);
        let body: Vec<usize> = async_fn_lines(&lines).iter().map(|l| l.number).collect();

        assert_eq!(body, vec![4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_workspace_root_has_manifest() {
        assert!(workspace_root().join("Cargo.toml").exists());
    }
}
