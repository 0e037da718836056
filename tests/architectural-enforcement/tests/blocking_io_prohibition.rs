//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: async functions in production code MUST NOT block the runtime.
//! **Required**: `tokio::io`, `tokio::net`, and async `reqwest` inside async code.
//!
//! Blocking calls remain acceptable in non-async functions (configuration is
//! loaded before the first turn runs) and in test code.

use architectural_enforcement::{
    async_fn_lines, production_lines, read_source, rust_sources, PRODUCTION_DIRS,
};

/// Patterns that block the calling thread
const BLOCKING_PATTERNS: &[(&str, &str)] = &[
    ("std::fs::", "Blocking file I/O"),
    ("std::net::", "Blocking network I/O"),
    ("std::thread::sleep", "Blocking sleep"),
    ("std::io::stdin()", "Blocking stdin"),
    ("std::io::stdout()", "Blocking stdout"),
    ("println!", "Blocking stdout"),
    ("print!", "Blocking stdout"),
    (".exists()", "Blocking file metadata"),
];

#[test]
fn test_no_blocking_io_in_async_code() {
    let mut violations = Vec::new();

    for dir in PRODUCTION_DIRS {
        for path in rust_sources(dir) {
            let lines = production_lines(&read_source(&path));
            for line in async_fn_lines(&lines) {
                for (pattern, kind) in BLOCKING_PATTERNS {
                    if line.code.contains(pattern) {
                        violations.push(format!(
                            "{}:{} - {kind}: {}",
                            path.display(),
                            line.number,
                            line.code.trim()
                        ));
                    }
                }
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Found {} blocking call(s) in async production code:\n{}",
        violations.len(),
        violations.join("\n")
    );
}

#[test]
fn test_no_blocking_http_client() {
    let mut violations = Vec::new();

    for dir in PRODUCTION_DIRS {
        for path in rust_sources(dir) {
            for line in production_lines(&read_source(&path)) {
                if line.code.contains("reqwest::blocking") {
                    violations.push(format!("{}:{}", path.display(), line.number));
                }
            }
        }
    }

    assert!(
        violations.is_empty(),
        "reqwest::blocking is not allowed:\n{}",
        violations.join("\n")
    );
}

#[test]
fn test_production_sources_are_scanned() {
    for dir in PRODUCTION_DIRS {
        assert!(
            !rust_sources(dir).is_empty(),
            "no sources found under {dir}; the scan would pass vacuously"
        );
    }
}
