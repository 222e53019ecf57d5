//! Structural tests for layer boundary enforcement.
//!
//! These tests scan source files to verify that the hexagonal boundaries
//! hold: the domain stays pure, services talk to ports only, and all
//! user-facing output goes through the reporter and output layers.

use std::path::Path;

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Read a file and strip comment lines to avoid false positives.
fn read_non_comment_lines(path: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .filter(|l| {
            let trimmed = l.trim();
            !trimmed.starts_with("//") && !trimmed.starts_with("/*") && !trimmed.starts_with('*')
        })
        .map(String::from)
        .collect()
}

fn scan_for(dir: &Path, needles: &[&str], violations: &mut Vec<String>) {
    for file in collect_rs_files(dir) {
        let rel = file
            .strip_prefix(env!("CARGO_MANIFEST_DIR"))
            .unwrap_or(&file)
            .display()
            .to_string();
        for (i, line) in read_non_comment_lines(&file).iter().enumerate() {
            for needle in needles {
                if line.contains(needle) {
                    violations.push(format!("{rel}:{}: found `{needle}`: {line}", i + 1));
                }
            }
        }
    }
}

#[test]
fn domain_layer_imports_no_outer_layer() {
    let domain_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src").join("domain");

    let mut violations = Vec::new();
    scan_for(
        &domain_dir,
        &[
            "crate::application",
            "crate::infra",
            "crate::commands",
            "crate::output",
        ],
        &mut violations,
    );

    assert!(
        violations.is_empty(),
        "Domain must stay pure — no imports from outer layers:\n{}",
        violations.join("\n")
    );
}

#[test]
fn application_layer_depends_on_ports_not_adapters() {
    let app_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("application");

    let mut violations = Vec::new();
    scan_for(
        &app_dir,
        &["crate::infra", "crate::commands", "crate::output"],
        &mut violations,
    );

    assert!(
        violations.is_empty(),
        "Services must receive adapters through port traits:\n{}",
        violations.join("\n")
    );
}

#[test]
fn core_layers_never_print_directly() {
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");

    let mut violations = Vec::new();
    for dir in [src.join("domain"), src.join("application")] {
        scan_for(&dir, &["println!", "eprintln!"], &mut violations);
    }

    assert!(
        violations.is_empty(),
        "User-facing output belongs to the reporter and output layers:\n{}",
        violations.join("\n")
    );
}
