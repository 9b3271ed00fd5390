//! Property-based testing for isy
//!
//! Uses proptest to verify invariants of context building, fingerprinting
//! and tree copies across randomly generated project trees.

use ::isy::context::render_file_block;
use ::isy::*;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Generate random file paths
///
/// Directory names never contain a dot and file names always do, so a path
/// can never be both a file and a directory.
fn path_strategy() -> impl Strategy<Value = PathBuf> {
    let dir_strategy = prop::collection::vec("[a-z]{1,8}", 0..=3);
    let filename_strategy = "[a-z]{1,8}\\.(txt|rs|md|go)";

    (dir_strategy, filename_strategy).prop_map(|(dirs, filename)| {
        let mut path = PathBuf::new();
        for dir in dirs {
            path.push(dir);
        }
        path.join(filename)
    })
}

/// Generate random text content, including empty and newline-terminated files
fn content_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 {}();]{0,80}",
        prop::collection::vec("[a-zA-Z0-9 ]{0,40}", 1..20).prop_map(|lines| lines.join("\n")),
        prop::collection::vec("[a-z]{0,10}", 1..5).prop_map(|lines| lines.join("\n") + "\n"),
    ]
}

/// Generate a project as a map of relative path to content
fn project_strategy() -> impl Strategy<Value = BTreeMap<PathBuf, String>> {
    prop::collection::btree_map(path_strategy(), content_strategy(), 0..25)
}

/// Materialize a project on disk
fn write_project(root: &Path, files: &BTreeMap<PathBuf, String>) -> anyhow::Result<()> {
    for (path, content) in files {
        let full_path = root.join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(full_path, content)?;
    }
    Ok(())
}

/// Undo the line numbering of one rendered file block
fn strip_block(block: &str) -> Option<String> {
    let body = block
        .split_once("----- CONTENT -----\n")?
        .1
        .strip_suffix("----- END FILE -----\n\n")?;
    let body = body.strip_suffix('\n')?;

    let mut lines = Vec::new();
    for (idx, line) in body.split('\n').enumerate() {
        lines.push(line.strip_prefix(&format!("{}: ", idx + 1))?);
    }
    Some(lines.join("\n"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A snapshot always hashes to the same fingerprint as its source
    #[test]
    fn copy_preserves_fingerprint(files in project_strategy()) {
        let temp_dir = TempDir::new().unwrap();
        write_project(temp_dir.path(), &files).unwrap();

        let snapshot = temp_dir.path().join(".isy/branches/prop");
        let stats = copy_tree(temp_dir.path(), &snapshot).unwrap();

        prop_assert_eq!(stats.files, files.len());
        prop_assert_eq!(fingerprint(&snapshot).unwrap(), fingerprint(temp_dir.path()).unwrap());
        for (path, content) in &files {
            prop_assert_eq!(&fs::read_to_string(snapshot.join(path)).unwrap(), content);
        }
    }

    /// Building twice over an unchanged tree yields identical documents
    #[test]
    fn context_is_idempotent(files in project_strategy()) {
        let temp_dir = TempDir::new().unwrap();
        write_project(temp_dir.path(), &files).unwrap();
        let manifest = temp_dir.path().join(".isycontext");
        fs::write(&manifest, "*.rs\n*.md\n").unwrap();

        let info = ProjectInfo::new("prop", "Property test");
        let first = build_context(temp_dir.path(), &manifest, &info).unwrap();
        let second = build_context(temp_dir.path(), &manifest, &info).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Extension patterns select exactly the files with that extension
    #[test]
    fn extension_pattern_selects_matching_files(files in project_strategy()) {
        let temp_dir = TempDir::new().unwrap();
        write_project(temp_dir.path(), &files).unwrap();
        let manifest = temp_dir.path().join(".isycontext");
        fs::write(&manifest, "*.go\n").unwrap();

        let report = ContextBuilder::new(temp_dir.path(), &manifest, ProjectInfo::default())
            .build()
            .unwrap();

        let selected: BTreeSet<PathBuf> = report.files.iter().cloned().collect();
        let expected: BTreeSet<PathBuf> = files
            .keys()
            .filter(|p| p.extension().is_some_and(|e| e == "go"))
            .cloned()
            .collect();
        prop_assert_eq!(selected, expected);
        prop_assert!(report.skipped.is_empty());
    }

    /// Line numbering is lossless and numbers every `\n`-separated line
    #[test]
    fn file_block_numbering_round_trips(content in content_strategy()) {
        let block = render_file_block("src/lib.rs", &content);
        let numbered = block
            .lines()
            .filter(|l| l.split_once(": ").is_some_and(|(n, _)| n.parse::<usize>().is_ok()))
            .count();

        prop_assert_eq!(numbered, content.split('\n').count());
        prop_assert_eq!(strip_block(&block), Some(content.clone()));
    }

    /// Changing any file's content changes the fingerprint
    #[test]
    fn content_change_changes_fingerprint(
        files in project_strategy().prop_filter("non-empty", |f| !f.is_empty()),
        pick in any::<prop::sample::Index>(),
    ) {
        let temp_dir = TempDir::new().unwrap();
        write_project(temp_dir.path(), &files).unwrap();
        let before = fingerprint(temp_dir.path()).unwrap();

        let (path, content) = files.iter().nth(pick.index(files.len())).unwrap();
        fs::write(temp_dir.path().join(path), format!("{}!", content)).unwrap();

        prop_assert_ne!(before, fingerprint(temp_dir.path()).unwrap());
    }
}
