//! Main test module for isy
//!
//! This module includes all test suites:
//! - Integration tests for end-to-end scenarios
//! - Property-based tests for invariants

pub mod integration;
pub mod property;

#[cfg(test)]
mod edge_cases {
    use ::isy::*;
    use sha2::{Digest, Sha256};
    use std::fs;
    use tempfile::TempDir;

    fn info() -> ProjectInfo {
        ProjectInfo::new("edge", "Edge cases")
    }

    #[test]
    fn test_empty_project() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(".isycontext"), "*.rs\n").unwrap();

        let report = ContextBuilder::new(temp_dir.path(), temp_dir.path().join(".isycontext"), info())
            .build()
            .unwrap();
        assert!(report.files.is_empty());
        assert!(report.document.ends_with(
            "----- END PROJECT TREE -----\n\n----- END CONTEXT -----\n\n"
        ));

        // Only the manifest itself is hashed
        assert_eq!(
            fingerprint(temp_dir.path()).unwrap(),
            hex::encode(Sha256::digest(b"*.rs\n"))
        );
    }

    #[test]
    fn test_special_filenames() {
        let temp_dir = TempDir::new().unwrap();
        let manifest = temp_dir.path().join(".isycontext");
        fs::write(&manifest, "*.txt\n").unwrap();

        let special_names = vec![
            "file with spaces.txt",
            "file-with-dashes.txt",
            "file.multiple.dots.txt",
            "UPPERCASE.txt",
            "unicode_文件.txt",
        ];
        for name in &special_names {
            fs::write(temp_dir.path().join(name), format!("content of {}", name)).unwrap();
        }

        let report = ContextBuilder::new(temp_dir.path(), &manifest, info()).build().unwrap();
        assert_eq!(report.merged_count(), special_names.len());
        for name in &special_names {
            assert!(report.document.contains(&format!("FILE: {}\n", name)), "{}", name);
            assert!(report.document.contains(&format!("1: content of {}\n", name)));
        }

        // Snapshots handle the same names
        let snapshot = temp_dir.path().join(".isy/branches/special");
        let stats = copy_tree(temp_dir.path(), &snapshot).unwrap();
        assert_eq!(stats.files, special_names.len() + 1);
        assert_eq!(fingerprint(&snapshot).unwrap(), fingerprint(temp_dir.path()).unwrap());
    }

    #[test]
    fn test_non_utf8_content_is_merged_lossily() {
        let temp_dir = TempDir::new().unwrap();
        let manifest = temp_dir.path().join(".isycontext");
        fs::write(&manifest, "*.bin\n").unwrap();
        fs::write(temp_dir.path().join("blob.bin"), [b'o', b'k', 0xff, b'\n', b'z']).unwrap();

        let document = build_context(temp_dir.path(), &manifest, &info()).unwrap();
        assert!(document.contains("1: ok\u{fffd}\n2: z\n"));
    }

    #[test]
    fn test_crlf_lines_keep_carriage_return() {
        let temp_dir = TempDir::new().unwrap();
        let manifest = temp_dir.path().join(".isycontext");
        fs::write(&manifest, "*.txt\r\n").unwrap();
        fs::write(temp_dir.path().join("dos.txt"), "a\r\nb").unwrap();

        let document = build_context(temp_dir.path(), &manifest, &info()).unwrap();
        assert!(document.contains("1: a\r\n2: b\n"));
    }

    #[test]
    fn test_comment_only_manifest_selects_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let manifest = temp_dir.path().join(".isycontext");
        fs::write(&manifest, "# Add your file patterns here\n\n").unwrap();
        fs::write(temp_dir.path().join("main.rs"), "fn main() {}").unwrap();

        let report = ContextBuilder::new(temp_dir.path(), &manifest, info()).build().unwrap();
        assert!(report.files.is_empty());
        assert!(!report.document.contains("START FILE"));
    }

    #[test]
    fn test_deeply_nested_paths() {
        let temp_dir = TempDir::new().unwrap();
        let manifest = temp_dir.path().join(".isycontext");
        fs::write(&manifest, "deep.rs\n").unwrap();

        let mut dir = temp_dir.path().to_path_buf();
        for i in 0..20 {
            dir = dir.join(format!("level{}", i));
        }
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("deep.rs"), "// bottom").unwrap();

        let report = ContextBuilder::new(temp_dir.path(), &manifest, info()).build().unwrap();
        assert_eq!(report.files.len(), 1);
        assert!(report.document.contains("level19/deep.rs\n"));
        assert!(report.document.contains("└── deep.rs\n"));
    }

    #[test]
    fn test_errors_carry_actionable_messages() {
        let temp_dir = TempDir::new().unwrap();
        let err = ContextBuilder::new(temp_dir.path(), temp_dir.path().join(".isycontext"), info())
            .build()
            .unwrap_err();
        assert!(matches!(err, IsyError::ManifestRead { .. }));
        assert!(err.user_message().contains("isy init"));
    }
}
