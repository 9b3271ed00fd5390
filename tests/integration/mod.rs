//! Integration tests for isy
//!
//! Scenarios that span several modules: project setup, context building,
//! branch snapshots and applying model-proposed changes.

use ::isy::chat::{ChatClient, ChatCompletion, ChatRequest};
use ::isy::config::Config;
use ::isy::edit::apply_step;
use ::isy::init::initialize;
use ::isy::responses::{AskResponse, CodeModificationResponse};
use ::isy::*;
use filetime::{set_file_mtime, FileTime};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Test harness for an initialized isy project
pub struct ProjectHarness {
    pub temp_dir: TempDir,
    pub paths: IsyPaths,
    pub config: Config,
}

impl ProjectHarness {
    /// Create an initialized project with the given manifest
    pub fn new(manifest: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let paths = IsyPaths::new(temp_dir.path());
        let config = Config {
            project_name: "harness".to_string(),
            description: "Integration project".to_string(),
            ..Default::default()
        };
        initialize(&paths, &config, false).unwrap();
        fs::write(paths.manifest(), manifest).unwrap();

        Self {
            temp_dir,
            paths,
            config,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a file, creating parent directories
    pub fn write(&self, rel: &str, content: &str) {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root().join(rel)).unwrap()
    }

    pub fn build(&self) -> ContextReport {
        ContextBuilder::new(self.root(), self.paths.manifest(), self.config.project_info())
            .build()
            .unwrap()
    }

    pub fn selector(&self) -> BranchSelector {
        BranchSelector::for_project(&self.paths)
    }
}

/// Chat client replaying canned answers
#[derive(Default)]
pub struct ScriptedClient {
    replies: RefCell<VecDeque<String>>,
    pub requests: RefCell<Vec<ChatRequest>>,
}

impl ScriptedClient {
    pub fn with_replies(replies: &[&str]) -> Self {
        Self {
            replies: RefCell::new(replies.iter().map(|r| r.to_string()).collect()),
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl ChatClient for &ScriptedClient {
    fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion> {
        self.requests.borrow_mut().push(request.clone());
        let content = self
            .replies
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| IsyError::chat("no scripted reply left"))?;
        Ok(ChatCompletion {
            content,
            prompt_tokens: 1000,
            completion_tokens: 100,
        })
    }
}

#[test]
fn test_full_context_document() {
    let h = ProjectHarness::new("# sources\n*.go\n!vendor/*.go\n");
    h.write("main.go", "package main\n");
    h.write("internal/api/server.go", "package api");
    h.write("internal/api/README.md", "# API");
    h.write("vendor/lib.go", "package lib");
    h.write(".git/hooks/pre-commit.go", "package hooks");

    let report = h.build();
    let root_name = h.root().file_name().unwrap().to_string_lossy().into_owned();

    let expected = format!(
        concat!(
            "----- START CONTEXT -----\n\n",
            "----- PROJECT INFO -----\n\n",
            "Project Name: harness\n",
            "Description: Integration project\n",
            "\n----- END PROJECT INFO -----\n\n",
            "----- START PROJECT TREE -----\n\n",
            "{}/\n",
            "├── internal\n",
            "│   └── api\n",
            "│       └── server.go\n",
            "└── main.go\n",
            "\n----- END PROJECT TREE -----\n\n",
            "----- START FILE -----\n",
            "FILE: internal/api/server.go\n",
            "----- CONTENT -----\n",
            "1: package api\n",
            "----- END FILE -----\n\n",
            "----- START FILE -----\n",
            "FILE: main.go\n",
            "----- CONTENT -----\n",
            "1: package main\n",
            "2: \n",
            "----- END FILE -----\n\n",
            "----- END CONTEXT -----\n\n",
        ),
        root_name
    );
    assert_eq!(report.document, expected);
    assert!(report.rejected_patterns.is_empty());

    let tokens = report.token_count("gpt-4o").unwrap();
    assert_eq!(tokens, count_tokens("gpt-4o", &expected).unwrap());
    assert!(tokens > 0 && tokens < report.document.len());
}

#[test]
fn test_branches_listed_newest_first() {
    let h = ProjectHarness::new("*.rs\n");
    h.write("lib.rs", "pub fn a() {}");
    let selector = h.selector();

    for (id, secs) in [("old", 1_000_000), ("newest", 3_000_000), ("middle", 2_000_000)] {
        let selection = selector.select(Some(id)).unwrap();
        set_file_mtime(selection.path(), FileTime::from_unix_time(secs, 0)).unwrap();
    }

    let ids: Vec<String> = selector
        .list_branches()
        .unwrap()
        .into_iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(ids, ["newest", "middle", "old"]);
}

#[test]
fn test_drifted_branch_is_never_modified() {
    let h = ProjectHarness::new("*.rs\n");
    h.write("lib.rs", "pub fn a() {}");
    let selector = h.selector();
    let first = selector.select(None).unwrap();
    let snapshot_print = fingerprint(first.path()).unwrap();

    h.write("lib.rs", "pub fn b() {}");
    for _ in 0..3 {
        assert!(matches!(
            selector.select(Some(first.id())),
            Err(IsyError::DriftDetected { .. })
        ));
    }
    assert_eq!(fingerprint(first.path()).unwrap(), snapshot_print);

    // A fresh branch captures the new state
    let second = selector.select(None).unwrap();
    assert_ne!(second.id(), first.id());
    assert_eq!(
        fs::read_to_string(second.path().join("lib.rs")).unwrap(),
        "pub fn b() {}"
    );

    // Reverting the tree makes the first branch usable again
    h.write("lib.rs", "pub fn a() {}");
    assert!(matches!(
        selector.select(Some(first.id())).unwrap(),
        BranchSelection::Reused { .. }
    ));
}

#[test]
fn test_snapshot_excludes_state_but_keeps_vcs() {
    let h = ProjectHarness::new("*\n");
    h.write("src/main.rs", "fn main() {}");
    h.write(".git/HEAD", "ref: refs/heads/main\n");

    let branch = h.selector().select(Some("withgit")).unwrap();
    assert!(branch.path().join(".git/HEAD").exists());
    assert!(!branch.path().join(".isy").exists());

    // .git is hashed but never part of the context
    let report = h.build();
    assert!(report.files.iter().all(|f| !f.starts_with(".git")));
    assert!(report.document.contains("FILE: src/main.rs\n"));
    assert!(report.document.contains("FILE: .isycontext\n"));
}

#[test]
fn test_ask_session_over_context() {
    let h = ProjectHarness::new("*.rs\n");
    h.write("lib.rs", "pub fn answer() -> u32 { 42 }");
    let report = h.build();

    let client = ScriptedClient::with_replies(&[r#"{"contextual_response": "It returns 42."}"#]);
    let mut session: ChatSession<_, AskResponse> =
        ChatSession::new(&client, "gpt-4o", report.document.clone())
            .with_ledger(UsageLedger::load(&h.paths.usage()).unwrap(), h.paths.usage());

    let answer = session.send("What does answer() return?").unwrap();
    assert_eq!(answer.contextual_response, "It returns 42.");

    let requests = client.requests.borrow();
    assert_eq!(requests[0].messages[1].content, report.document);

    let saved = UsageLedger::load(&h.paths.usage()).unwrap();
    assert_eq!(saved.token_input, 1000);
    assert!((saved.total_cost - 0.0035).abs() < 1e-9);
}

#[test]
fn test_code_session_applies_steps() {
    let h = ProjectHarness::new("src/**/*.rs\n");
    h.write("src/lib.rs", "pub mod a;\npub mod b;\n");
    h.write("src/a.rs", "pub fn a() {}\n");
    h.write("src/b.rs", "pub fn b() {}\n");

    let branch = h.selector().select(None).unwrap();

    let client = ScriptedClient::with_replies(&[r#"{
        "steps": [
            {"operation_type": "create", "file_path": "src/c.rs",
             "edits": [{"start_line": 1, "end_line": 1, "new_code": "pub fn c() {}\n"}]},
            {"operation_type": "edit", "file_path": "src/lib.rs",
             "edits": [{"start_line": 2, "end_line": 2, "new_code": "pub mod c;"}]},
            {"operation_type": "delete", "file_path": "src/b.rs", "edits": []}
        ]
    }"#]);
    let mut session: ChatSession<_, CodeModificationResponse> =
        ChatSession::new(&client, "gpt-4o", h.build().document);

    let response = session.send("Replace module b with c").unwrap();
    for step in &response.steps {
        apply_step(h.root(), step).unwrap();
    }

    assert_eq!(h.read("src/lib.rs"), "pub mod a;\npub mod c;\n");
    assert_eq!(h.read("src/c.rs"), "pub fn c() {}\n");
    assert!(!h.root().join("src/b.rs").exists());

    // The snapshot still holds the original code
    assert!(branch.path().join("src/b.rs").exists());
    assert!(!h.selector().check_drift(branch.id()).unwrap().is_clean());

    let report = h.build();
    let files: Vec<String> = report.files.iter().map(|p| normalize_path(p)).collect();
    assert_eq!(files, ["src/a.rs", "src/c.rs", "src/lib.rs"]);
}
