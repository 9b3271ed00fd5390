//! ASCII rendering of the included part of a project tree
//!
//! Only files that made it into the context appear, together with the
//! directories that lead to them:
//!
//! ```text
//! my_project/
//! ├── README.md
//! └── src
//!     ├── lib.rs
//!     └── main.rs
//! ```

use crate::utils::normalize_path;
use std::collections::BTreeMap;
use std::path::Path;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE_PREFIX: &str = "│   ";
const SPACE_PREFIX: &str = "    ";

#[derive(Debug, Default, Clone)]
struct Node {
    is_dir: bool,
    children: BTreeMap<String, Node>,
}

/// Tree of root-relative file paths
#[derive(Debug, Clone)]
pub struct FileTree {
    root_label: String,
    root: Node,
    files: usize,
}

impl FileTree {
    /// Empty tree whose first line is `<root_label>/`
    pub fn new(root_label: impl Into<String>) -> Self {
        Self {
            root_label: root_label.into(),
            root: Node {
                is_dir: true,
                children: BTreeMap::new(),
            },
            files: 0,
        }
    }

    /// Tree labelled after `root`'s base name, holding `paths`
    pub fn from_paths<'a, I>(root: &Path, paths: I) -> Self
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let mut tree = Self::new(root_label(root));
        for path in paths {
            tree.insert(path);
        }
        tree
    }

    /// Add a file; every missing parent directory is created on the way
    pub fn insert(&mut self, path: &Path) {
        let normalized = normalize_path(path);
        let parts: Vec<&str> = normalized.split('/').filter(|p| !p.is_empty()).collect();
        let Some((file_name, dirs)) = parts.split_last() else {
            return;
        };

        let mut node = &mut self.root;
        for dir in dirs {
            node = node.children.entry((*dir).to_string()).or_default();
            node.is_dir = true;
        }
        if !node.children.contains_key(*file_name) {
            node.children.insert((*file_name).to_string(), Node::default());
            self.files += 1;
        }
    }

    /// Number of files in the tree
    pub fn file_count(&self) -> usize {
        self.files
    }

    /// Render the tree, one line per entry, each line newline-terminated
    pub fn render(&self) -> String {
        let mut out = format!("{}/\n", self.root_label);
        render_children(&self.root, "", &mut out);
        out
    }
}

/// Label for the root line: the directory's base name, or `.` when the path
/// has none (`.`, `/`)
pub fn root_label(root: &Path) -> String {
    root.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string())
}

fn render_children(node: &Node, prefix: &str, out: &mut String) {
    let total = node.children.len();
    for (i, (name, child)) in node.children.iter().enumerate() {
        let is_last = i + 1 == total;
        let connector = if is_last { LAST_BRANCH } else { BRANCH };
        out.push_str(prefix);
        out.push_str(connector);
        out.push_str(name);
        out.push('\n');

        if child.is_dir {
            let continuation = if is_last { SPACE_PREFIX } else { PIPE_PREFIX };
            render_children(child, &format!("{prefix}{continuation}"), out);
        }
    }
}
