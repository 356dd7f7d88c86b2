use std::fmt::Write as _;

use colored::Colorize;
use derive_more::Display;

use crate::filesystem::DirectoryNode;

const INDENT: &str = "  ";

/// Which files are listed under each directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum FileListing {
    /// Only the files directly inside the directory, by file name.
    #[default]
    #[display("direct")]
    Direct,
    /// Every file in the directory's closure, by full path.
    #[display("closure")]
    Closure,
}

/// Indented, human-readable rendering of a tree: a `name/` line per
/// directory followed by one `- file` line per file, subdirectories nested
/// one level deeper.
#[derive(Debug, Clone, Default)]
pub struct TreeRenderer {
    listing: FileListing,
    color: bool,
}

impl TreeRenderer {
    pub fn new(listing: FileListing, color: bool) -> Self {
        Self { listing, color }
    }

    pub fn render(&self, tree: &DirectoryNode) -> String {
        let mut out = String::new();
        self.render_node(tree, 0, &mut out);
        out
    }

    fn render_node(&self, node: &DirectoryNode, level: usize, out: &mut String) {
        let indent = INDENT.repeat(level);
        let header = format!("{}/", node.name());
        if self.color {
            let _ = writeln!(out, "{indent}{}", header.blue().bold());
        } else {
            let _ = writeln!(out, "{indent}{header}");
        }

        match self.listing {
            FileListing::Direct => {
                for file in node.direct_files() {
                    let name = file
                        .file_name()
                        .map(|n| n.to_string_lossy())
                        .unwrap_or_else(|| file.to_string_lossy());
                    let _ = writeln!(out, "{indent}{INDENT}- {name}");
                }
            }
            FileListing::Closure => {
                for file in node.files() {
                    let _ = writeln!(out, "{indent}{INDENT}- {}", file.display());
                }
            }
        }

        for child in node.children().values() {
            self.render_node(child, level + 1, out);
        }
    }
}
