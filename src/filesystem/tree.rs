use std::path::{Path, PathBuf};

use hashlink::LinkedHashMap;

/// One directory of a built tree.
///
/// `files` holds the closure of the directory: every regular file found in it
/// or in any directory below it, as full paths. `children` maps the names of
/// subdirectories to their own nodes in traversal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    name: String,
    path: PathBuf,
    files: Vec<PathBuf>,
    children: LinkedHashMap<String, DirectoryNode>,
}

impl DirectoryNode {
    pub(crate) fn new(name: String, path: PathBuf) -> Self {
        Self {
            name,
            path,
            files: Vec::new(),
            children: LinkedHashMap::new(),
        }
    }

    pub(crate) fn push_file(&mut self, file: PathBuf) {
        self.files.push(file);
    }

    /// Merges `child`'s closure into this node and stores it under its name.
    /// A name that is already taken gets a `~N` suffix; the new name is
    /// returned when that happens.
    pub(crate) fn adopt_child(&mut self, mut child: DirectoryNode) -> Option<String> {
        let mut key = child.name.clone();
        let mut suffix = 1;
        while self.children.contains_key(&key) {
            suffix += 1;
            key = format!("{}~{suffix}", child.name);
        }

        let renamed = (key != child.name).then(|| key.clone());
        child.name = key.clone();
        self.files.extend(child.files.iter().cloned());
        self.children.insert(key, child);
        renamed
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn children(&self) -> &LinkedHashMap<String, DirectoryNode> {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&DirectoryNode> {
        self.children.get(name)
    }

    /// Files that live directly in this directory, not in a subdirectory.
    pub fn direct_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.files
            .iter()
            .filter(|file| file.parent() == Some(self.path.as_path()))
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Number of directories below this one, at any depth.
    pub fn directory_count(&self) -> usize {
        self.children
            .values()
            .map(|child| 1 + child.directory_count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.children.is_empty()
    }

    /// Pre-order iterator over this node and every node below it.
    pub fn walk(&self) -> Nodes<'_> {
        Nodes { stack: vec![self] }
    }
}

pub struct Nodes<'a> {
    stack: Vec<&'a DirectoryNode>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a DirectoryNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Reversed so that children come out in traversal order.
        let children: Vec<_> = node.children.values().collect();
        self.stack.extend(children.into_iter().rev());
        Some(node)
    }
}
