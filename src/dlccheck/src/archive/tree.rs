//! Directory tree rebuilt from a flat list of member paths

use std::collections::BTreeMap;

use super::{join, normalize, ArchiveError, DirEntry, EntryKind};

/// Children of every directory, keyed by normalized directory path
#[derive(Debug, Clone)]
pub(crate) struct PathTree {
    children: BTreeMap<String, BTreeMap<String, EntryKind>>,
}

impl Default for PathTree {
    fn default() -> Self {
        let mut children = BTreeMap::new();
        children.insert(String::new(), BTreeMap::new());
        Self { children }
    }
}

/// Split `a/b/c` into `("a/b", "c")`
fn split_parent(path: &str) -> (&str, &str) {
    path.rsplit_once('/').unwrap_or(("", path))
}

impl PathTree {
    pub fn insert_dir(&mut self, path: &str) {
        let mut path = normalize(path).to_string();
        while !path.is_empty() {
            let (parent, name) = split_parent(&path);
            let (parent, name) = (parent.to_string(), name.to_string());
            self.children.entry(path).or_default();

            // a directory already linked into its parent has all ancestors linked
            let siblings = self.children.entry(parent.clone()).or_default();
            if siblings.insert(name, EntryKind::Directory).is_some() {
                break;
            }
            path = parent;
        }
    }

    pub fn insert_file(&mut self, path: &str) {
        let path = normalize(path);
        let (parent, name) = split_parent(path);
        self.insert_dir(parent);
        self.children
            .entry(parent.to_string())
            .or_default()
            .insert(name.to_string(), EntryKind::File);
    }

    pub fn kind(&self, path: &str) -> EntryKind {
        let path = normalize(path);
        if self.children.contains_key(path) {
            return EntryKind::Directory;
        }
        let (parent, name) = split_parent(path);
        self.children
            .get(parent)
            .and_then(|siblings| siblings.get(name))
            .copied()
            .unwrap_or(EntryKind::None)
    }

    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, ArchiveError> {
        let dir = normalize(path);
        match self.children.get(dir) {
            Some(children) => Ok(children
                .iter()
                .map(|(name, &kind)| DirEntry {
                    path: join(dir, name),
                    kind,
                })
                .collect()),
            None if self.kind(dir) == EntryKind::File => {
                Err(ArchiveError::NotADirectory(path.to_string()))
            }
            None => Err(ArchiveError::EntryNotFound(path.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestors_are_linked() {
        let mut tree = PathTree::default();
        tree.insert_file("def/sign/sub/a.sii");
        tree.insert_file("def/world/b.sii");

        assert_eq!(tree.kind(""), EntryKind::Directory);
        assert_eq!(tree.kind("/def/sign/sub"), EntryKind::Directory);
        assert_eq!(tree.kind("def/world/b.sii"), EntryKind::File);
        assert_eq!(tree.kind("def/nothing"), EntryKind::None);

        let root = tree.read_dir("/").unwrap();
        assert_eq!(root, [DirEntry::directory("def")]);
        let def = tree.read_dir("def").unwrap();
        assert_eq!(def, [DirEntry::directory("def/sign"), DirEntry::directory("def/world")]);
    }

    #[test]
    fn test_explicit_empty_directory() {
        let mut tree = PathTree::default();
        tree.insert_dir("def/ferry/");
        assert_eq!(tree.kind("def/ferry"), EntryKind::Directory);
        assert!(tree.read_dir("def/ferry").unwrap().is_empty());
    }

    #[test]
    fn test_read_dir_errors() {
        let mut tree = PathTree::default();
        tree.insert_file("def/a.sii");
        assert!(matches!(tree.read_dir("def/a.sii"), Err(ArchiveError::NotADirectory(_))));
        assert!(matches!(tree.read_dir("nope"), Err(ArchiveError::EntryNotFound(_))));
    }
}
