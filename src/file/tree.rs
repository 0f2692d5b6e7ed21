//! Nested folder tree assembly.

use std::collections::{HashMap, HashSet};

use super::folder::Folder;

/// A folder with its nested subfolders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    pub folder: Folder,
    pub children: Vec<FolderNode>,
}

/// Build a forest from a flat folder list.
///
/// Sibling order follows the input order, so pass folders sorted by path.
/// A folder whose parent is missing from the list is treated as a root.
pub fn build_tree(folders: Vec<Folder>) -> Vec<FolderNode> {
    let ids: HashSet<i64> = folders.iter().map(|f| f.id).collect();

    let mut roots = Vec::new();
    let mut children: HashMap<i64, Vec<Folder>> = HashMap::new();
    for folder in folders {
        match folder.parent_id {
            Some(parent_id) if ids.contains(&parent_id) => {
                children.entry(parent_id).or_default().push(folder)
            }
            _ => roots.push(folder),
        }
    }

    roots
        .into_iter()
        .map(|folder| attach(folder, &mut children))
        .collect()
}

fn attach(folder: Folder, children: &mut HashMap<i64, Vec<Folder>>) -> FolderNode {
    let kids = children.remove(&folder.id).unwrap_or_default();
    FolderNode {
        children: kids.into_iter().map(|f| attach(f, children)).collect(),
        folder,
    }
}
