//! Directory browser / 目录浏览
//!
//! Lists a directory two levels deep: top-level entries, and for each folder its
//! immediate children (capped). Deeper folders are returned with empty children.

use std::io::ErrorKind;
use std::path::Path;

use crate::error::{ManagerError, Result};
use crate::models::TreeNode;

pub async fn browse(path: &str, max_children: usize) -> Result<Vec<TreeNode>> {
    let path = path.trim();
    if path.is_empty() {
        return Err(ManagerError::Browse("No path provided".to_string()));
    }
    let root = Path::new(path);

    let metadata = match tokio::fs::metadata(root).await {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ManagerError::Browse("Path does not exist".to_string()))
        }
        Err(e) => return Err(read_error(e)),
    };
    if !metadata.is_dir() {
        return Err(ManagerError::Browse("Path is not a directory".to_string()));
    }

    let names = sorted_names(root).await.map_err(read_error)?;
    let mut structure = Vec::with_capacity(names.len());

    for name in names {
        let item = root.join(&name);
        if is_dir(&item).await {
            let children = match list_children(&item, max_children).await {
                Ok(children) => children,
                Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                    vec![TreeNode::file("Permission denied", 0)]
                }
                Err(e) => {
                    tracing::warn!("Failed to list {:?}: {}", item, e);
                    Vec::new()
                }
            };
            structure.push(TreeNode::folder(name, children));
        } else {
            structure.push(TreeNode::file(name, file_size(&item).await));
        }
    }

    Ok(structure)
}

async fn list_children(dir: &Path, max_children: usize) -> std::io::Result<Vec<TreeNode>> {
    let names = sorted_names(dir).await?;
    let mut children = Vec::new();
    for name in names.into_iter().take(max_children) {
        let item = dir.join(&name);
        if is_dir(&item).await {
            // Deeper levels are loaded on demand / 更深层级按需加载
            children.push(TreeNode::folder(name, Vec::new()));
        } else {
            children.push(TreeNode::file(name, file_size(&item).await));
        }
    }
    Ok(children)
}

async fn sorted_names(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().to_string());
    }
    names.sort();
    Ok(names)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
}

async fn file_size(path: &Path) -> u64 {
    tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
}

fn read_error(e: std::io::Error) -> ManagerError {
    if e.kind() == ErrorKind::PermissionDenied {
        ManagerError::Browse("Permission denied".to_string())
    } else {
        ManagerError::Browse(format!("Error reading directory: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeKind;

    #[tokio::test]
    async fn test_two_level_listing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("checkpoints").join("sdxl").join("deep")).unwrap();
        std::fs::write(root.join("checkpoints").join("b.safetensors"), vec![0u8; 2048]).unwrap();
        std::fs::write(root.join("checkpoints").join("a.safetensors"), b"abc").unwrap();
        std::fs::create_dir(root.join("vae")).unwrap();
        std::fs::write(root.join("notes.txt"), b"hi").unwrap();

        let tree = browse(&root.to_string_lossy(), 50).await.unwrap();
        let names: Vec<_> = tree.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["checkpoints", "notes.txt", "vae"]);

        let checkpoints = tree[0].children.as_ref().unwrap();
        let child_names: Vec<_> = checkpoints.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(child_names, vec!["a.safetensors", "b.safetensors", "sdxl"]);
        assert_eq!(checkpoints[1].size, Some(2048));
        assert_eq!(checkpoints[2].kind, NodeKind::Folder);
        assert_eq!(checkpoints[2].children, Some(vec![]));

        assert_eq!(tree[1], TreeNode::file("notes.txt", 2));
        assert_eq!(tree[2].children, Some(vec![]));
    }

    #[tokio::test]
    async fn test_children_are_capped() {
        let dir = tempfile::tempdir().unwrap();
        let loras = dir.path().join("loras");
        std::fs::create_dir(&loras).unwrap();
        for i in 0..5 {
            std::fs::write(loras.join(format!("l{}.safetensors", i)), b"x").unwrap();
        }

        let tree = browse(&dir.path().to_string_lossy(), 3).await.unwrap();
        let children = tree[0].children.as_ref().unwrap();
        assert_eq!(children.len(), 3);
        assert_eq!(children[2].name, "l2.safetensors");
    }

    #[tokio::test]
    async fn test_errors() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.bin");
        std::fs::write(&file, b"x").unwrap();

        let msg = |r: Result<Vec<TreeNode>>| r.unwrap_err().to_string();
        assert_eq!(msg(browse("", 50).await), "No path provided");
        let missing = dir.path().join("missing");
        assert_eq!(msg(browse(&missing.to_string_lossy(), 50).await), "Path does not exist");
        assert_eq!(msg(browse(&file.to_string_lossy(), 50).await), "Path is not a directory");
    }
}
