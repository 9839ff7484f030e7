//! Sandboxed file operations.
//!
//! All paths are resolved relative to a configured root directory;
//! anything that would escape it (absolute paths, `..` traversal) is
//! rejected before touching the filesystem.

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::registry::Tool;
use crate::schema::SchemaNode;

/// Resolve `relative` under `root`, rejecting escapes lexically.
fn resolve_sandboxed(root: &Path, relative: &str) -> Result<PathBuf> {
    let mut resolved = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() || !resolved.starts_with(root) {
                    bail!("access denied: path escapes the allowed directory");
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                bail!("access denied: absolute paths are not allowed");
            }
        }
    }
    if !resolved.starts_with(root) {
        bail!("access denied: path escapes the allowed directory");
    }
    Ok(resolved)
}

// --- read_file ---

pub struct ReadFileTool {
    root: PathBuf,
}

impl ReadFileTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a text file, relative to the working directory."
    }

    fn schema(&self) -> SchemaNode {
        SchemaNode::object(
            [(
                "filePath",
                SchemaNode::string("Path of the file to read, relative to the working directory"),
            )],
            &["filePath"],
        )
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let file_path = args["filePath"].as_str().unwrap_or_default();
        let resolved = resolve_sandboxed(&self.root, file_path)?;
        let content = tokio::fs::read_to_string(&resolved)
            .await
            .with_context(|| format!("failed to read file: {file_path}"))?;
        Ok(json!({
            "success": true,
            "content": content,
            "filePath": file_path,
            "size": content.len(),
        }))
    }
}

// --- write_file ---

pub struct WriteFileTool {
    root: PathBuf,
}

impl WriteFileTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file, creating it (and parent directories) or \
         overwriting it."
    }

    fn schema(&self) -> SchemaNode {
        SchemaNode::object(
            [
                (
                    "filePath",
                    SchemaNode::string("Path of the file to write, relative to the working directory"),
                ),
                ("content", SchemaNode::string("The content to write")),
            ],
            &["filePath", "content"],
        )
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let file_path = args["filePath"].as_str().unwrap_or_default();
        let content = args["content"].as_str().unwrap_or_default();
        let resolved = resolve_sandboxed(&self.root, file_path)?;

        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create directory for: {file_path}"))?;
        }
        tokio::fs::write(&resolved, content)
            .await
            .with_context(|| format!("failed to write file: {file_path}"))?;

        Ok(json!({
            "success": true,
            "filePath": file_path,
            "message": "File written successfully",
        }))
    }
}

// --- list_files ---

pub struct ListFilesTool {
    root: PathBuf,
}

impl ListFilesTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files and subdirectories of a directory, optionally recursively."
    }

    fn schema(&self) -> SchemaNode {
        SchemaNode::object(
            [
                (
                    "dirPath",
                    SchemaNode::string("Directory to list, relative to the working directory")
                        .with_default(json!(".")),
                ),
                (
                    "recursive",
                    SchemaNode::boolean("Descend into subdirectories")
                        .with_default(json!(false)),
                ),
            ],
            &[],
        )
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let dir_path = args["dirPath"].as_str().unwrap_or(".");
        let recursive = args["recursive"].as_bool().unwrap_or(false);
        let base = resolve_sandboxed(&self.root, dir_path)?;

        let mut items = Vec::new();
        let mut pending = vec![base.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .with_context(|| format!("failed to list directory: {dir_path}"))?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let name = path
                    .strip_prefix(&base)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .to_string();
                let metadata = entry.metadata().await?;
                if metadata.is_dir() {
                    items.push(json!({ "name": name, "type": "directory" }));
                    if recursive {
                        pending.push(path);
                    }
                } else {
                    items.push(json!({
                        "name": name,
                        "type": "file",
                        "size": metadata.len(),
                    }));
                }
            }
        }

        Ok(json!({
            "success": true,
            "dirPath": dir_path,
            "count": items.len(),
            "items": items,
        }))
    }
}
