//! Built-in shell and file tools.
//!
//! The shell deny-list is advisory, not a sandbox: it reduces but does not
//! eliminate risk. Real isolation requires OS-level sandboxing, which is out
//! of scope here.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use super::registry::ToolRunner;
use super::types::ToolResult;

pub const DEFAULT_DENY_PATTERNS: &[&str] = &[
    "rm -rf /",
    "/dev/sd",
    "/dev/nvme",
    ":(){:|:&};:",
    "| sudo",
    "sudo ",
    "eval ",
    "chmod 777",
    "> /etc/",
    ">> /etc/",
];

/// Executes a shell command, refusing anything matching a deny pattern.
pub struct ShellTool {
    deny_patterns: Vec<String>,
}

impl ShellTool {
    pub fn new(deny_patterns: Vec<String>) -> Self {
        Self { deny_patterns }
    }

    fn is_denied(&self, command: &str) -> Option<&str> {
        self.deny_patterns
            .iter()
            .find(|pattern| command.contains(pattern.as_str()))
            .map(|s| s.as_str())
    }
}

impl Default for ShellTool {
    fn default() -> Self {
        Self::new(DEFAULT_DENY_PATTERNS.iter().map(|s| s.to_string()).collect())
    }
}

#[async_trait]
impl ToolRunner for ShellTool {
    async fn run(&self, args: Value) -> Result<ToolResult, String> {
        let start = Instant::now();
        let command = args
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing 'command' argument".to_string())?;

        if let Some(pattern) = self.is_denied(command) {
            return Ok(ToolResult::failed(
                format!("command matches deny pattern '{pattern}'"),
                start.elapsed().as_millis() as u64,
            ));
        }

        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| format!("io:{e}"))?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if output.status.success() {
            Ok(ToolResult::ok(stdout, None, latency_ms))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            Ok(ToolResult::failed(
                format!("exit {}: {}", output.status.code().unwrap_or(-1), stderr),
                latency_ms,
            ))
        }
    }
}

/// Reads or writes a file, canonicalizing the path and rejecting any
/// resolution that escapes `workspace_root` when `restrict_to_workspace`.
pub struct FileTool {
    workspace_root: PathBuf,
    restrict_to_workspace: bool,
}

impl FileTool {
    pub fn new(workspace_root: PathBuf, restrict_to_workspace: bool) -> Self {
        Self {
            workspace_root,
            restrict_to_workspace,
        }
    }

    fn resolve(&self, requested: &str) -> Result<PathBuf, String> {
        let requested_path = Path::new(requested);
        let joined = if requested_path.is_absolute() {
            requested_path.to_path_buf()
        } else {
            self.workspace_root.join(requested_path)
        };

        if !self.restrict_to_workspace {
            return Ok(joined);
        }

        let root = self
            .workspace_root
            .canonicalize()
            .map_err(|e| format!("io:{e}"))?;

        let candidate = if joined.exists() {
            joined.canonicalize().map_err(|e| format!("io:{e}"))?
        } else {
            let parent = joined.parent().unwrap_or(&joined);
            let parent = parent.canonicalize().map_err(|e| format!("io:{e}"))?;
            parent.join(joined.file_name().unwrap_or_default())
        };

        if !candidate.starts_with(&root) {
            return Err(format!(
                "path '{requested}' escapes workspace root '{}'",
                root.display()
            ));
        }
        Ok(candidate)
    }
}

#[async_trait]
impl ToolRunner for FileTool {
    async fn run(&self, args: Value) -> Result<ToolResult, String> {
        let start = Instant::now();
        let path = args
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing 'path' argument".to_string())?;
        let mode = args.get("mode").and_then(Value::as_str).unwrap_or("read");

        let resolved = match self.resolve(path) {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::failed(e, start.elapsed().as_millis() as u64)),
        };

        match mode {
            "read" => match tokio::fs::read_to_string(&resolved).await {
                Ok(contents) => Ok(ToolResult::ok(contents, None, start.elapsed().as_millis() as u64)),
                Err(e) => Ok(ToolResult::failed(format!("io:{e}"), start.elapsed().as_millis() as u64)),
            },
            "write" => {
                let contents = args.get("contents").and_then(Value::as_str).unwrap_or("");
                match tokio::fs::write(&resolved, contents).await {
                    Ok(()) => Ok(ToolResult::ok("written", None, start.elapsed().as_millis() as u64)),
                    Err(e) => Ok(ToolResult::failed(format!("io:{e}"), start.elapsed().as_millis() as u64)),
                }
            }
            other => Ok(ToolResult::failed(
                format!("unknown mode '{other}'"),
                start.elapsed().as_millis() as u64,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn shell_blocks_deny_pattern() {
        let tool = ShellTool::default();
        let result = tool.run(json!({"command": "sudo rm -rf /"})).await.unwrap();
        assert!(!result.success);
    }

    #[tokio::test]
    async fn shell_runs_allowed_command() {
        let tool = ShellTool::default();
        let result = tool.run(json!({"command": "echo hello"})).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output.trim(), "hello");
    }

    #[tokio::test]
    async fn file_tool_writes_and_reads_within_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileTool::new(dir.path().to_path_buf(), true);

        tool.run(json!({"path": "note.txt", "mode": "write", "contents": "hi"}))
            .await
            .unwrap();
        let result = tool.run(json!({"path": "note.txt", "mode": "read"})).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "hi");
    }

    #[tokio::test]
    async fn file_tool_rejects_escape_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileTool::new(dir.path().to_path_buf(), true);
        let result = tool
            .run(json!({"path": "../../etc/passwd", "mode": "read"}))
            .await
            .unwrap();
        assert!(!result.success);
    }
}
