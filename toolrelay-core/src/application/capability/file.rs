use super::{parse_input, truncate_chars};
use serde::Deserialize;
use serde_json::{Value, json};
use std::io;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Deserialize)]
struct ReadInput {
    file_path: String,
}

#[derive(Debug, Deserialize)]
struct WriteInput {
    file_path: String,
    content: String,
}

#[derive(Debug, Clone)]
pub struct ReadFileTool {
    max_chars: usize,
}

impl ReadFileTool {
    pub const NAME: &'static str = "read_file";

    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn description(&self) -> String {
        format!(
            "Read the contents of a local file. Provide an absolute path. Output is \
             truncated to {} characters.",
            self.max_chars
        )
    }

    pub fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Absolute path to the file",
                },
            },
            "required": ["file_path"],
        })
    }

    pub async fn execute(&self, input: Value) -> String {
        let input: ReadInput = match parse_input(Self::NAME, input) {
            Ok(input) => input,
            Err(err) => return err.as_tool_result(),
        };
        let path = Path::new(&input.file_path);

        match fs::metadata(path).await {
            Ok(meta) if !meta.is_file() => return format!("Error: Not a file: {}", input.file_path),
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return format!("Error: File not found: {}", input.file_path);
            }
            Err(err) => return format!("Error reading file: {err}"),
        }

        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) => return format!("Error reading file: {err}"),
        };
        let content = String::from_utf8_lossy(&bytes);
        match truncate_chars(&content, self.max_chars) {
            (head, true) => format!(
                "{head}\n\n... (truncated, {} chars total)",
                content.chars().count()
            ),
            (whole, false) => whole.to_string(),
        }
    }
}

/// Always gated behind approval.
#[derive(Debug, Clone, Default)]
pub struct WriteFileTool;

impl WriteFileTool {
    pub const NAME: &'static str = "write_file";

    pub fn description(&self) -> &'static str {
        "Write content to a local file. Creates parent directories if needed. Overwrites \
         the file if it already exists. Provide an absolute path."
    }

    pub fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Absolute path where the file should be written",
                },
                "content": {
                    "type": "string",
                    "description": "Content to write",
                },
            },
            "required": ["file_path", "content"],
        })
    }

    pub async fn execute(&self, input: Value) -> String {
        let input: WriteInput = match parse_input(Self::NAME, input) {
            Ok(input) => input,
            Err(err) => return err.as_tool_result(),
        };
        let path = Path::new(&input.file_path);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(err) = fs::create_dir_all(parent).await {
                return format!("Error writing file: {err}");
            }
        }
        match fs::write(path, input.content.as_bytes()).await {
            Ok(()) => format!(
                "Wrote {} characters to {}",
                input.content.chars().count(),
                input.file_path
            ),
            Err(err) => format!("Error writing file: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_small_file_verbatim() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello").expect("write");

        let result = ReadFileTool::new(100)
            .execute(json!({"file_path": path.display().to_string()}))
            .await;
        assert_eq!(result, "hello");
    }

    #[tokio::test]
    async fn long_file_is_truncated_with_total() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("big.txt");
        std::fs::write(&path, "a".repeat(25)).expect("write");

        let result = ReadFileTool::new(10)
            .execute(json!({"file_path": path.display().to_string()}))
            .await;
        assert_eq!(result, format!("{}\n\n... (truncated, 25 chars total)", "a".repeat(10)));
    }

    #[tokio::test]
    async fn missing_and_directory_paths_are_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tool = ReadFileTool::new(100);

        let missing = dir.path().join("nope.txt").display().to_string();
        let result = tool.execute(json!({"file_path": missing})).await;
        assert!(result.starts_with("Error: File not found:"), "{result}");

        let result = tool
            .execute(json!({"file_path": dir.path().display().to_string()}))
            .await;
        assert!(result.starts_with("Error: Not a file:"), "{result}");
    }

    #[tokio::test]
    async fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/deeper/out.txt");

        let result = WriteFileTool
            .execute(json!({"file_path": path.display().to_string(), "content": "héllo"}))
            .await;
        assert_eq!(result, format!("Wrote 5 characters to {}", path.display()));
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "héllo");
    }
}
