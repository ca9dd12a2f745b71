pub mod storage;
pub mod traits;

pub use storage::{sanitize_filename, FsStorage};
pub use traits::{Storage, ToolDefinition};

use crate::types::{ToolCall, ToolResult};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Built-in tools
// ---------------------------------------------------------------------------

/// The closed set of tools the model may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinTool {
    ReadFile,
    WriteFile,
}

impl BuiltinTool {
    pub const ALL: [BuiltinTool; 2] = [BuiltinTool::ReadFile, BuiltinTool::WriteFile];

    /// Name used in function calls.
    pub fn name(self) -> &'static str {
        match self {
            Self::ReadFile => "read_file",
            Self::WriteFile => "write_file",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn definition(self) -> ToolDefinition {
        match self {
            Self::ReadFile => ToolDefinition {
                name: self.name().into(),
                description: "Read content from a file in the files directory".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "filename": {
                            "type": "string",
                            "description": "The name of the file to read"
                        }
                    },
                    "required": ["filename"]
                }),
            },
            Self::WriteFile => ToolDefinition {
                name: self.name().into(),
                description: "Write content to a file in the files directory".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "filename": {
                            "type": "string",
                            "description": "The name of the file to write"
                        },
                        "content": {
                            "type": "string",
                            "description": "The content to write to the file"
                        }
                    },
                    "required": ["filename", "content"]
                }),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tool catalogue exposed to the inference model
// ---------------------------------------------------------------------------

/// Read-only catalogue of tool definitions, built once at startup.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
}

impl ToolRegistry {
    /// Catalogue of every built-in tool.
    pub fn builtin() -> Self {
        Self {
            definitions: BuiltinTool::ALL.iter().map(|t| t.definition()).collect(),
        }
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// ---------------------------------------------------------------------------
// Tool execution engine
// ---------------------------------------------------------------------------

/// Failure modes of a tool call. The display text is what the model sees.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: &'static str, reason: String },

    #[error("Failed to read file {name}: {cause}")]
    Read { name: String, cause: String },

    #[error("Failed to write file {name}: {cause}")]
    Write { name: String, cause: String },
}

#[derive(Debug, Deserialize)]
struct ReadFileArgs {
    filename: String,
}

#[derive(Debug, Deserialize)]
struct WriteFileArgs {
    filename: String,
    content: String,
}

/// A tool call resolved to a built-in tool with typed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocation {
    ReadFile { filename: String },
    WriteFile { filename: String, content: String },
}

impl ToolInvocation {
    pub fn parse(call: &ToolCall) -> Result<Self, ToolError> {
        let tool = BuiltinTool::from_name(&call.name)
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;
        let invalid = |e: serde_json::Error| ToolError::InvalidArguments {
            tool: tool.name(),
            reason: e.to_string(),
        };

        match tool {
            BuiltinTool::ReadFile => {
                let args: ReadFileArgs =
                    serde_json::from_value(call.arguments.clone()).map_err(invalid)?;
                Ok(Self::ReadFile {
                    filename: args.filename,
                })
            }
            BuiltinTool::WriteFile => {
                let args: WriteFileArgs =
                    serde_json::from_value(call.arguments.clone()).map_err(invalid)?;
                Ok(Self::WriteFile {
                    filename: args.filename,
                    content: args.content,
                })
            }
        }
    }

    /// Log line for the call. File content is reduced to its size.
    pub fn summary(&self) -> String {
        match self {
            Self::ReadFile { filename } => format!("read_file({filename})"),
            Self::WriteFile { filename, content } => {
                format!("write_file({filename}, {} bytes)", content.len())
            }
        }
    }
}

/// Dispatches tool calls to their implementations.
#[derive(Clone)]
pub struct ToolExecutor {
    storage: Arc<dyn Storage>,
}

impl ToolExecutor {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Execute a tool call. Every failure comes back as a `success: false`
    /// result.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        debug!("Tool call {}: {}({})", call.id, call.name, call.arguments);

        let outcome = match ToolInvocation::parse(call) {
            Ok(invocation) => {
                info!("Tool: {}", invocation.summary());
                self.run(invocation).await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => {
                info!("Tool {} succeeded", call.name);
                result
            }
            Err(e) => {
                warn!("Tool error: {}", e);
                ToolResult::failure(e.to_string())
            }
        }
    }

    async fn run(&self, invocation: ToolInvocation) -> Result<ToolResult, ToolError> {
        match invocation {
            ToolInvocation::ReadFile { filename } => {
                let content = self.read_file(&filename).await?;
                Ok(ToolResult::content(content))
            }
            ToolInvocation::WriteFile { filename, content } => {
                self.write_file(&filename, &content).await?;
                Ok(ToolResult::done(format!(
                    "Successfully wrote to file: {}",
                    filename
                )))
            }
        }
    }

    async fn read_file(&self, filename: &str) -> Result<String, ToolError> {
        let read_err = |cause: String| ToolError::Read {
            name: filename.to_string(),
            cause,
        };
        let safe_name =
            sanitize_filename(filename).ok_or_else(|| read_err("invalid file name".into()))?;

        self.storage
            .read(&safe_name)
            .await
            .map_err(|e| read_err(e.to_string()))
    }

    async fn write_file(&self, filename: &str, content: &str) -> Result<(), ToolError> {
        let write_err = |cause: String| ToolError::Write {
            name: filename.to_string(),
            cause,
        };
        let safe_name =
            sanitize_filename(filename).ok_or_else(|| write_err("invalid file name".into()))?;

        self.storage
            .ensure_root()
            .await
            .map_err(|e| write_err(e.to_string()))?;
        self.storage
            .write(&safe_name, content)
            .await
            .map_err(|e| write_err(e.to_string()))
    }
}
