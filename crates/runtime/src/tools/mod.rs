//! Tool registry: descriptors, schema validation, cached/timed execution, and
//! the built-in shell and file tools.

pub mod builtin;
pub mod cache;
pub mod registry;
pub mod types;
pub mod validation;

pub use builtin::{FileTool, ShellTool, DEFAULT_DENY_PATTERNS};
pub use cache::ToolCache;
pub use registry::{InMemoryToolRegistry, ToolRegistry, ToolRunner};
pub use types::{ParamSchema, ParamType, ToolDescriptor, ToolError, ToolResult, ToolSchema, ValidationError};
pub use validation::validate;
