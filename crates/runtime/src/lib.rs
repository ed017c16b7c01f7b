//! picoagent runtime: the turn engine and decision primitives behind the
//! `picoagent` binary — memory recall, skill selection, entropy-gated tool
//! routing, consolidation, and the orchestrating `AgentLoop`.

pub mod agent_loop;
pub mod config;
pub mod consolidation;
pub mod context;
pub mod entropy;
pub mod error;
pub mod hooks;
pub mod memory;
pub mod provider;
pub mod session;
pub mod skills;
pub mod subagent;
pub mod threshold;
pub mod tools;

pub use agent_loop::{AgentLoop, TurnOutcome};
pub use config::Config;
pub use consolidation::DualMemoryStore;
pub use context::{ContextBuilder, ContextMessage};
pub use entropy::{Decision, EntropyScheduler};
pub use error::RuntimeError;
pub use hooks::{Hook, HookContext, HookRegistry};
pub use memory::{MemoryId, MemoryRecord, VectorMemory, VectorMemoryStore};
pub use provider::{AnyProviderClient, FallbackOutcome, FallbackProvider, HttpProviderClient, LocalHeuristicClient, ProviderClient};
pub use session::{HistoryEntry, Role, SessionState, SessionStore};
pub use skills::{SelectionReason, Skill, SkillActivation, SkillLibrary};
pub use subagent::SubagentCoordinator;
pub use threshold::{AdaptiveThreshold, ThresholdConfig, ThresholdSnapshot};
pub use tools::{InMemoryToolRegistry, ToolDescriptor, ToolRegistry, ToolResult};
