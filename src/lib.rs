//! ACO Hook Guard - Claude Code security hooks.
//!
//! Five small hooks sharing one library: a secret scanner for file writes,
//! a command classifier for Bash and MCP command runners, a URL validator
//! for web fetches, a Stop-time verifier for `file:line` references, and a
//! read-only command gate for audit sub-agents.

pub mod analysis;
pub mod audit;
pub mod config;
pub mod decision;
pub mod hook;
pub mod input;
pub mod logging;
pub mod net;
pub mod output;
pub mod rules;
pub mod transcript;

pub use config::Config;
pub use decision::{Decision, Verdict};
pub use hook::{HookKind, run};
pub use input::HookInput;
pub use output::HookOutput;
