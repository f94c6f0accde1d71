//! Output formatting and response generation.

mod redaction;
mod response;

pub use redaction::redact_secrets;
pub use response::{
    EXIT_BLOCK, EXIT_OK, EXIT_WRITE_FAILED, HookOutput, render_decision, render_verdict,
};
