//! Tool analysis entry points, one classifier per hook.

mod bash;
mod fetch;
mod readonly;
mod references;
mod write;

pub use bash::CommandGuard;
pub use fetch::UrlValidator;
pub use readonly::ReadOnlyGuard;
pub use references::{Invalid, Reference, ReferenceVerifier, Report};
pub use write::{SecretScanner, decode_candidate};
