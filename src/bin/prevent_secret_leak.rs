//! PreToolUse hook for Write/Edit/MultiEdit: blocks credentials in file content.

use aco_hook_guard::hook::{self, HookKind};
use aco_hook_guard::logging;
use aco_hook_guard::output::EXIT_WRITE_FAILED;

use std::io::{self, Read, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    logging::init();

    // Unreadable stdin is handled as empty input by the fail policy
    let mut raw = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut raw) {
        tracing::warn!(error = %e, "failed to read stdin");
        raw.clear();
    }

    let out = hook::run(HookKind::PreventSecretLeak, &raw);

    let mut stdout = io::stdout().lock();
    if writeln!(stdout, "{}", out.stdout).and_then(|_| stdout.flush()).is_err() {
        return ExitCode::from(EXIT_WRITE_FAILED);
    }
    ExitCode::from(out.exit_code)
}
