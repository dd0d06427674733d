// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use crate::error::CliError;

/// Write the command output to stdout, or the error to stderr, and
/// terminate with the matching exit code.
pub(crate) fn finish(result: Result<String, CliError>) -> ! {
    let code = match result {
        Ok(output) => {
            let output = output.trim_end_matches('\n');
            if !output.is_empty() {
                // EPIPE when piped into `head` is ignored.
                let _ = writeln!(std::io::stdout().lock(), "{output}");
            }
            0
        }
        Err(e) => {
            let _ = writeln!(std::io::stderr().lock(), "{}", e.error_msg);
            e.code
        }
    };
    std::process::exit(code)
}
