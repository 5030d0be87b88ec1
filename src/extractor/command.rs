//! Extraction through an external command.
//!
//! The command receives the full request (instructions plus block) on stdin
//! and must print the service reply on stdout. A non-zero exit is classified
//! from its stderr, so a wrapper script that prints `429` gets retried.
//!
//! The request is written from a helper thread while the reply is collected,
//! so neither side blocks on a full pipe. A command that exits without
//! reading all of its input is judged by its exit status and output alone.

use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;

use tracing::debug;

use super::{ExtractError, Extraction, RecipeExtractor, build_request, parse_reply};

/// Runs a program per block.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
}

impl CommandExtractor {
    /// Creates an extractor running `program` with `args`.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Splits a command line on whitespace.
    ///
    /// Returns `None` for a blank command line.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program, parts))
    }

    /// The program being run.
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl RecipeExtractor for CommandExtractor {
    fn extract(&mut self, block: &str) -> Result<Extraction, ExtractError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExtractError::Service(format!("cannot start {}: {e}", self.program)))?;

        let writer = child.stdin.take().map(|mut stdin| {
            let request = build_request(block);
            thread::spawn(move || stdin.write_all(request.as_bytes()))
        });

        let output = child
            .wait_with_output()
            .map_err(|e| ExtractError::Service(format!("command failed: {e}")))?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
                    debug!("command closed stdin before reading the whole request");
                }
                Ok(Err(e)) => {
                    return Err(ExtractError::Service(format!("cannot write request: {e}")));
                }
                Err(_) => {
                    return Err(ExtractError::Service("request writer panicked".into()));
                }
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr
            };
            return Err(ExtractError::classify(message));
        }

        let reply = String::from_utf8_lossy(&output.stdout);
        debug!(bytes = reply.len(), "received extraction reply");
        parse_reply(&reply)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandExtractor {
        CommandExtractor::new("sh", ["-c", script])
    }

    #[test]
    fn test_reply_from_stdout() {
        let mut extractor =
            sh(r#"cat > /dev/null; echo '{"recetas": [{"creador": "Ana", "ingredientes": "harina"}]}'"#);
        let extraction = extractor.extract("[01/10/25 18:02:13] Ana: Flan").unwrap();
        assert_eq!(extraction.recipes[0].creator, "Ana");
    }

    #[test]
    fn test_request_reaches_stdin() {
        let mut extractor = sh(
            r#"if grep -q 'Ana: Flan'; then echo '{"recipes": []}'; else echo nope; fi"#,
        );
        assert!(extractor.extract("[01/10/25 18:02:13] Ana: Flan").is_ok());
    }

    #[test]
    fn test_command_ignoring_large_request() {
        let mut extractor = sh(r#"echo '{"recetas": []}'"#);
        let block = "[01/10/25 18:02:13] Ana: - 200g harina\n".repeat(8_000);
        let extraction = extractor.extract(&block).unwrap();
        assert!(extraction.recipes.is_empty());
    }

    #[test]
    fn test_large_request_with_early_reply() {
        let mut extractor = sh(r#"echo '{"recetas": []}'; cat > /dev/null"#);
        let block = "- 1 kg tomates\n".repeat(40_000);
        assert!(extractor.extract(&block).is_ok());
    }

    #[test]
    fn test_capacity_failure_is_transient() {
        let mut extractor = sh("cat > /dev/null; echo 'HTTP 429 rate limited' >&2; exit 1");
        let err = extractor.extract("x").unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_other_failure_is_service_error() {
        let mut extractor = sh("cat > /dev/null; exit 3");
        assert!(matches!(
            extractor.extract("x"),
            Err(ExtractError::Service(_))
        ));
    }

    #[test]
    fn test_missing_program() {
        let mut extractor = CommandExtractor::new("recipack-no-such-program", Vec::<String>::new());
        assert!(matches!(
            extractor.extract("x"),
            Err(ExtractError::Service(_))
        ));
    }

    #[test]
    fn test_from_command_line() {
        let extractor = CommandExtractor::from_command_line("python3 extract.py --fast").unwrap();
        assert_eq!(extractor.program(), "python3");
        assert_eq!(extractor.args, vec!["extract.py", "--fast"]);
        assert!(CommandExtractor::from_command_line("  ").is_none());
    }
}
