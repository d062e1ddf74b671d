//! One-line command descriptions from manual pages.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Failure to produce a description. The message is sent to the channel.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("No man page found")]
    NotFound,
    #[error("Unable to parse manpage")]
    Unparseable,
    #[error("man timed out after {0:?}")]
    Timeout(Duration),
    #[error("man could not be run: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Renders a manual page as plain text.
#[async_trait]
pub trait ManRenderer: Send + Sync {
    async fn render(&self, command: &str, section: Option<&str>) -> Result<String, LookupError>;
}

/// Runs `man --pager cat [section] -- <command>`.
pub struct ManCommand {
    program: String,
    timeout: Duration,
}

impl ManCommand {
    pub fn new(timeout: Duration) -> Self {
        Self::with_program("man", timeout)
    }

    /// Use another executable in place of `man`.
    pub fn with_program(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ManRenderer for ManCommand {
    async fn render(&self, command: &str, section: Option<&str>) -> Result<String, LookupError> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.arg("--pager").arg("cat");
        if let Some(section) = section {
            cmd.arg(section);
        }
        cmd.arg("--").arg(command);

        // Wide output keeps the first sentence of DESCRIPTION on one line.
        cmd.env("MANWIDTH", "1000");
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => return Err(LookupError::Timeout(self.timeout)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(
                command,
                code = output.status.code().unwrap_or(-1),
                stderr = %stderr.trim(),
                "man exited unsuccessfully"
            );
            return Err(LookupError::NotFound);
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Look up `command` and return the first sentence of its DESCRIPTION.
pub async fn describe(
    renderer: &dyn ManRenderer,
    command: &str,
    section: Option<&str>,
) -> Result<String, LookupError> {
    let page = renderer.render(command, section).await?;
    parse_description(&page)
}

/// Extract the description from a rendered page.
///
/// The first non-empty line after a line ending in `DESCRIPTION` is taken,
/// up to its first period.
pub fn parse_description(page: &str) -> Result<String, LookupError> {
    if page.trim().is_empty() {
        return Err(LookupError::NotFound);
    }

    let mut seen_heading = false;
    for line in page.lines().map(str::trim) {
        if seen_heading {
            if line.is_empty() {
                continue;
            }
            let sentence = line.split_once('.').map_or(line, |(head, _)| head);
            return Ok(sentence.to_string());
        }
        if line.ends_with("DESCRIPTION") {
            seen_heading = true;
        }
    }

    Err(LookupError::Unparseable)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRINTF_PAGE: &str = "\
PRINTF(1)                 User Commands                PRINTF(1)

NAME
       printf - format and print data

SYNOPSIS
       printf FORMAT [ARGUMENT]...

DESCRIPTION
       Print ARGUMENT(s) according to FORMAT. Interprets escapes.

       --help display this help and exit
";

    #[test]
    fn test_parse_description_skips_blank_line() {
        let page = "NAME DESCRIPTION\n\nDoes a thing. More info.\n";
        assert_eq!(parse_description(page).unwrap(), "Does a thing");
    }

    #[test]
    fn test_parse_description_real_layout() {
        assert_eq!(
            parse_description(PRINTF_PAGE).unwrap(),
            "Print ARGUMENT(s) according to FORMAT"
        );
    }

    #[test]
    fn test_parse_description_without_period() {
        let page = "DESCRIPTION\n   Lists directory contents\n";
        assert_eq!(parse_description(page).unwrap(), "Lists directory contents");
    }

    #[test]
    fn test_parse_description_errors() {
        assert!(matches!(parse_description(""), Err(LookupError::NotFound)));
        assert!(matches!(parse_description(" \n\n"), Err(LookupError::NotFound)));
        assert!(matches!(
            parse_description("NAME\n  foo - bar\n"),
            Err(LookupError::Unparseable)
        ));
        assert!(matches!(
            parse_description("NAME\nDESCRIPTION\n\n   \n"),
            Err(LookupError::Unparseable)
        ));
    }

    #[test]
    fn test_error_messages_are_user_facing() {
        assert_eq!(LookupError::NotFound.to_string(), "No man page found");
        assert_eq!(LookupError::Unparseable.to_string(), "Unable to parse manpage");
    }

    struct FixedPage(&'static str);

    #[async_trait]
    impl ManRenderer for FixedPage {
        async fn render(&self, _: &str, _: Option<&str>) -> Result<String, LookupError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_describe_uses_renderer() {
        let text = describe(&FixedPage(PRINTF_PAGE), "printf", Some("1")).await.unwrap();
        assert_eq!(text, "Print ARGUMENT(s) according to FORMAT");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_man_command_arguments() {
        // `echo` prints the argument vector the real `man` would receive.
        let man = ManCommand::with_program("echo", Duration::from_secs(5));
        let out = man.render("printf", Some("3")).await.unwrap();
        assert_eq!(out.trim(), "--pager cat 3 -- printf");

        let out = man.render("ls", None).await.unwrap();
        assert_eq!(out.trim(), "--pager cat -- ls");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_man_command_failure_is_not_found() {
        let man = ManCommand::with_program("false", Duration::from_secs(5));
        assert!(matches!(
            man.render("nosuchcommand", None).await,
            Err(LookupError::NotFound)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_man_command_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow-man");
        std::fs::write(&script, "#!/bin/sh\nsleep 10\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let man = ManCommand::with_program(script.to_string_lossy(), Duration::from_millis(300));
        let started = std::time::Instant::now();
        let err = man.render("printf", None).await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(matches!(err, LookupError::Timeout(d) if d == Duration::from_millis(300)));
        assert_eq!(err.to_string(), "man timed out after 300ms");
    }

    #[tokio::test]
    async fn test_man_command_missing_program() {
        let man = ManCommand::with_program("/nonexistent/tonto-man", Duration::from_secs(5));
        assert!(matches!(man.render("ls", None).await, Err(LookupError::Spawn(_))));
    }
}
