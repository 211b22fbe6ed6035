//! Syntax highlighting for fenced code blocks.
//!
//! Two kinds of highlighters exist. [`SyntaxHighlighter`] runs in-process and
//! knows the grammars bundled with `syntect`. The [`Highlight`] trait covers
//! the narrow collaborator used for the author's own markup language, whose
//! default implementation ([`ExternalHighlighter`]) shells out to a command.
//! Every failure is reported as `None` so callers can fall back to plain text.

use log::{debug, warn};
use std::fmt;
use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

/// Converts source code of one specific language into highlighted markup.
/// Returns `None` when no highlighting is available.
pub trait Highlight {
    fn highlight(&self, code: &str) -> Option<String>;
}

impl<F> Highlight for F
where
    F: Fn(&str) -> Option<String>,
{
    fn highlight(&self, code: &str) -> Option<String> {
        self(code)
    }
}

/// A [`Highlight`] that never highlights anything.
pub struct NoHighlighter;

impl Highlight for NoHighlighter {
    fn highlight(&self, _: &str) -> Option<String> {
        None
    }
}

/// Pipes code through an external command: the code goes in on stdin and the
/// markup comes back on stdout. A spawn failure, a non-zero exit, any output
/// on stderr, or non-UTF-8 output all count as "no highlighting".
pub struct ExternalHighlighter {
    program: String,
    args: Vec<String>,
}

impl ExternalHighlighter {
    /// Builds a highlighter from a command line (`program arg1 arg2 ...`).
    /// Returns `None` for an empty command line.
    pub fn new(command: &[String]) -> Option<ExternalHighlighter> {
        let (program, args) = command.split_first()?;
        Some(ExternalHighlighter {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn run(&self, code: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // stdin is fed from its own thread while `wait_with_output` drains
        // stdout and stderr, so a command that writes as it reads can't fill
        // a pipe and stall us. Dropping `stdin` at the end closes the pipe.
        let stdin = child.stdin.take();
        let input = code.to_owned();
        let writer = thread::spawn(move || -> io::Result<()> {
            if let Some(mut stdin) = stdin {
                stdin.write_all(input.as_bytes())?;
            }
            Ok(())
        });

        let output = child.wait_with_output()?;
        let written = writer.join().map_err(|_| {
            Error::Io(io::Error::new(io::ErrorKind::Other, "stdin writer panicked"))
        })?;
        if !output.status.success() {
            return Err(Error::Status(output.status.code()));
        }
        if !output.stderr.is_empty() {
            return Err(Error::Stderr(
                String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            ));
        }
        written?;
        String::from_utf8(output.stdout).map_err(|_| Error::InvalidUtf8)
    }
}

impl Highlight for ExternalHighlighter {
    fn highlight(&self, code: &str) -> Option<String> {
        match self.run(code) {
            Ok(markup) => Some(markup),
            Err(err) => {
                warn!(
                    "highlighter `{}` failed, falling back to plain text: {}",
                    self.program, err
                );
                None
            }
        }
    }
}

/// In-process highlighting for the grammars bundled with `syntect`. The
/// output uses CSS classes rather than inline styles so the site stylesheet
/// decides the colors.
pub struct SyntaxHighlighter {
    syntaxes: SyntaxSet,
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        SyntaxHighlighter::new()
    }
}

impl SyntaxHighlighter {
    pub fn new() -> SyntaxHighlighter {
        SyntaxHighlighter {
            syntaxes: SyntaxSet::load_defaults_newlines(),
        }
    }

    /// Reports whether `language` names (or is a file extension of) a known
    /// grammar.
    pub fn supports(&self, language: &str) -> bool {
        self.syntaxes.find_syntax_by_token(language).is_some()
    }

    /// Highlights `code` as `language`. Returns `None` for unknown languages
    /// and for grammars that fail mid-way.
    pub fn highlight(&self, code: &str, language: &str) -> Option<String> {
        let syntax = self.syntaxes.find_syntax_by_token(language)?;
        let mut generator = ClassedHTMLGenerator::new_with_class_style(
            syntax,
            &self.syntaxes,
            ClassStyle::Spaced,
        );
        for line in LinesWithEndings::from(code) {
            if let Err(err) = generator.parse_html_for_line_which_includes_newline(line) {
                debug!("highlighting `{}` failed: {}", language, err);
                return None;
            }
        }
        Some(generator.finalize())
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Why an external highlighter produced nothing. Only ever logged.
#[derive(Debug)]
pub enum Error {
    /// The command couldn't be spawned or its pipes failed.
    Io(io::Error),

    /// The command exited unsuccessfully (`None` when killed by a signal).
    Status(Option<i32>),

    /// The command wrote to stderr.
    Stderr(String),

    /// The command's stdout wasn't UTF-8.
    InvalidUtf8,
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Status(Some(code)) => write!(f, "exited with status {}", code),
            Error::Status(None) => write!(f, "terminated by signal"),
            Error::Stderr(msg) => write!(f, "wrote to stderr: {}", msg),
            Error::InvalidUtf8 => write!(f, "output is not valid UTF-8"),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use the
    /// `?` operator around process plumbing.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn command(args: &[&str]) -> ExternalHighlighter {
        ExternalHighlighter::new(&args.iter().map(|s| s.to_string()).collect::<Vec<_>>())
            .unwrap()
    }

    #[test]
    fn test_empty_command() {
        assert!(ExternalHighlighter::new(&[]).is_none());
    }

    #[test]
    #[cfg(unix)]
    fn test_external_echoes_stdout() {
        assert_eq!(
            Some("#let x = 1".to_owned()),
            command(&["cat"]).highlight("#let x = 1")
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_external_large_block() {
        // Well past the size of a pipe buffer in both directions.
        let code = "let x = 1;\n".repeat(100_000);
        assert_eq!(Some(code.clone()), command(&["cat"]).highlight(&code));
    }

    #[test]
    #[cfg(unix)]
    fn test_external_ignores_stdin() {
        let code = "x".repeat(1 << 20);
        assert_eq!(None, command(&["sh", "-c", "exit 1"]).highlight(&code));
    }

    #[test]
    #[cfg(unix)]
    fn test_external_nonzero_exit() {
        assert_eq!(None, command(&["sh", "-c", "exit 3"]).highlight("code"));
    }

    #[test]
    #[cfg(unix)]
    fn test_external_stderr() {
        assert_eq!(
            None,
            command(&["sh", "-c", "echo oops >&2; echo out"]).highlight("code")
        );
    }

    #[test]
    fn test_external_missing_program() {
        assert_eq!(
            None,
            command(&["definitely-not-a-real-highlighter-binary"]).highlight("code")
        );
    }

    #[test]
    fn test_closure_highlighter() {
        let upper = |code: &str| Some(code.to_uppercase());
        assert_eq!(Some("ABC".to_owned()), upper.highlight("abc"));
        assert_eq!(None, NoHighlighter.highlight("abc"));
    }

    #[test]
    fn test_syntax_highlighter() {
        let highlighter = SyntaxHighlighter::new();
        assert!(highlighter.supports("rust"));
        assert!(highlighter.supports("rs"));
        assert!(!highlighter.supports("klingon"));

        let html = highlighter
            .highlight("fn main() {}\n", "rust")
            .expect("rust should highlight");
        assert!(html.contains("<span class="));
        assert!(html.contains("main"));
        assert_eq!(None, highlighter.highlight("x", "klingon"));
    }
}
