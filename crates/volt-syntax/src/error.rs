//! Error handling types and utilities for the Volt template compiler.
//!
//! Every stage of the pipeline (lexer, parser, inheritance resolver, code
//! generator and the compiler facade) reports failures through the single
//! [`Error`] type defined here. Errors carry a [`ErrorKind`] so callers can
//! branch on the category, a user-facing message, and optional location
//! information: the name of the template source and the 1-based line.
//!
//! The rendered message is meant to be shown verbatim to template authors:
//!
//! ```text
//! Syntax error, unexpected token ++ in eval code on line 1
//! Unknown filter "unknown" in views/index.volt on line 3
//! ```
//!
//! # Examples
//!
//! ```rust
//! use volt_syntax::error::{Error, ErrorKind, Result, error_at};
//!
//! fn check_filter(name: &str, line: usize) -> Result<()> {
//!     if name == "upper" {
//!         Ok(())
//!     } else {
//!         error_at(ErrorKind::UnknownFilter, line, format!("Unknown filter \"{}\"", name))
//!     }
//! }
//!
//! let err = check_filter("nope", 2).unwrap_err().in_source("eval code");
//! assert_eq!(err.to_string(), "Unknown filter \"nope\" in eval code on line 2");
//! ```

use std::fmt;

/// Category of a compilation failure.
///
/// The kinds map one-to-one to the stages that can reject a template:
///
/// - [`Scanning`](ErrorKind::Scanning): the lexer met text it cannot tokenize
/// - [`Syntax`](ErrorKind::Syntax): the parser could not build a statement or expression
/// - [`Structural`](ErrorKind::Structural): `extends` placement or child-template content rules
/// - [`UnknownFilter`](ErrorKind::UnknownFilter): a literal filter name with no mapping
/// - [`UnknownFilterType`](ErrorKind::UnknownFilterType): a filter written as a computed expression
/// - [`Resolution`](ErrorKind::Resolution): an `extends`/`include` target could not be located,
///   or the inheritance chain loops back on itself
/// - [`Io`](ErrorKind::Io): compiled output could not be persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Scanning,
    Syntax,
    Structural,
    UnknownFilter,
    UnknownFilterType,
    Resolution,
    Io,
}

impl ErrorKind {
    /// Short human label used by diagnostics front ends.
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Scanning => "Scanning error",
            ErrorKind::Syntax => "Syntax error",
            ErrorKind::Structural => "Structure error",
            ErrorKind::UnknownFilter | ErrorKind::UnknownFilterType => "Filter error",
            ErrorKind::Resolution => "Resolution error",
            ErrorKind::Io => "I/O error",
        }
    }
}

/// An error that occurred while compiling a template.
///
/// # Fields
///
/// - `kind`: the failing stage, see [`ErrorKind`]
/// - `msg`: human-readable description without location suffix
/// - `source`: template name (`eval code` for string compiles, the path otherwise)
/// - `line`: optional 1-based line number in that template
///
/// # Examples
///
/// ```rust
/// use volt_syntax::{Error, ErrorKind};
///
/// let err = Error::new(ErrorKind::Syntax, "Syntax error, unexpected EOF");
/// assert_eq!(err.to_string(), "Syntax error, unexpected EOF");
///
/// let err = Error::with_line(ErrorKind::Syntax, "Syntax error, unexpected token IF", 4)
///     .in_source("eval code");
/// assert_eq!(err.to_string(), "Syntax error, unexpected token IF in eval code on line 4");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// Stage that rejected the template
    pub kind: ErrorKind,

    /// Human-readable error message
    pub msg: String,

    /// Name of the template the error points into
    pub source: Option<String>,

    /// Optional line number in the template (1-based)
    pub line: Option<usize>,
}

impl Error {
    /// Creates a new error without location information.
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            msg: msg.into(),
            source: None,
            line: None,
        }
    }

    /// Creates a new error pointing at `line` of the current template.
    pub fn with_line(kind: ErrorKind, msg: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            msg: msg.into(),
            source: None,
            line: Some(line),
        }
    }

    /// Attaches the template name, unless a nested compile already did.
    ///
    /// Errors raised while compiling an included or extended template are
    /// tagged with that template's path first; the outer compile must not
    /// overwrite it, otherwise the line number would point into the wrong file.
    pub fn in_source(mut self, name: impl Into<String>) -> Self {
        if self.source.is_none() {
            self.source = Some(name.into());
        }
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg)?;
        if let Some(source) = &self.source {
            write!(f, " in {}", source)?;
        }
        if let Some(line) = self.line {
            write!(f, " on line {}", line)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::new(ErrorKind::Io, e.to_string())
    }
}

/// A specialized `Result` type for Volt compilation.
pub type Result<T> = std::result::Result<T, Error>;

/// Convenience function to create an error result without location.
///
/// ```rust
/// use volt_syntax::error::{ErrorKind, Result, error};
///
/// fn load(path: &str) -> Result<String> {
///     error(ErrorKind::Resolution, format!("Template file {} could not be opened", path))
/// }
/// assert!(load("missing.volt").is_err());
/// ```
pub fn error<T>(kind: ErrorKind, msg: impl Into<String>) -> Result<T> {
    Err(Error::new(kind, msg))
}

/// Convenience function to create an error result at a template line.
pub fn error_at<T>(kind: ErrorKind, line: usize, msg: impl Into<String>) -> Result<T> {
    Err(Error::with_line(kind, msg, line))
}
