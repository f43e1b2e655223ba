// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! Error types for configuration operations.
//!
//! Every failure carries a stack of breadcrumbs. Inner layers report what went
//! wrong; each enclosing layer pushes one line describing what it was doing,
//! so the rendered message reads from the outermost operation down to the
//! original cause.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[cfg(test)]
#[path = "./error_test.rs"]
mod error_test;

/// Convenience Result type with the configuration Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type returned by configurable callables.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The kinds of failure the configuration core can report.
#[derive(Error, Diagnostic, Debug)]
pub enum ErrorKind {
    /// Generic collapse, conversion or lookup failure
    #[error("{0}")]
    #[diagnostic(code(pkgcore::config::configuration))]
    Configuration(String),

    /// The schema derived for a callable is invalid
    #[error("{0}")]
    #[diagnostic(
        code(pkgcore::config::type_definition),
        help("Check the ConfigHint attached to the configurable")
    )]
    TypeDefinition(String),

    /// Syntax error in a configuration source
    #[error("while parsing {origin}{}: {message}", line_suffix(.line))]
    #[diagnostic(code(pkgcore::config::parsing))]
    Parsing {
        origin: String,
        line: Option<usize>,
        message: String,
    },

    /// Tried to collapse a section marked `inherit-only`
    #[error("cannot collapse inherit-only section")]
    #[diagnostic(
        code(pkgcore::config::inherit_only),
        help("inherit-only sections can only be used as an inherit target")
    )]
    CollapseInheritOnly,

    /// A configured callable failed
    #[error("Caught exception {source} instantiating {callable}")]
    #[diagnostic(
        code(pkgcore::config::instantiation),
        help("Run with debug enabled to see the original error unwrapped")
    )]
    ComplexInstantiation {
        callable: String,
        pargs: Vec<String>,
        kwargs: Vec<(String, String)>,
        #[source]
        source: BoxError,
    },

    /// A configured callable produced nothing
    #[error("No object returned instantiating {callable}")]
    #[diagnostic(code(pkgcore::config::no_object))]
    NoObjectReturned { callable: String },

    /// Mismatched quoting in a list value
    #[error("Unable to parse quoted string {0:?}")]
    #[diagnostic(
        code(pkgcore::config::quoting),
        help("Quotes must be balanced; escape literal quotes with a backslash")
    )]
    QuoteInterpretation(String),

    /// The process lacks permission to access a configuration file
    #[error("permission denied {} {path:?}", access(.write))]
    #[diagnostic(code(pkgcore::config::permission_denied))]
    PermissionDenied {
        path: PathBuf,
        write: bool,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a configuration file
    #[error("failed opening {path:?}")]
    #[diagnostic(code(pkgcore::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from a configured callable, passed through in debug mode
    #[error(transparent)]
    #[diagnostic(code(pkgcore::config::callable))]
    Callable(BoxError),
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|l| format!(", line {l}")).unwrap_or_default()
}

fn copy_io_error(err: &std::io::Error) -> std::io::Error {
    std::io::Error::new(err.kind(), err.to_string())
}

fn access(write: &bool) -> &'static str {
    if *write { "writing" } else { "reading" }
}

/// A configuration failure plus the breadcrumbs collected on the way out.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    stack: Vec<String>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            stack: Vec::new(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration(message.into()))
    }

    pub fn type_definition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeDefinition(message.into()))
    }

    pub fn parsing(origin: impl Into<String>, line: Option<usize>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parsing {
            origin: origin.into(),
            line,
            message: message.into(),
        })
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Breadcrumbs, innermost first.
    pub fn stack(&self) -> &[String] {
        &self.stack
    }

    /// Push a frame describing the enclosing operation.
    pub fn context(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }

    /// Whether this failure only means "this section is a base, not an object".
    pub fn is_inherit_only(&self) -> bool {
        matches!(self.kind, ErrorKind::CollapseInheritOnly)
    }

    /// A copy of this error with the same kind and breadcrumbs.
    ///
    /// Wrapped sources are carried over as their rendered text.
    pub fn duplicate(&self) -> Self {
        let kind = match &self.kind {
            ErrorKind::Configuration(message) => ErrorKind::Configuration(message.clone()),
            ErrorKind::TypeDefinition(message) => ErrorKind::TypeDefinition(message.clone()),
            ErrorKind::Parsing {
                origin,
                line,
                message,
            } => ErrorKind::Parsing {
                origin: origin.clone(),
                line: *line,
                message: message.clone(),
            },
            ErrorKind::CollapseInheritOnly => ErrorKind::CollapseInheritOnly,
            ErrorKind::ComplexInstantiation {
                callable,
                pargs,
                kwargs,
                source,
            } => ErrorKind::ComplexInstantiation {
                callable: callable.clone(),
                pargs: pargs.clone(),
                kwargs: kwargs.clone(),
                source: source.to_string().into(),
            },
            ErrorKind::NoObjectReturned { callable } => ErrorKind::NoObjectReturned {
                callable: callable.clone(),
            },
            ErrorKind::QuoteInterpretation(input) => ErrorKind::QuoteInterpretation(input.clone()),
            ErrorKind::PermissionDenied {
                path,
                write,
                source,
            } => ErrorKind::PermissionDenied {
                path: path.clone(),
                write: *write,
                source: copy_io_error(source),
            },
            ErrorKind::Io { path, source } => ErrorKind::Io {
                path: path.clone(),
                source: copy_io_error(source),
            },
            ErrorKind::Callable(err) => ErrorKind::Callable(err.to_string().into()),
        };
        Self {
            kind,
            stack: self.stack.clone(),
        }
    }

    /// Recover a configuration error that travelled through a callable.
    pub(crate) fn downcast_callable(error: BoxError) -> std::result::Result<Self, BoxError> {
        error.downcast::<Error>().map(|boxed| *boxed)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in self.stack.iter().rev() {
            writeln!(f, "{frame}:")?;
        }
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

impl Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.kind.code()
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.kind.help()
    }
}

/// Attach breadcrumbs to a failing [`Result`].
pub trait ErrorContext<T> {
    fn context(self, frame: impl Into<String>) -> Result<T>;

    fn with_context<F>(self, frame: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ErrorContext<T> for Result<T> {
    fn context(self, frame: impl Into<String>) -> Result<T> {
        self.map_err(|err| err.context(frame))
    }

    fn with_context<F>(self, frame: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| err.context(frame()))
    }
}
