use std::convert::From;
use std::fmt;

use std::io::Error as StdIoError;

/// Coarse classification of a `CtlError`, used by the REPL to decide how an
/// error is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,     // malformed integer/flag value, command dropped
    Grammar,   // unknown operation or missing parameter, command dropped
    Transport, // network failure or undecodable response, command dropped
    Service,   // the service answered with success = false
    Fatal,     // startup aborted or the terminal is gone
}

#[derive(Debug)]
pub enum CtlError {
    Parse { description: String },
    Grammar { description: String },
    Http { inner: reqwest::Error },
    MalformedResponse { inner: serde_json::Error },
    Service { message: String },
    StartupAborted,
    Io { inner: StdIoError },
}

impl CtlError {
    pub fn parse<S: Into<String>>(description: S) -> Self {
        Self::Parse {
            description: description.into(),
        }
    }

    pub fn grammar<S: Into<String>>(description: S) -> Self {
        Self::Grammar {
            description: description.into(),
        }
    }

    pub fn service<S: Into<String>>(message: S) -> Self {
        Self::Service {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CtlError::Parse { .. } => ErrorKind::Parse,
            CtlError::Grammar { .. } => ErrorKind::Grammar,
            CtlError::Http { .. } | CtlError::MalformedResponse { .. } => ErrorKind::Transport,
            CtlError::Service { .. } => ErrorKind::Service,
            CtlError::StartupAborted | CtlError::Io { .. } => ErrorKind::Fatal,
        }
    }
}

impl From<reqwest::Error> for CtlError {
    fn from(e: reqwest::Error) -> CtlError {
        Self::Http { inner: e }
    }
}

impl From<serde_json::Error> for CtlError {
    fn from(e: serde_json::Error) -> CtlError {
        Self::MalformedResponse { inner: e }
    }
}

impl From<StdIoError> for CtlError {
    fn from(e: StdIoError) -> CtlError {
        Self::Io { inner: e }
    }
}

impl fmt::Display for CtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CtlError::Parse { ref description } => write!(f, "parse error: {}", description),
            CtlError::Grammar { ref description } => write!(f, "grammar error: {}", description),
            CtlError::Http { ref inner } => write!(f, "transport error: {}", inner),
            CtlError::MalformedResponse { ref inner } => {
                write!(f, "transport error: malformed response: {}", inner)
            }
            CtlError::Service { ref message } => write!(f, "service error: {}", message),
            CtlError::StartupAborted => write!(f, "initialization aborted before a configuration was bound"),
            CtlError::Io { ref inner } => write!(f, "io error: {}", inner),
        }
    }
}

// Implementing std::error::Error trait.
impl std::error::Error for CtlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            CtlError::Http { ref inner } => Some(inner),
            CtlError::MalformedResponse { ref inner } => Some(inner),
            CtlError::Io { ref inner } => Some(inner),
            _ => None,
        }
    }
}
