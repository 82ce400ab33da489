use formats::ParseError;

use crate::sink::SinkError;
use crate::transport::TransportError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoadErrorKind {
    Transport,
    Parse,
    Sink,
    Cancelled,
}

/// Why a load session stopped early.
#[derive(Debug)]
pub enum LoadError {
    Transport(TransportError),
    Parse(ParseError),
    /// Chunks appended before the rejected one stay in the sink.
    Sink(SinkError),
    Cancelled,
}

impl LoadError {
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            LoadError::Transport(_) => LoadErrorKind::Transport,
            LoadError::Parse(_) => LoadErrorKind::Parse,
            LoadError::Sink(_) => LoadErrorKind::Sink,
            LoadError::Cancelled => LoadErrorKind::Cancelled,
        }
    }
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Transport(e) => write!(f, "{e}"),
            LoadError::Parse(e) => write!(f, "parse error: {e}"),
            LoadError::Sink(e) => write!(f, "sink rejected chunk: {e}"),
            LoadError::Cancelled => write!(f, "load cancelled"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Transport(e) => Some(e),
            LoadError::Parse(e) => Some(e),
            LoadError::Sink(e) => Some(e),
            LoadError::Cancelled => None,
        }
    }
}

impl From<TransportError> for LoadError {
    fn from(e: TransportError) -> Self {
        LoadError::Transport(e)
    }
}

impl From<ParseError> for LoadError {
    fn from(e: ParseError) -> Self {
        LoadError::Parse(e)
    }
}

impl From<SinkError> for LoadError {
    fn from(e: SinkError) -> Self {
        LoadError::Sink(e)
    }
}
