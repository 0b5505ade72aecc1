//! Documentation index errors.

use std::path::PathBuf;

/// Errors raised while reading a search index shard.
#[derive(Debug, thiserror::Error)]
pub enum DocsError {
    /// The text is not made of the tokens a shard uses.
    #[error("{line}:{col}: {message}")]
    Lex {
        line: usize,
        col: usize,
        message: String,
    },

    /// The tokens do not form `var name = [ ... ];`, or an entry has the
    /// wrong shape.
    #[error("{line}:{col}: {message}")]
    Parse {
        line: usize,
        col: usize,
        message: String,
    },

    /// A shard file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DocsError {
    /// Line and column of a lex or parse error.
    #[must_use]
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            DocsError::Lex { line, col, .. } | DocsError::Parse { line, col, .. } => {
                Some((*line, *col))
            }
            DocsError::Io { .. } => None,
        }
    }
}
