use nix::errno::Errno;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("{0}: event not found")]
    EventNotFound(String),

    #[error("no last entry found")]
    NoLastEntry,

    // Failed system call, with the operation that failed
    #[error("{context}: {source}")]
    Sys {
        context: &'static str,
        #[source]
        source: Errno,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("readline: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}

impl ShellError {
    pub fn sys(context: &'static str, source: Errno) -> Self {
        ShellError::Sys { context, source }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ShellError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn syntax(msg: impl Into<String>) -> Self {
        ShellError::Syntax(msg.into())
    }
}

pub type ShellResult<T> = Result<T, ShellError>;
