use std::io;
use thiserror::Error;

use crate::parser::ParserError;
use crate::pattern::PatternError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Parser error: {0}")]
    Parser(#[from] ParserError),

    #[error("{0}")]
    Pattern(#[from] PatternError),

    #[error("Unknown command")]
    UnknownCommand,

    #[error("Invalid command arguments")]
    InvalidArguments,

    #[error("Request exceeds {0} bytes")]
    FrameTooLarge(usize),
}

impl ServiceError {
    /// Whether the client can be told about this and keep the connection.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ServiceError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
