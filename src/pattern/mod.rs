mod template;

use regex::{Captures, Regex};
use thiserror::Error;

use template::Template;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("invalid pattern {pattern:?}: {message}{}", at(.offset))]
    InvalidPattern {
        pattern: String,
        message: String,
        offset: Option<usize>,
    },

    #[error("invalid replacement {replacement:?}: {message}{}", at(.offset))]
    InvalidReplacement {
        replacement: String,
        message: String,
        offset: Option<usize>,
    },
}

impl PatternError {
    pub fn offset(&self) -> Option<usize> {
        match self {
            PatternError::InvalidPattern { offset, .. }
            | PatternError::InvalidReplacement { offset, .. } => *offset,
        }
    }
}

fn at(offset: &Option<usize>) -> String {
    match offset {
        Some(offset) => format!(" (at offset {})", offset),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Returns every non-overlapping match of `pattern` in `text`, left to right.
pub fn find_all(pattern: &str, text: &str) -> Result<Vec<String>, PatternError> {
    let regex = compile(pattern)?;
    Ok(regex.find_iter(text).map(|m| m.as_str().to_string()).collect())
}

/// Like [`find_all`], but keeps the position of each match.
pub fn find_all_spans(pattern: &str, text: &str) -> Result<Vec<Match>, PatternError> {
    let regex = compile(pattern)?;
    Ok(regex
        .find_iter(text)
        .map(|m| Match {
            start: m.start(),
            end: m.end(),
            text: m.as_str().to_string(),
        })
        .collect())
}

// Pattern errors are reported before template errors.
pub fn replace_all(pattern: &str, replacement: &str, text: &str) -> Result<String, PatternError> {
    let regex = compile(pattern)?;
    let template = Template::parse(replacement, &regex)?;

    let replaced = regex.replace_all(text, |caps: &Captures<'_>| template.render(caps));
    Ok(replaced.into_owned())
}

fn compile(pattern: &str) -> Result<Regex, PatternError> {
    Regex::new(pattern).map_err(|err| {
        // Re-parse to get the span of the offending construct
        let (message, offset) = match regex_syntax::Parser::new().parse(pattern) {
            Err(regex_syntax::Error::Parse(e)) => (e.kind().to_string(), Some(e.span().start.offset)),
            Err(regex_syntax::Error::Translate(e)) => {
                (e.kind().to_string(), Some(e.span().start.offset))
            }
            _ => (err.to_string(), None),
        };
        PatternError::InvalidPattern {
            pattern: pattern.to_string(),
            message,
            offset,
        }
    })
}
