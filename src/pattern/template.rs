use regex::{Captures, Regex};

use super::PatternError;

#[derive(Debug, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Group(usize),
}

/// A replacement template resolved against one compiled pattern.
#[derive(Debug)]
pub(super) struct Template {
    pieces: Vec<Piece>,
}

enum Reference<'a> {
    /// `$$`
    Escaped,
    /// `$` with nothing usable after it; kept as a literal dollar.
    Bare,
    /// `$name` or `${name}`; `end` is the byte just past the reference.
    Named { name: &'a str, end: usize },
}

impl Template {
    pub(super) fn parse(replacement: &str, regex: &Regex) -> Result<Self, PatternError> {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut copied = 0;
        let mut pos = 0;

        while let Some(found) = replacement[pos..].find('$') {
            let dollar = pos + found;
            literal.push_str(&replacement[copied..dollar]);

            pos = match reference_at(replacement, dollar) {
                Reference::Escaped => {
                    literal.push('$');
                    dollar + 2
                }
                Reference::Bare => {
                    literal.push('$');
                    dollar + 1
                }
                Reference::Named { name, end } => {
                    let group = resolve(name, regex).ok_or_else(|| PatternError::InvalidReplacement {
                        replacement: replacement.to_string(),
                        message: format!("no group {:?} in pattern", name),
                        offset: Some(dollar),
                    })?;
                    if !literal.is_empty() {
                        pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                    }
                    pieces.push(Piece::Group(group));
                    end
                }
            };
            copied = pos;
        }

        literal.push_str(&replacement[copied..]);
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }

        Ok(Self { pieces })
    }

    pub(super) fn render(&self, caps: &Captures<'_>) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Group(index) => {
                    if let Some(m) = caps.get(*index) {
                        out.push_str(m.as_str());
                    }
                }
            }
        }
        out
    }
}

fn reference_at(replacement: &str, dollar: usize) -> Reference<'_> {
    let rest = &replacement[dollar + 1..];

    if rest.starts_with('$') {
        return Reference::Escaped;
    }

    if let Some(braced) = rest.strip_prefix('{') {
        return match braced.find('}') {
            Some(close) if close > 0 => Reference::Named {
                name: &braced[..close],
                end: dollar + close + 3,
            },
            _ => Reference::Bare,
        };
    }

    let len = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    if len == 0 {
        Reference::Bare
    } else {
        Reference::Named {
            name: &rest[..len],
            end: dollar + 1 + len,
        }
    }
}

fn resolve(name: &str, regex: &Regex) -> Option<usize> {
    if name.bytes().all(|b| b.is_ascii_digit()) {
        let index: usize = name.parse().ok()?;
        (index < regex.captures_len()).then_some(index)
    } else {
        regex.capture_names().position(|n| n == Some(name))
    }
}
