use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RESPOutput {
    Array(Vec<RESPOutput>),
    BulkString(String),
    SimpleString(String),
    Error(String),
    Integer(i64),
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserError {
    /// Not enough bytes yet; read more and retry.
    IncompleteInput,
    UnknownType(u8),
    InvalidLength,
    InvalidInput,
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserError::IncompleteInput => write!(f, "Incomplete input"),
            ParserError::UnknownType(byte) => write!(f, "Unknown type byte {:?}", *byte as char),
            ParserError::InvalidLength => write!(f, "Invalid length"),
            ParserError::InvalidInput => write!(f, "Invalid input"),
        }
    }
}

impl std::error::Error for ParserError {}

pub type ParserCRLFResult<'a> = Result<(&'a [u8], &'a [u8]), ParserError>;

pub type ParserResult<'a> = Result<(RESPOutput, &'a [u8]), ParserError>;

// Requests are flat arrays; anything deeper than this is rejected before
// recursion can exhaust the stack.
const MAX_DEPTH: usize = 32;
const MAX_ARRAY_LEN: usize = 1024 * 1024;
const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

pub struct Parser {}

impl Parser {
    /// Parses one frame from the front of `input`, returning it with the
    /// unconsumed remainder.
    pub fn parse(input: &[u8]) -> ParserResult<'_> {
        Parser::parse_at(input, 0)
    }

    fn parse_at(input: &[u8], depth: usize) -> ParserResult<'_> {
        if depth > MAX_DEPTH {
            return Err(ParserError::InvalidInput);
        }
        let Some((&symbol, payload)) = input.split_first() else {
            return Err(ParserError::IncompleteInput);
        };

        match symbol {
            b'*' => Parser::parse_array(payload, depth),
            b'$' => Parser::parse_bulk_string(payload),
            b'+' => {
                let (line, rem) = Parser::parse_until_crlf(payload)?;
                Ok((RESPOutput::SimpleString(String::from_utf8_lossy(line).into_owned()), rem))
            }
            b'-' => {
                let (line, rem) = Parser::parse_until_crlf(payload)?;
                Ok((RESPOutput::Error(String::from_utf8_lossy(line).into_owned()), rem))
            }
            b':' => {
                let (value, rem) = Parser::parse_number(payload)?;
                Ok((RESPOutput::Integer(value), rem))
            }
            other => Err(ParserError::UnknownType(other)),
        }
    }

    fn parse_array(payload: &[u8], depth: usize) -> ParserResult<'_> {
        // *<number of elements>\r\n<element 1>...<element N>
        let (num_elements, mut remaining) = Parser::parse_number(payload)?;
        if num_elements == -1 {
            return Ok((RESPOutput::Null, remaining));
        }
        let num_elements = Parser::check_length(num_elements, MAX_ARRAY_LEN)?;

        let mut elements = Vec::with_capacity(num_elements.min(64));
        for _ in 0..num_elements {
            let (element, rem) = Parser::parse_at(remaining, depth + 1)?;
            elements.push(element);
            remaining = rem;
        }

        Ok((RESPOutput::Array(elements), remaining))
    }

    fn parse_bulk_string(payload: &[u8]) -> ParserResult<'_> {
        // $<number of bytes>\r\n<data>\r\n
        // The data is taken by length, so it may itself contain CRLF.
        let (length, rem) = Parser::parse_number(payload)?;
        if length == -1 {
            return Ok((RESPOutput::Null, rem));
        }
        let length = Parser::check_length(length, MAX_BULK_LEN)?;

        if rem.len() < length + 2 {
            return Err(ParserError::IncompleteInput);
        }
        if &rem[length..length + 2] != b"\r\n" {
            return Err(ParserError::InvalidInput);
        }

        let data = String::from_utf8_lossy(&rem[..length]).into_owned();
        Ok((RESPOutput::BulkString(data), &rem[length + 2..]))
    }

    fn parse_number(input: &[u8]) -> Result<(i64, &[u8]), ParserError> {
        let (digits, rem) = Parser::parse_until_crlf(input)?;
        let number = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(ParserError::InvalidLength)?;
        Ok((number, rem))
    }

    fn check_length(declared: i64, max: usize) -> Result<usize, ParserError> {
        usize::try_from(declared)
            .ok()
            .filter(|length| *length <= max)
            .ok_or(ParserError::InvalidLength)
    }

    fn parse_until_crlf(input: &[u8]) -> ParserCRLFResult<'_> {
        input
            .windows(2)
            .position(|pair| pair == b"\r\n")
            .map(|index| (&input[..index], &input[index + 2..]))
            .ok_or(ParserError::IncompleteInput)
    }
}

impl RESPOutput {
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            RESPOutput::SimpleString(s) => Self::encode_line(buf, b'+', s),
            RESPOutput::Error(s) => Self::encode_line(buf, b'-', s),
            RESPOutput::Integer(i) => {
                buf.put_u8(b':');
                buf.put_slice(i.to_string().as_bytes());
                buf.put_slice(b"\r\n");
            }
            RESPOutput::BulkString(s) => {
                buf.put_u8(b'$');
                buf.put_slice(s.len().to_string().as_bytes());
                buf.put_slice(b"\r\n");
                buf.put_slice(s.as_bytes());
                buf.put_slice(b"\r\n");
            }
            RESPOutput::Null => buf.put_slice(b"$-1\r\n"),
            RESPOutput::Array(elements) => {
                buf.put_u8(b'*');
                buf.put_slice(elements.len().to_string().as_bytes());
                buf.put_slice(b"\r\n");
                for element in elements {
                    element.encode(buf);
                }
            }
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.freeze()
    }

    // Simple strings and errors are single lines; fold any line breaks.
    fn encode_line(buf: &mut BytesMut, prefix: u8, line: &str) {
        buf.put_u8(prefix);
        for byte in line.bytes() {
            buf.put_u8(if byte == b'\r' || byte == b'\n' { b' ' } else { byte });
        }
        buf.put_slice(b"\r\n");
    }
}
