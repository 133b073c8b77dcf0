use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub mod config;
pub mod error;
pub mod parser;
pub mod pattern;
pub mod server;
pub mod store;

use error::{Result, ServiceError};
use parser::{Parser, ParserError, RESPOutput};
use store::KeyValueStore;

// Largest request a connection may buffer while waiting for it to complete.
const MAX_BUFFERED: usize = 64 * 1024 * 1024;

pub async fn handle_connection(mut stream: TcpStream, store: &Mutex<KeyValueStore>) -> Result<()> {
    let mut buffer = BytesMut::with_capacity(4096);

    loop {
        let reply = match next_frame(&mut buffer, MAX_BUFFERED) {
            Ok(Some(frame)) => match Command::from_resp(frame) {
                Ok(command) => command.execute(store).await,
                Err(e) => Err(e),
            },
            Ok(None) => {
                if stream.read_buf(&mut buffer).await? == 0 {
                    return Ok(());
                }
                continue;
            }
            Err(e) => Err(e),
        };

        let reply = match reply {
            Ok(reply) => reply,
            Err(e) if e.is_recoverable() => {
                warn!("request failed: {}", e);
                RESPOutput::Error(format!("ERR {}", e))
            }
            Err(e) => return Err(e),
        };

        stream.write_all(&reply.to_bytes()).await?;
    }
}

/// Pops one complete frame off the front of `buffer`. A malformed or
/// oversized frame discards everything buffered, since its end cannot be
/// located.
fn next_frame(buffer: &mut BytesMut, max_buffered: usize) -> Result<Option<RESPOutput>> {
    let (frame, consumed) = match Parser::parse(buffer) {
        Ok((frame, remaining)) => (frame, buffer.len() - remaining.len()),
        Err(ParserError::IncompleteInput) if buffer.len() > max_buffered => {
            buffer.clear();
            return Err(ServiceError::FrameTooLarge(max_buffered));
        }
        Err(ParserError::IncompleteInput) => return Ok(None),
        Err(e) => {
            buffer.clear();
            return Err(e.into());
        }
    };
    buffer.advance(consumed);
    Ok(Some(frame))
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Ping,
    Echo(String),
    Find { pattern: String, text: String },
    Replace { pattern: String, replacement: String, text: String },
    Set(String, String),
    Del(String),
    Get(String),
    Entries,
}

impl Command {
    pub fn from_resp(resp: RESPOutput) -> Result<Self> {
        match resp {
            RESPOutput::Array(elements) => Self::parse_command(elements),
            _ => Err(ServiceError::InvalidArguments),
        }
    }

    fn parse_command(elements: Vec<RESPOutput>) -> Result<Self> {
        let mut elements = elements.into_iter().map(|element| match element {
            RESPOutput::BulkString(s) | RESPOutput::SimpleString(s) => Ok(s),
            _ => Err(ServiceError::InvalidArguments),
        });

        let name = elements.next().ok_or(ServiceError::InvalidArguments)??;
        let args = elements.collect::<Result<Vec<String>>>()?;

        let command = match name.to_uppercase().as_str() {
            "PING" => {
                take_args::<0>(args)?;
                Command::Ping
            }
            "ECHO" => {
                let [message] = take_args::<1>(args)?;
                Command::Echo(message)
            }
            "FIND" => {
                let [pattern, text] = take_args::<2>(args)?;
                Command::Find { pattern, text }
            }
            "REPLACE" => {
                let [pattern, replacement, text] = take_args::<3>(args)?;
                Command::Replace { pattern, replacement, text }
            }
            "SET" => {
                let [key, value] = take_args::<2>(args)?;
                Command::Set(key, value)
            }
            "DEL" => {
                let [key] = take_args::<1>(args)?;
                Command::Del(key)
            }
            "GET" => {
                let [key] = take_args::<1>(args)?;
                Command::Get(key)
            }
            "ENTRIES" => {
                take_args::<0>(args)?;
                Command::Entries
            }
            _ => return Err(ServiceError::UnknownCommand),
        };

        debug!(?command, "parsed command");
        Ok(command)
    }

    pub async fn execute(&self, store: &Mutex<KeyValueStore>) -> Result<RESPOutput> {
        Ok(match self {
            Command::Ping => RESPOutput::SimpleString("PONG".to_string()),
            Command::Echo(s) => RESPOutput::BulkString(s.clone()),
            Command::Find { pattern, text } => {
                let matches = crate::pattern::find_all(pattern, text)?;
                RESPOutput::Array(matches.into_iter().map(RESPOutput::BulkString).collect())
            }
            Command::Replace { pattern, replacement, text } => {
                RESPOutput::BulkString(crate::pattern::replace_all(pattern, replacement, text)?)
            }
            Command::Set(key, value) => {
                let modified = store.lock().await.add_or_update(key, value.as_str());
                RESPOutput::Integer(modified.into())
            }
            Command::Del(key) => {
                let removed = store.lock().await.delete(key);
                RESPOutput::Integer(removed.into())
            }
            Command::Get(key) => match store.lock().await.get(key) {
                Some(entry) => RESPOutput::BulkString(entry.value().to_string()),
                None => RESPOutput::Null,
            },
            Command::Entries => {
                let store = store.lock().await;
                RESPOutput::Array(
                    store
                        .entries()
                        .flat_map(|entry| {
                            [
                                RESPOutput::BulkString(entry.key().to_string()),
                                RESPOutput::BulkString(entry.value().to_string()),
                            ]
                        })
                        .collect(),
                )
            }
        })
    }
}

fn take_args<const N: usize>(args: Vec<String>) -> Result<[String; N]> {
    args.try_into().map_err(|_| ServiceError::InvalidArguments)
}
