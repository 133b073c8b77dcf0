use bytes::BytesMut;
use textdesk::parser::{Parser, ParserError, RESPOutput};
use textdesk::server::Server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

struct Client {
    stream: TcpStream,
    buffer: BytesMut,
}

impl Client {
    async fn connect(server: &Server) -> Self {
        let stream = TcpStream::connect(server.local_addr().unwrap()).await.unwrap();
        Self {
            stream,
            buffer: BytesMut::new(),
        }
    }

    async fn call(&mut self, parts: &[&str]) -> RESPOutput {
        let request = RESPOutput::Array(
            parts
                .iter()
                .map(|p| RESPOutput::BulkString(p.to_string()))
                .collect(),
        );
        self.send_raw(&request.to_bytes()).await
    }

    async fn send_raw(&mut self, bytes: &[u8]) -> RESPOutput {
        self.stream.write_all(bytes).await.unwrap();
        self.read_reply().await
    }

    async fn read_reply(&mut self) -> RESPOutput {
        loop {
            match Parser::parse(&self.buffer) {
                Ok((reply, rest)) => {
                    let consumed = self.buffer.len() - rest.len();
                    let _ = self.buffer.split_to(consumed);
                    return reply;
                }
                Err(ParserError::IncompleteInput) => {
                    let n = self.stream.read_buf(&mut self.buffer).await.unwrap();
                    assert!(n > 0, "server closed the connection");
                }
                Err(e) => panic!("bad reply: {e}"),
            }
        }
    }
}

fn bulk(s: &str) -> RESPOutput {
    RESPOutput::BulkString(s.to_string())
}

async fn spawn_server() -> Server {
    Server::new("127.0.0.1", 0).await.unwrap()
}

#[tokio::test]
async fn serves_pattern_and_table_commands() {
    let server = spawn_server().await;
    let mut client = Client::connect(&server).await;
    let handle = tokio::spawn(async move { server.start().await });

    assert_eq!(client.call(&["PING"]).await, RESPOutput::SimpleString("PONG".into()));
    assert_eq!(
        client.call(&["FIND", r"\d+", "a12b345"]).await,
        RESPOutput::Array(vec![bulk("12"), bulk("345")])
    );
    assert_eq!(
        client
            .call(&["REPLACE", r"(\w+)@(\w+)", "$2@$1", "alice@wonderland"])
            .await,
        bulk("wonderland@alice")
    );

    assert_eq!(client.call(&["SET", "x", "1"]).await, RESPOutput::Integer(1));
    assert_eq!(client.call(&["SET", "y", "2"]).await, RESPOutput::Integer(1));
    assert_eq!(client.call(&["SET", "x", "9"]).await, RESPOutput::Integer(1));
    assert_eq!(client.call(&["DEL", "missing"]).await, RESPOutput::Integer(0));
    assert_eq!(
        client.call(&["ENTRIES"]).await,
        RESPOutput::Array(vec![bulk("x"), bulk("9"), bulk("y"), bulk("2")])
    );
    assert_eq!(client.call(&["DEL", "x"]).await, RESPOutput::Integer(1));
    assert_eq!(
        client.call(&["ENTRIES"]).await,
        RESPOutput::Array(vec![bulk("y"), bulk("2")])
    );

    handle.abort();
}

#[tokio::test]
async fn bad_input_gets_error_reply_and_connection_survives() {
    let server = spawn_server().await;
    let mut client = Client::connect(&server).await;
    let handle = tokio::spawn(async move { server.start().await });

    match client.call(&["FIND", "(", "text"]).await {
        RESPOutput::Error(message) => assert!(message.starts_with("ERR invalid pattern")),
        other => panic!("expected error reply, got {other:?}"),
    }
    match client.call(&["REPLACE", "(a)", "$2", "a"]).await {
        RESPOutput::Error(message) => assert!(message.contains("invalid replacement")),
        other => panic!("expected error reply, got {other:?}"),
    }
    assert!(matches!(client.call(&["NOPE"]).await, RESPOutput::Error(_)));
    assert!(matches!(client.send_raw(b"?junk\r\n").await, RESPOutput::Error(_)));

    assert_eq!(client.call(&["PING"]).await, RESPOutput::SimpleString("PONG".into()));

    handle.abort();
}

#[tokio::test]
async fn multiline_text_and_split_writes() {
    let server = spawn_server().await;
    let store = server.store();
    let mut client = Client::connect(&server).await;
    let handle = tokio::spawn(async move { server.start().await });

    let request = RESPOutput::Array(vec![bulk("SET"), bulk("note"), bulk("line one\r\nline two")]).to_bytes();
    let (head, tail) = request.split_at(9);
    client.stream.write_all(head).await.unwrap();
    client.stream.flush().await.unwrap();
    assert_eq!(client.send_raw(tail).await, RESPOutput::Integer(1));

    assert_eq!(client.call(&["GET", "note"]).await, bulk("line one\r\nline two"));
    assert_eq!(
        client.call(&["FIND", "(?m)^line \\w+$", "line one\nline two"]).await,
        RESPOutput::Array(vec![bulk("line one"), bulk("line two")])
    );

    let store = store.lock().await;
    assert_eq!(store.get("note").map(|e| e.value()), Some("line one\r\nline two"));

    handle.abort();
}

#[tokio::test]
async fn connections_share_one_table() {
    let server = spawn_server().await;
    let mut first = Client::connect(&server).await;
    let mut second = Client::connect(&server).await;
    let handle = tokio::spawn(async move { server.start().await });

    assert_eq!(first.call(&["SET", "shared", "yes"]).await, RESPOutput::Integer(1));
    assert_eq!(second.call(&["GET", "shared"]).await, bulk("yes"));
    assert_eq!(second.call(&["DEL", "shared"]).await, RESPOutput::Integer(1));
    assert_eq!(first.call(&["GET", "shared"]).await, RESPOutput::Null);

    handle.abort();
}

#[tokio::test]
async fn deeply_nested_request_is_refused_without_killing_server() {
    let server = spawn_server().await;
    let mut attacker = Client::connect(&server).await;
    let mut bystander = Client::connect(&server).await;
    let handle = tokio::spawn(async move { server.start().await });

    assert_eq!(bystander.call(&["SET", "kept", "yes"]).await, RESPOutput::Integer(1));

    match attacker.send_raw(&b"*1\r\n".repeat(200_000)).await {
        RESPOutput::Error(message) => assert!(message.starts_with("ERR")),
        other => panic!("expected error reply, got {other:?}"),
    }

    assert_eq!(bystander.call(&["PING"]).await, RESPOutput::SimpleString("PONG".into()));
    assert_eq!(bystander.call(&["GET", "kept"]).await, bulk("yes"));

    handle.abort();
}

#[tokio::test]
async fn oversized_length_headers_get_error_reply() {
    let server = spawn_server().await;
    let mut client = Client::connect(&server).await;
    let handle = tokio::spawn(async move { server.start().await });

    let headers: [&[u8]; 2] = [b"$9223372036854775800\r\n", b"*100000000\r\n"];
    for header in headers {
        match client.send_raw(header).await {
            RESPOutput::Error(message) => assert!(message.contains("Invalid length")),
            other => panic!("expected error reply, got {other:?}"),
        }
    }

    assert_eq!(client.call(&["PING"]).await, RESPOutput::SimpleString("PONG".into()));

    handle.abort();
}
