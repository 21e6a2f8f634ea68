//! Driver against a scripted Bolt server on a real socket.

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bolt_driver::bolt::codec::ChunkFramer;
use bolt_driver::bolt::message::{
    decode_message, encode_message, BoltRequest, BoltResponse, RecordMessage, SuccessMessage,
};
use bolt_driver::{params, AuthToken, Driver, DriverConfig, DriverError, Value};
use bytes::BytesMut;

fn invalid(err: impl std::error::Error + Send + Sync + 'static) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}

/// Read one framed request, `None` once the client hangs up.
fn read_request(stream: &mut TcpStream) -> io::Result<Option<BoltRequest>> {
    let mut payload = Vec::new();
    loop {
        let mut header = [0u8; 2];
        match stream.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if payload.is_empty() && e.kind() == io::ErrorKind::UnexpectedEof => {
                return Ok(None)
            }
            Err(e) => return Err(e),
        }
        let size = u16::from_be_bytes(header) as usize;
        if size == 0 {
            break;
        }
        let start = payload.len();
        payload.resize(start + size, 0);
        stream.read_exact(&mut payload[start..])?;
    }

    let structure = decode_message(&payload).map_err(invalid)?;
    BoltRequest::from_structure(&structure).map(Some).map_err(invalid)
}

fn write_response(stream: &mut TcpStream, response: &BoltResponse) -> io::Result<()> {
    let body = encode_message(&response.to_structure()).map_err(invalid)?;
    let mut framed = BytesMut::new();
    ChunkFramer::new().frame(&body, &mut framed);
    stream.write_all(&framed)
}

/// Accept one client, agree on `version` and answer requests until it leaves.
///
/// A RUN is answered with a single `len` column; PULL_ALL streams the byte
/// length of the `blob` parameter of the last RUN as one record.
fn spawn_server(version: u32) -> (u16, JoinHandle<io::Result<Vec<&'static str>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept()?;
        let mut preamble = [0u8; 20];
        stream.read_exact(&mut preamble)?;
        assert_eq!(&preamble[..4], &[0x60, 0x60, 0xB0, 0x17]);
        stream.write_all(&version.to_be_bytes())?;

        let mut seen = Vec::new();
        let mut blob_len = 0i64;
        while let Some(request) = read_request(&mut stream)? {
            seen.push(request.name());
            match request {
                BoltRequest::Init(_) => write_response(
                    &mut stream,
                    &BoltResponse::Success(SuccessMessage::init_success("scripted/1.0")),
                )?,
                BoltRequest::Run(run) => {
                    blob_len = run
                        .parameters
                        .get("blob")
                        .and_then(Value::as_str)
                        .map_or(0, |s| s.len() as i64);
                    // NOOP before the reply
                    stream.write_all(&[0x00, 0x00])?;
                    write_response(
                        &mut stream,
                        &BoltResponse::Success(SuccessMessage::run_success(["len"])),
                    )?;
                }
                BoltRequest::PullAll => {
                    write_response(
                        &mut stream,
                        &BoltResponse::Record(RecordMessage::new(vec![Value::Integer(blob_len)])),
                    )?;
                    write_response(
                        &mut stream,
                        &BoltResponse::Success(SuccessMessage::summary_success("r")),
                    )?;
                }
                _ => write_response(&mut stream, &BoltResponse::Success(SuccessMessage::empty()))?,
            }
        }
        Ok(seen)
    });

    (port, handle)
}

fn config(port: u16) -> DriverConfig {
    DriverConfig::builder(&format!("bolt://127.0.0.1:{}", port), AuthToken::basic("neo4j", "pw"))
        .unwrap()
        .with_connection_timeout(Duration::from_secs(5))
        .with_socket_timeout(Duration::from_secs(5))
        .with_cluster_discovery(false)
        .build()
}

#[test]
fn query_over_tcp() {
    let (port, server) = spawn_server(1);
    let mut driver = Driver::with_config(config(port)).unwrap();

    let session = driver.session().unwrap();
    assert_eq!(session.server(), Some("scripted/1.0"));

    // spans two chunks on the wire
    let blob = "x".repeat(100_000);
    let records = session
        .run("RETURN size($blob) AS len", Some(params! {"blob" => blob}))
        .unwrap()
        .list()
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get_int("len").unwrap(), 100_000);

    // write_session falls back to the same connection
    assert_eq!(driver.write_session().unwrap().server(), Some("scripted/1.0"));

    driver.close().unwrap();
    let seen = server.join().unwrap().unwrap();
    assert_eq!(seen, vec!["INIT", "RUN", "PULL_ALL"]);
}

#[test]
fn server_without_common_version() {
    let (port, server) = spawn_server(0);
    let mut driver = Driver::with_config(config(port)).unwrap();

    assert!(matches!(driver.session(), Err(DriverError::Handshake(_))));
    let seen = server.join().unwrap().unwrap();
    assert!(seen.is_empty());
}

#[test]
fn nothing_listening() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    // construction does not connect
    let mut driver = Driver::with_config(config(port)).unwrap();
    assert!(matches!(driver.handshake(), Err(DriverError::Transport(_))));
}
