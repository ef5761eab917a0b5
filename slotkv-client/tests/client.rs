use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use slotkv_client::{ClientConfig, Record, SlotKv, SlotKvError};

type Handler = fn(usize, Vec<Vec<u8>>, &mut TcpStream);

fn spawn_server(expected_commands: usize, handler: Handler) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));
        for idx in 0..expected_commands {
            let args = read_command(&mut reader).expect("read command");
            handler(idx, args, &mut stream);
        }
        // Dropping the stream closes the connection.
    });

    addr
}

fn read_command(reader: &mut BufReader<TcpStream>) -> std::io::Result<Vec<Vec<u8>>> {
    let line = read_line(reader)?;
    let count = parse_header(&line, b'*')?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let line = read_line(reader)?;
        let len = parse_header(&line, b'$')?;
        let mut data = vec![0u8; len + 2];
        reader.read_exact(&mut data)?;
        data.truncate(len);
        args.push(data);
    }
    Ok(args)
}

fn read_line(reader: &mut BufReader<TcpStream>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof"));
    }
    if !buf.ends_with(b"\r\n") {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "invalid line"));
    }
    buf.truncate(buf.len() - 2);
    Ok(buf)
}

fn parse_header(line: &[u8], prefix: u8) -> std::io::Result<usize> {
    match line.split_first() {
        Some((&first, digits)) if first == prefix => std::str::from_utf8(digits)
            .ok()
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidData, "length")),
        _ => Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "unexpected prefix")),
    }
}

fn write_raw(stream: &mut TcpStream, data: &[u8]) {
    let _ = stream.write_all(data);
    let _ = stream.flush();
}

fn write_simple(stream: &mut TcpStream, msg: &str) {
    write_raw(stream, format!("+{}\r\n", msg).as_bytes());
}

fn write_error(stream: &mut TcpStream, msg: &str) {
    write_raw(stream, format!("-{}\r\n", msg).as_bytes());
}

fn write_integer(stream: &mut TcpStream, value: i64) {
    write_raw(stream, format!(":{}\r\n", value).as_bytes());
}

fn write_bulk_array(stream: &mut TcpStream, items: &[&str]) {
    let mut out = format!("*{}\r\n", items.len());
    for item in items {
        out.push_str(&format!("${}\r\n{}\r\n", item.len(), item));
    }
    write_raw(stream, out.as_bytes());
}

fn args_as_strings(args: &[Vec<u8>]) -> Vec<String> {
    args.iter()
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect()
}

fn client() -> SlotKv {
    SlotKv::with_config(ClientConfig {
        connect_timeout_ms: Some(1000),
        read_timeout_ms: Some(2000),
        write_timeout_ms: Some(2000),
        nodelay: true,
    })
}

fn connect(client: &SlotKv, slot: i32, addr: SocketAddr, password: &str, db: i32) {
    client
        .connect(slot, &addr.ip().to_string(), addr.port() as i32, password, db, false)
        .expect("connect");
}

#[test]
fn connect_authenticates_selects_and_runs_commands() {
    let addr = spawn_server(5, |idx, args, stream| {
        let args = args_as_strings(&args);
        match idx {
            0 => {
                assert_eq!(args, vec!["AUTH", "hunter2"]);
                write_simple(stream, "OK");
            }
            1 => {
                assert_eq!(args, vec!["SELECT", "3"]);
                write_simple(stream, "OK");
            }
            2 => {
                assert_eq!(args, vec!["INCRBY", "counter", "42"]);
                write_integer(stream, 42);
            }
            3 => {
                assert_eq!(args, vec!["GET", "missing"]);
                write_raw(stream, b"$-1\r\n");
            }
            _ => {
                assert_eq!(args, vec!["LRANGE", "l", "0", "-1"]);
                write_raw(stream, b"*3\r\n$1\r\na\r\n:7\r\n$-1\r\n");
            }
        }
    });

    let client = client();
    connect(&client, 2, addr, "hunter2", 3);
    assert!(client.is_open(2));

    assert_eq!(client.command(2, "INCRBY %s %s", &[Some("counter"), Some("42")]).unwrap(), "42");
    assert_eq!(client.command(2, "GET", &[Some("missing")]).unwrap(), "nil");
    assert_eq!(
        client
            .command_argv(2, &[Some("LRANGE"), Some("l"), Some("0"), Some("-1")])
            .unwrap(),
        "{a,7,}"
    );
}

#[test]
fn auth_rejection_leaves_slot_empty() {
    let addr = spawn_server(1, |_, _, stream| write_error(stream, "WRONGPASS invalid username-password pair"));

    let client = client();
    let err = client
        .connect(0, &addr.ip().to_string(), addr.port() as i32, "bad", 0, false)
        .unwrap_err();
    assert!(matches!(err, SlotKvError::AuthFailure(ref msg) if msg.starts_with("WRONGPASS")));
    assert!(!client.is_open(0));
}

#[test]
fn command_error_keeps_slot_usable() {
    let addr = spawn_server(2, |idx, _, stream| {
        if idx == 0 {
            write_error(stream, "ERR unknown command 'BOGUS'");
        } else {
            write_simple(stream, "PONG");
        }
    });

    let client = client();
    connect(&client, 0, addr, "", 0);
    let err = client.command_argv(0, &[Some("BOGUS")]).unwrap_err();
    assert_eq!(err.to_string(), "command BOGUS failed: ERR unknown command 'BOGUS'");
    assert!(client.is_open(0));
    assert_eq!(client.command(0, "PING", &[]).unwrap(), "PONG");
}

#[test]
fn transport_failure_poisons_slot() {
    // The server accepts and hangs up without answering.
    let addr = spawn_server(0, |_, _, _| {});

    let client = client();
    connect(&client, 1, addr, "", 0);
    thread::sleep(Duration::from_millis(50));

    let err = client.command(1, "PING", &[]).unwrap_err();
    assert!(err.poisons_slot(), "unexpected error: {err}");
    assert!(!client.is_open(1));
    assert_eq!(client.command(1, "PING", &[]), Err(SlotKvError::SlotNotOpen(1)));
}

#[test]
fn oversized_reply_header_poisons_slot() {
    let addr = spawn_server(1, |_, _, stream| write_raw(stream, b"*9223372036854775807\r\n"));

    let client = client();
    connect(&client, 4, addr, "", 0);
    let err = client.command_argv(4, &[Some("KEYS"), Some("*")]).unwrap_err();
    assert!(err.poisons_slot(), "unexpected error: {err}");
    assert!(!client.is_open(4));
}

#[test]
fn connect_failure_reports_address() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = client();
    let err = client
        .connect(0, "127.0.0.1", addr.port() as i32, "", 0, false)
        .unwrap_err();
    assert!(matches!(err, SlotKvError::ConnectFailure { ref host, .. } if host == "127.0.0.1"));
    assert!(!client.is_open(0));
}

#[test]
fn push_record_writes_hash_and_keyset() {
    let addr = spawn_server(3, |idx, args, stream| {
        let args = args_as_strings(&args);
        match idx {
            0 => {
                assert_eq!(args, vec!["DEL", "users:1:eu"]);
                write_integer(stream, 0);
            }
            1 => {
                assert_eq!(
                    args,
                    vec!["HMSET", "users:1:eu", "id", "1", "name", "x", "active", "t", "bio", "nil"]
                );
                write_simple(stream, "OK");
            }
            _ => {
                assert_eq!(args, vec!["SADD", "users_keys", "users:1:eu"]);
                write_integer(stream, 1);
            }
        }
    });

    let client = client();
    connect(&client, 0, addr, "", 0);

    let record = Record::new()
        .with("id", 1)
        .with("name", "x")
        .with("region", "eu")
        .with("active", true)
        .with("bio", None::<&str>);
    client
        .push_record(
            0,
            Some(&record),
            None,
            Some("users_keys"),
            Some("users"),
            Some(&[Some("id"), Some("region")]),
        )
        .expect("push");
    assert!(client.is_open(0));
}

#[test]
fn drop_collection_by_keyset() {
    let addr = spawn_server(4, |idx, args, stream| {
        let args = args_as_strings(&args);
        match idx {
            0 => {
                assert_eq!(args, vec!["SMEMBERS", "users_keys"]);
                write_bulk_array(stream, &["users:1", "users:2"]);
            }
            1 => {
                assert_eq!(args, vec!["DEL", "users:1"]);
                write_integer(stream, 1);
            }
            2 => {
                assert_eq!(args, vec!["DEL", "users:2"]);
                write_integer(stream, 1);
            }
            _ => {
                assert_eq!(args, vec!["DEL", "users_keys"]);
                write_integer(stream, 1);
            }
        }
    });

    let client = client();
    connect(&client, 0, addr, "", 0);
    client.drop_collection(0, Some("users_keys"), None).expect("drop");
}

#[test]
fn drop_collection_by_prefix() {
    let addr = spawn_server(2, |idx, args, stream| {
        let args = args_as_strings(&args);
        if idx == 0 {
            assert_eq!(args, vec!["KEYS", "users:*"]);
            write_bulk_array(stream, &["users:1"]);
        } else {
            assert_eq!(args, vec!["DEL", "users:1"]);
            write_integer(stream, 1);
        }
    });

    let client = client();
    connect(&client, 0, addr, "", 0);
    client.drop_collection(0, None, Some("users:")).expect("drop");
}
