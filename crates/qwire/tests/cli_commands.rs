#![cfg(all(unix, feature = "cli"))]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::thread;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "qwire-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn qwire(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_qwire"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .env_remove("QWIRE_CREDENTIALS")
        .output()
        .expect("qwire should run")
}

/// Accepts one client, answers the handshake with the requested level and
/// echoes `frames` sync requests back as responses.
fn fake_server(frames: usize) -> (u16, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
    let port = listener.local_addr().expect("local addr").port();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept should succeed");
        let mut last = 0u8;
        let mut byte = [0u8; 1];
        loop {
            stream.read_exact(&mut byte).expect("handshake byte");
            if byte[0] == 0 {
                break;
            }
            last = byte[0];
        }
        stream.write_all(&[last]).expect("handshake reply");

        for _ in 0..frames {
            let mut header = [0u8; 8];
            stream.read_exact(&mut header).expect("frame header");
            let len = if header[0] == 1 {
                u32::from_le_bytes([header[4], header[5], header[6], header[7]])
            } else {
                u32::from_be_bytes([header[4], header[5], header[6], header[7]])
            } as usize;
            let mut body = vec![0u8; len - 8];
            stream.read_exact(&mut body).expect("frame body");
            header[1] = 2;
            stream.write_all(&header).expect("reply header");
            stream.write_all(&body).expect("reply body");
        }
    });
    (port, handle)
}

#[test]
fn compress_then_decompress_roundtrips_file() {
    let dir = unique_temp_dir("roundtrip");
    let input = dir.join("input.bin");
    let frame = dir.join("frame.bin");
    let restored = dir.join("restored.bin");

    let data: Vec<u8> = b"2024.01.01D00:00:00 AAPL 187.5 100\n".repeat(200);
    std::fs::write(&input, &data).expect("write input");

    let output = qwire(&[
        "compress",
        input.to_str().unwrap(),
        "--out",
        frame.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"compression\":\"compressed32\""), "{stdout}");

    let frame_len = std::fs::metadata(&frame).expect("frame written").len();
    assert!((frame_len as usize) < data.len() / 2);

    let output = qwire(&[
        "decompress",
        frame.to_str().unwrap(),
        "--out",
        restored.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"kind\":\"async\""), "{stdout}");
    assert_eq!(std::fs::read(&restored).expect("payload written"), data);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn small_file_is_framed_without_compression() {
    let dir = unique_temp_dir("small");
    let input = dir.join("input.bin");
    std::fs::write(&input, b"hello").expect("write input");

    let output = qwire(&["compress", input.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"compression\":\"none\""), "{stdout}");
    assert!(stdout.contains("\"frame_bytes\":13"), "{stdout}");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decompress_rejects_garbage_with_60() {
    let dir = unique_temp_dir("garbage");
    let input = dir.join("frame.bin");
    std::fs::write(&input, [1u8, 7, 0, 0, 8, 0, 0, 0]).expect("write input");

    let output = qwire(&["decompress", input.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(60));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn handshake_reports_negotiated_level() {
    let (port, server) = fake_server(0);
    let output = qwire(&["handshake", "127.0.0.1", &port.to_string(), "--level", "3"]);
    server.join().expect("server thread");

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"level\":3"), "{stdout}");
    assert!(stdout.contains("\"state\":\"ready\""), "{stdout}");
}

#[test]
fn sync_send_prints_echoed_value() {
    let (port, server) = fake_server(1);
    let output = qwire(&["send", "127.0.0.1", &port.to_string(), "--ints", "4,5,6"]);
    server.join().expect("server thread");

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"value\":\"4 5 6\""), "{stdout}");
    assert!(stdout.contains("\"kind\":\"response\""), "{stdout}");
}

#[test]
fn refused_connection_returns_3() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        listener.local_addr().expect("local addr").port()
    };
    let output = qwire(&["handshake", "127.0.0.1", &port.to_string()]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn version_prints_name() {
    let output = qwire(&["version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("qwire "));
}
