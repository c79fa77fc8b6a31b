use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use crate::channels::build_channels;
use crate::config::ScannerConfig;

use super::LineIo;

fn harness(max_lines: usize) -> (LineIo, Vec<crate::channels::ScannerChannelHalf>) {
    let (scanner_halves, lineio_halves) = build_channels(max_lines);
    let mut cfg = ScannerConfig::default();
    cfg.max_lines = max_lines;
    cfg.bind_addr = "127.0.0.1".to_string();
    cfg.port_base = 0; // OS-assigned, so parallel test runs never collide
    let shutdown = Arc::new(AtomicBool::new(false));
    let lineio = LineIo::bind(&cfg, lineio_halves, shutdown).expect("bind loopback listeners");
    (lineio, scanner_halves)
}

#[test]
fn accepts_a_connection_and_flushes_outbound() {
    let (lineio, scanner_halves) = harness(1);
    let port = lineio.local_port(0).unwrap();

    let mut peer = TcpStream::connect(("127.0.0.1", port)).unwrap();
    peer.set_nonblocking(true).unwrap();
    for _ in 0..50 {
        lineio.step_line(0, true).unwrap();
        std::thread::sleep(Duration::from_millis(5));
    }

    scanner_halves[0]
        .req_tx
        .try_send(vec![0x7E, 0xC1, 0x93, 0x00, 0x00])
        .unwrap();
    lineio.step_line(0, false).unwrap();

    let mut buf = [0u8; 16];
    let n = read_with_retry(&mut peer, &mut buf);
    assert_eq!(&buf[..n], &[0x7E, 0xC1, 0x93, 0x00, 0x00]);
}

#[test]
fn strips_leading_clocking_artifact_byte() {
    let (lineio, scanner_halves) = harness(1);
    let port = lineio.local_port(0).unwrap();
    let mut peer = TcpStream::connect(("127.0.0.1", port)).unwrap();
    peer.set_nonblocking(true).unwrap();
    for _ in 0..50 {
        lineio.step_line(0, true).unwrap();
        std::thread::sleep(Duration::from_millis(5));
    }

    scanner_halves[0]
        .req_tx
        .try_send(vec![0x00, 0x7E, 0xC1])
        .unwrap();
    lineio.step_line(0, false).unwrap();

    let mut buf = [0u8; 16];
    let n = read_with_retry(&mut peer, &mut buf);
    assert_eq!(&buf[..n], &[0x7E, 0xC1]);
}

#[test]
fn drains_inbound_bytes_to_scanner() {
    let (lineio, scanner_halves) = harness(1);
    let port = lineio.local_port(0).unwrap();
    let mut peer = TcpStream::connect(("127.0.0.1", port)).unwrap();
    peer.set_nonblocking(true).unwrap();
    for _ in 0..50 {
        lineio.step_line(0, true).unwrap();
        std::thread::sleep(Duration::from_millis(5));
    }

    peer.write_all(&[0x7E, 0xC1, 0x73, 0x47, 0x0F, 0x7E]).unwrap();
    std::thread::sleep(Duration::from_millis(20));
    lineio.step_line(0, false).unwrap();

    let chunk = scanner_halves[0].rsp_rx.try_recv().expect("inbound chunk delivered");
    assert_eq!(chunk, vec![0x7E, 0xC1, 0x73, 0x47, 0x0F, 0x7E]);
}

/// Peer disconnects mid-conversation; the line goes DISC, and a fresh
/// connection on the same listener brings it back to CONN.
#[test]
fn peer_disconnect_then_reconnect() {
    use super::ConnState;

    let (lineio, scanner_halves) = harness(1);
    let port = lineio.local_port(0).unwrap();

    let peer = TcpStream::connect(("127.0.0.1", port)).unwrap();
    for _ in 0..50 {
        lineio.step_line(0, true).unwrap();
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(lineio.conn_state_for_test(0), ConnState::Conn);
    drop(peer);

    // A read against a gracefully closed peer returns Ok(0) ("nothing
    // pending"), not an error, so disconnection only surfaces once a write
    // actually fails; keep offering fresh payloads until the kernel reports
    // the reset and the line drops to DISC.
    let start = Instant::now();
    loop {
        let _ = scanner_halves[0].req_tx.try_send(vec![0xAB]);
        let _ = lineio.step_line(0, false);
        if lineio.conn_state_for_test(0) == ConnState::Disc {
            break;
        }
        assert!(start.elapsed() < Duration::from_secs(2), "line never noticed the disconnect");
        std::thread::sleep(Duration::from_millis(5));
    }

    let _peer2 = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let start = Instant::now();
    loop {
        lineio.step_line(0, true).unwrap();
        if lineio.conn_state_for_test(0) == ConnState::Conn {
            break;
        }
        assert!(start.elapsed() < Duration::from_secs(2), "listener never accepted the reconnect");
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn read_with_retry(stream: &mut TcpStream, buf: &mut [u8]) -> usize {
    let start = Instant::now();
    loop {
        match stream.read(buf) {
            Ok(n) if n > 0 => return n,
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => panic!("unexpected read error: {e}"),
        }
        assert!(start.elapsed() < Duration::from_secs(2), "peer never received data");
        std::thread::sleep(Duration::from_millis(5));
    }
}
