use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crate::channels::{LineIoChannelHalf, build_channels};
use crate::discipline::Sdlc;
use crate::ereg::{ExternalRegisters, Pcf45Write};
use crate::icw::LineStat;
use crate::interrupts::Interrupts;

use super::Scanner;

fn harness(max_lines: usize) -> (Scanner, Vec<LineIoChannelHalf>, Arc<Interrupts>) {
    let (scanner_halves, lineio_halves) = build_channels(max_lines);
    let eregs = Arc::new(ExternalRegisters::new(max_lines));
    let interrupts = Arc::new(Interrupts::new());
    let shutdown = Arc::new(AtomicBool::new(false));
    let scanner = Scanner::new(
        max_lines,
        16 * 1024,
        Duration::from_micros(100),
        eregs,
        interrupts.clone(),
        scanner_halves,
        Box::new(Sdlc),
        shutdown,
    );
    (scanner, lineio_halves, interrupts)
}

fn drive_pcf(scanner: &Scanner, line: usize, pcf_next: u8) {
    let write = Pcf45Write {
        lcd: 0x9,
        pcf_next,
        sdf: 0,
    };
    scanner.ncp_write_pcf45(line, write.encode()).unwrap();
    scanner.step_line(line).unwrap();
}

fn drive_pcf_with_lcd(scanner: &Scanner, line: usize, lcd: u8, pcf_next: u8) {
    let write = Pcf45Write { lcd, pcf_next, sdf: 0 };
    scanner.ncp_write_pcf45(line, write.encode()).unwrap();
    scanner.step_line(line).unwrap();
}

fn ack_pending_l2(interrupts: &Interrupts) {
    if interrupts.l2_pending() {
        interrupts.clear_l2();
    }
}

/// Drives line 0 through PCF 1→0→8→9 (feeding `7E C1 93 00 00`)→0xC and
/// checks the outbound frame lands byte-for-byte at Line I/O.
#[test]
fn s1_outbound_snrm() {
    let (scanner, lineio_halves, interrupts) = harness(1);
    let lineio = &lineio_halves[0];

    drive_pcf(&scanner, 0, 0x1);
    assert!(interrupts.l2_pending());
    ack_pending_l2(&interrupts);
    // PCF=1's handler already folded pcf_next=0 back into pcf within the
    // same step; PCF=0's first-entry reset runs on the next cycle.
    scanner.step_line(0).unwrap();

    drive_pcf(&scanner, 0, 0x8);
    drive_pcf(&scanner, 0, 0x9);

    for byte in [0x7E, 0xC1, 0x93, 0x00, 0x00] {
        scanner.ncp_write_scf44(0, byte as u32).unwrap();
        scanner.step_line(0).unwrap();
        ack_pending_l2(&interrupts);
    }

    drive_pcf(&scanner, 0, 0xC);
    ack_pending_l2(&interrupts);

    let frame = lineio.req_rx.try_recv().expect("frame handed to line i/o");
    assert_eq!(frame, vec![0x7E, 0xC1, 0x93, 0x00, 0x00]);
    assert_eq!(scanner.line_stat(0), LineStat::Rx);
    assert_eq!(scanner.pcf_next(0), 5);
}

/// Peer sends a whole BLU in one read; the scanner walks it through
/// PCF=4/5→6→7 and delivers each byte to NCP via the PDF handshake,
/// turning the line around to TX on the FCS+EFlag pattern. The line is
/// preset to RX, standing in for "already turned around after a prior
/// outbound frame" rather than re-deriving that transition here.
#[test]
fn s2_inbound_ua() {
    let (scanner, lineio_halves, interrupts) = harness(2);
    let line = 1;
    let lineio = &lineio_halves[line];

    lineio
        .rsp_tx
        .try_send(vec![0x7E, 0xC1, 0x73, 0x47, 0x0F, 0x7E])
        .unwrap();
    scanner.set_line_stat_for_test(line, LineStat::Rx);

    drive_pcf(&scanner, line, 0x4);
    assert_eq!(scanner.pcf_next(line), 6);
    ack_pending_l2(&interrupts);

    let mut delivered = Vec::new();
    loop {
        if let Some(byte) = scanner.ncp_read_pdf(line) {
            delivered.push(byte);
        }
        if scanner.line_stat(line) == LineStat::Tx {
            break;
        }
        scanner.step_line(line).unwrap();
        ack_pending_l2(&interrupts);
        assert!(delivered.len() <= 8, "runaway receive loop");
    }

    // The algorithm only special-cases the FCS+flag triple right before the
    // closing flag; the two FCS bytes themselves are delivered to NCP like
    // any other data byte (framing validation is NCP's job, out of scope
    // here).
    assert_eq!(delivered, vec![0xC1, 0x73, 0x47, 0x0F]);
    assert_eq!(scanner.line_stat(line), LineStat::Tx);
    assert_eq!(scanner.pcf_next(line), 6);
}

/// NCP writing PCF=0 from any state forces RESET and clears check-condition
/// bits.
#[test]
fn s4_ncp_drives_pcf0_resets_line() {
    let (scanner, _lineio_halves, interrupts) = harness(1);
    scanner.set_line_stat_for_test(0, LineStat::Rx);

    // A direct NCP write converges `icw.pcf` in Phase A and dispatches the
    // PCF=0 handler in the same Phase B, so the reset is already visible
    // after this single call.
    drive_pcf(&scanner, 0, 0x0);
    ack_pending_l2(&interrupts);

    assert_eq!(scanner.line_stat(0), LineStat::Reset);
    let icw = scanner.icw_snapshot(0);
    assert_eq!(icw.scf.bits() & !0x4A, 0);
}

/// Re-entering PCF=0 twice in a row has the same effect as once.
#[test]
fn pcf0_is_idempotent() {
    let (scanner, _lineio_halves, _interrupts) = harness(1);
    scanner.step_line(0).unwrap();
    let first = scanner.icw_snapshot(0);
    scanner.step_line(0).unwrap();
    let second = scanner.icw_snapshot(0);
    assert_eq!(first.scf, second.scf);
    assert_eq!(first.pcf, second.pcf);
}

/// An outbound frame that grows past the configured buffer capacity is a
/// fatal `BufferOverrun` for the line, not a silent truncation.
#[test]
fn buffer_overrun_is_reported() {
    let (scanner_halves, _lineio_halves) = build_channels(1);
    let eregs = Arc::new(ExternalRegisters::new(1));
    let interrupts = Arc::new(Interrupts::new());
    let shutdown = Arc::new(AtomicBool::new(false));
    let scanner = Scanner::new(
        1,
        1, // one-byte capacity, to hit the overrun quickly
        Duration::from_micros(100),
        eregs,
        interrupts.clone(),
        scanner_halves,
        Box::new(Sdlc),
        shutdown,
    );

    drive_pcf(&scanner, 0, 0x8);
    drive_pcf(&scanner, 0, 0x9);
    ack_pending_l2(&interrupts);

    scanner.ncp_write_scf44(0, 0x41).unwrap();
    scanner.step_line(0).unwrap();
    ack_pending_l2(&interrupts);

    scanner.ncp_write_scf44(0, 0x42).unwrap();
    let err = scanner.step_line(0).unwrap_err();
    assert!(matches!(
        err,
        crate::error::ScannerError::BufferOverrun { line: 0, capacity: 1 }
    ));
}

/// An `lcd` outside the supported SDLC set (0x8/0x9) leaves a gated PCF a
/// permanent no-op rather than panicking or silently advancing: the line
/// parks at PCF=8 until NCP selects a discipline the core understands.
#[test]
fn unsupported_lcd_parks_the_line() {
    let (scanner, _lineio_halves, interrupts) = harness(1);

    drive_pcf_with_lcd(&scanner, 0, 0x2, 0x8);
    assert!(!interrupts.l2_pending());
    assert_eq!(scanner.pcf_next(0), 8);
    assert_eq!(scanner.icw_snapshot(0).pcf, 8);

    // A second cycle with nothing new from NCP stays parked too — the
    // state-entry has already been logged once, but the handler keeps
    // no-opping rather than advancing regardless.
    scanner.step_line(0).unwrap();
    assert_eq!(scanner.pcf_next(0), 8);
    assert_eq!(scanner.icw_snapshot(0).pcf, 8);
}

/// A BLU frame that arrives as two separate Line I/O chunks — the second
/// one handed over only after the scanner has already moved past PCF=4/5
/// and into PCF=6/7 — is still reassembled byte-for-byte, including an
/// FCS+EFlag closing sequence that straddles the chunk boundary.
#[test]
fn multi_chunk_inbound_frame_is_reassembled() {
    let (scanner, lineio_halves, interrupts) = harness(2);
    let line = 1;
    let lineio = &lineio_halves[line];
    scanner.set_line_stat_for_test(line, LineStat::Rx);

    // First chunk: opening flag plus the first two data bytes only.
    lineio.rsp_tx.try_send(vec![0x7E, 0xC1, 0x73]).unwrap();

    drive_pcf(&scanner, line, 0x4);
    assert_eq!(scanner.pcf_next(line), 6);
    ack_pending_l2(&interrupts);

    let mut delivered = Vec::new();
    let mut sent_second_chunk = false;
    loop {
        if let Some(byte) = scanner.ncp_read_pdf(line) {
            delivered.push(byte);
        }
        if scanner.line_stat(line) == LineStat::Tx {
            break;
        }
        // The first chunk is fully drained after two bytes have reached
        // NCP; hand over the FCS and closing flag as a second chunk here,
        // simulating a second socket read arriving after the scanner has
        // already moved on from PCF=4/5.
        if !sent_second_chunk && delivered.len() == 2 {
            lineio.rsp_tx.try_send(vec![0x47, 0x0F, 0x7E]).unwrap();
            sent_second_chunk = true;
        }
        scanner.step_line(line).unwrap();
        ack_pending_l2(&interrupts);
        assert!(delivered.len() <= 8, "runaway receive loop");
    }

    assert!(sent_second_chunk, "test setup never sent the second chunk");
    assert_eq!(delivered, vec![0xC1, 0x73, 0x47, 0x0F]);
    assert_eq!(scanner.line_stat(line), LineStat::Tx);
    assert_eq!(scanner.pcf_next(line), 6);
}
