/*!
External register bank (CCU ↔ Scanner).

Models the slice of the CCU's process-wide external-register array that this
core consumes (`0x40`..=`0x47`). The bank is a process-wide array of 32-bit
words; the core reads/writes it through atomics so the NCP side (out of
scope here) and the scanner can share it across threads without a lock.

Register map:

- `0x40` (ABAR) — selects which line's ICW is visible in 0x44-0x47.
- `0x44` write  — `(scf << 8) | pdf`  (NCP writes scf/pdf on its side; the
  scanner owns the authoritative in-memory `Icw` and republishes this view).
- `0x45` write  — `(lcd << 12) | (pcf_next << 8) | sdf`. NCP writes land in
  `pcf_next`, never directly in `pcf` — that's what drives Phase A.
- `0x44` read   — `(scf << 8) | pdf`.
- `0x45` read   — `(lcd << 12) | (pcf << 8) | sdf`.
- `0x46` read   — display register, stubbed to `0xF0A5`.
- `0x47` read/write — `rflags`.
*/

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::error::{Result, ScannerError};
use crate::icw::{Icw, LineIndex, Scf};

/// Display register value reported at Ereg 0x46 (stubbed).
pub const DISPLAY_REG_STUB: u32 = 0xF0A5;

/// Decoded contents of an NCP write to Ereg 0x45 (`lcd`/`pcf_next`/`sdf`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Pcf45Write {
    pub lcd: u8,
    pub pcf_next: u8,
    pub sdf: u8,
}

impl Pcf45Write {
    pub fn decode(word: u32) -> Self {
        Pcf45Write {
            lcd: ((word >> 12) & 0xF) as u8,
            pcf_next: ((word >> 8) & 0xF) as u8,
            sdf: (word & 0xFF) as u8,
        }
    }

    pub fn encode(&self) -> u32 {
        (((self.lcd & 0xF) as u32) << 12) | (((self.pcf_next & 0xF) as u32) << 8) | (self.sdf as u32)
    }
}

/// Decoded contents of an NCP write to Ereg 0x44 (`scf`/`pdf`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Scf44Write {
    pub scf: u8,
    pub pdf: u8,
}

impl Scf44Write {
    pub fn decode(word: u32) -> Self {
        Scf44Write {
            scf: ((word >> 8) & 0xFF) as u8,
            pdf: (word & 0xFF) as u8,
        }
    }
}

/// The per-line 0x44-0x47 read view the scanner publishes for NCP reads.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EregView {
    pub e44: u32,
    pub e45: u32,
    pub e46: u32,
    pub e47: u32,
}

impl EregView {
    /// Assemble the read view from a line's current ICW.
    pub fn from_icw(icw: &Icw) -> Self {
        EregView {
            e44: ((icw.scf.bits() as u32) << 8) | (icw.pdf as u32),
            e45: ((icw.lcd as u32 & 0xF) << 12) | ((icw.pcf as u32 & 0xF) << 8) | (icw.sdf as u32),
            e46: DISPLAY_REG_STUB,
            e47: icw.rflags as u32,
        }
    }
}

/// Lowest selectable ABAR value; lines are selected as `0x020 + line_index`.
pub const ABAR_LINE_BASE: u32 = 0x020;

/// Shared external register bank, `0x40`..=`0x47` plus the ABAR selector.
///
/// Only the subset this core consumes is modeled; registers outside
/// `0x40..=0x47` are out of scope and not stored here.
pub struct ExternalRegisters {
    max_lines: usize,
    /// Ereg[0x40]: ABAR - selects the line whose view is addressed below.
    abar: AtomicU32,
    /// Ereg[0x44] per line, as last published by the scanner.
    e44: Vec<AtomicU32>,
    /// Ereg[0x45] per line, as last published by the scanner.
    e45: Vec<AtomicU32>,
    /// Ereg[0x47] per line (rflags), as last published by the scanner.
    e47: Vec<AtomicU32>,
    /// Pending NCP write to 0x45, decoded, one slot per line (pcf_next path).
    pcf_next_write: Vec<AtomicU32>,
    /// Set by `write_pcf45`, cleared by `take_pcf45_write`. A dirty flag
    /// rather than comparing words against the last-seen value, so that two
    /// consecutive writes of the same value (e.g. two `0x00` bytes in a row)
    /// are each still observed exactly once.
    pcf_next_dirty: Vec<AtomicBool>,
    /// Pending NCP write to 0x44, decoded, one slot per line (scf/pdf path).
    scf_pdf_write: Vec<AtomicU32>,
    scf_pdf_dirty: Vec<AtomicBool>,
}

impl ExternalRegisters {
    pub fn new(max_lines: usize) -> Self {
        ExternalRegisters {
            max_lines,
            abar: AtomicU32::new(0),
            e44: (0..max_lines).map(|_| AtomicU32::new(0)).collect(),
            e45: (0..max_lines).map(|_| AtomicU32::new(0)).collect(),
            e47: (0..max_lines).map(|_| AtomicU32::new(0)).collect(),
            pcf_next_write: (0..max_lines).map(|_| AtomicU32::new(0)).collect(),
            pcf_next_dirty: (0..max_lines).map(|_| AtomicBool::new(false)).collect(),
            scf_pdf_write: (0..max_lines).map(|_| AtomicU32::new(0)).collect(),
            scf_pdf_dirty: (0..max_lines).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    fn check_line(&self, line: LineIndex) -> Result<()> {
        if line >= self.max_lines {
            return Err(ScannerError::InvalidLineIndex {
                line,
                max_lines: self.max_lines,
            });
        }
        Ok(())
    }

    /// NCP selects a line by writing `0x020 + line` to ABAR (Ereg 0x40).
    pub fn select_line(&self, line: LineIndex) {
        self.abar.store(ABAR_LINE_BASE + line as u32, Ordering::Release);
    }

    pub fn selected_line(&self) -> Option<LineIndex> {
        let abar = self.abar.load(Ordering::Acquire);
        abar.checked_sub(ABAR_LINE_BASE).map(|l| l as usize)
    }

    /// NCP write to Ereg 0x45 for `line`: decodes into `lcd`/`pcf_next`/`sdf`
    /// and queues it for the scanner's Phase A to pick up.
    pub fn write_pcf45(&self, line: LineIndex, word: u32) -> Result<()> {
        self.check_line(line)?;
        self.pcf_next_write[line].store(word, Ordering::Release);
        self.pcf_next_dirty[line].store(true, Ordering::Release);
        Ok(())
    }

    /// Scanner-side: drain the pending 0x45 write, if one arrived since the
    /// last call. A dirty flag rather than a value comparison, so that
    /// writing the same word twice in a row (e.g. two identical data bytes)
    /// is still observed as two distinct events.
    pub fn take_pcf45_write(&self, line: LineIndex) -> Option<(u32, Pcf45Write)> {
        if self.pcf_next_dirty[line].swap(false, Ordering::AcqRel) {
            let word = self.pcf_next_write[line].load(Ordering::Acquire);
            Some((word, Pcf45Write::decode(word)))
        } else {
            None
        }
    }

    /// NCP write to Ereg 0x44 for `line`: decodes into `scf`/`pdf`. Used by
    /// the demo/test harness to drive `pdf` during PCF=9 (transmit).
    pub fn write_scf44(&self, line: LineIndex, word: u32) -> Result<()> {
        self.check_line(line)?;
        self.scf_pdf_write[line].store(word, Ordering::Release);
        self.scf_pdf_dirty[line].store(true, Ordering::Release);
        Ok(())
    }

    pub fn take_scf44_write(&self, line: LineIndex) -> Option<(u32, Scf44Write)> {
        if self.scf_pdf_dirty[line].swap(false, Ordering::AcqRel) {
            let word = self.scf_pdf_write[line].load(Ordering::Acquire);
            Some((word, Scf44Write::decode(word)))
        } else {
            None
        }
    }

    /// Scanner-side: publish the current ICW read view for `line` (Ereg
    /// 0x44/0x45/0x47; 0x46 is the constant display stub, read directly).
    pub fn publish_icw(&self, line: LineIndex, icw: &Icw) {
        let view = EregView::from_icw(icw);
        self.e44[line].store(view.e44, Ordering::Release);
        self.e45[line].store(view.e45, Ordering::Release);
        self.e47[line].store(view.e47, Ordering::Release);
    }

    /// NCP-side read of the full Ereg 0x44-0x47 view for `line`.
    pub fn read_view(&self, line: LineIndex) -> Result<EregView> {
        self.check_line(line)?;
        Ok(EregView {
            e44: self.e44[line].load(Ordering::Acquire),
            e45: self.e45[line].load(Ordering::Acquire),
            e46: DISPLAY_REG_STUB,
            e47: self.e47[line].load(Ordering::Acquire),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcf45_round_trips() {
        let w = Pcf45Write {
            lcd: 0x9,
            pcf_next: 0xC,
            sdf: 0x5A,
        };
        let encoded = w.encode();
        assert_eq!(Pcf45Write::decode(encoded), w);
    }

    #[test]
    fn select_line_and_read_back() {
        let eregs = ExternalRegisters::new(4);
        eregs.select_line(2);
        assert_eq!(eregs.selected_line(), Some(2));
    }

    #[test]
    fn invalid_line_index_is_rejected() {
        let eregs = ExternalRegisters::new(4);
        assert!(matches!(
            eregs.write_pcf45(4, 0),
            Err(ScannerError::InvalidLineIndex { line: 4, max_lines: 4 })
        ));
    }

    #[test]
    fn publish_and_read_view_matches_icw() {
        let eregs = ExternalRegisters::new(1);
        let mut icw = Icw::default();
        icw.scf = Scf::DCD | Scf::NORM_CHAR_SERVICE;
        icw.pdf = 0xAB;
        icw.lcd = 0x9;
        icw.pcf = 0x7;
        icw.sdf = 0x11;
        icw.rflags = 0x1234;
        eregs.publish_icw(0, &icw);
        let view = eregs.read_view(0).unwrap();
        assert_eq!(view.e44, ((icw.scf.bits() as u32) << 8) | 0xAB);
        assert_eq!(view.e45, (0x9u32 << 12) | (0x7u32 << 8) | 0x11);
        assert_eq!(view.e46, DISPLAY_REG_STUB);
        assert_eq!(view.e47, 0x1234);
    }

    #[test]
    fn pcf45_write_is_observed_once_per_change() {
        let eregs = ExternalRegisters::new(1);
        assert!(eregs.take_pcf45_write(0).is_none());
        eregs.write_pcf45(0, 0x9C00).unwrap();
        let (word, decoded) = eregs.take_pcf45_write(0).expect("new write observed");
        assert_eq!(word, 0x9C00);
        assert_eq!(decoded.pcf_next, 0xC);
        assert_eq!(decoded.lcd, 0x9);
        // Draining again before another write sees nothing new.
        assert!(eregs.take_pcf45_write(0).is_none());
    }

    #[test]
    fn pcf45_write_observed_even_when_value_repeats() {
        let eregs = ExternalRegisters::new(1);
        eregs.write_pcf45(0, 0x9900).unwrap();
        assert!(eregs.take_pcf45_write(0).is_some());
        // Same word written again: still a distinct event, not masked by
        // the value being unchanged.
        eregs.write_pcf45(0, 0x9900).unwrap();
        assert!(eregs.take_pcf45_write(0).is_some());
    }
}
