/*!
Interface Control Word (ICW) — per-line register fields the NCP observes and
mutates, plus the scanner-private derived fields that are not visible through
the external register bank.

Layout reference (see `ereg.rs` for the packed Ereg view):

| Field     | Width | Meaning                                              |
|-----------|-------|-------------------------------------------------------|
| `scf`     | 8     | Secondary Control Field (check bits, service, flag)   |
| `pdf`     | 8     | Parallel Data Field (the byte on the wire)            |
| `lcd`     | 4     | Line Code Definer (0x8/0x9 = SDLC)                    |
| `pcf`     | 4     | Primary Control Field (state machine state)           |
| `sdf`     | 8     | Serial Data Field (carried, not interpreted)          |
| `rflags`  | 16    | Miscellaneous latch bits                              |
*/

use bitflags::bitflags;

/// Index of a line in `[0, MAX_LINES)`.
pub type LineIndex = usize;

bitflags! {
    /// Secondary Control Field bits.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Scf: u8 {
        /// Flag (0x7E) detected.
        const FLAG_DETECTED = 0x04;
        /// DCD (Data Carrier Detect); always forced on by the scanner.
        const DCD = 0x08;
        /// Normal character service: a byte-level event occurred.
        const NORM_CHAR_SERVICE = 0x40;
    }
}

impl Scf {
    /// Mask applied on entry to PCF=0: clears all check-condition bits,
    /// leaving DCD (0x08) and norm-char-service (0x40) — `0x4A` in the
    /// original hardware's bit numbering.
    pub const RESET_MASK: u8 = 0x4A;

    /// Clear everything except the bits named in `RESET_MASK`.
    pub fn reset_check_conditions(&mut self) {
        *self = Scf::from_bits_truncate(self.bits() & Self::RESET_MASK);
    }
}

/// Handshake state for a single-byte parallel data field.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum PdfReg {
    #[default]
    Empty,
    Filled,
}

/// Logical half-duplex direction of a line.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum LineStat {
    #[default]
    Reset,
    Tx,
    Rx,
}

/// FILLED/EMPTY state of a BLU buffer, as observed through the ICW.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum BufState {
    #[default]
    Empty,
    Filled,
}

/// Line Code Definer values this core recognizes as SDLC (8-bit).
pub const LCD_SDLC_8: u8 = 0x8;
pub const LCD_SDLC_9: u8 = 0x9;

#[inline]
pub fn is_sdlc(lcd: u8) -> bool {
    lcd == LCD_SDLC_8 || lcd == LCD_SDLC_9
}

/// The NCP-visible register fields of one line's ICW.
#[derive(Clone, Debug)]
pub struct Icw {
    pub scf: Scf,
    pub pdf: u8,
    pub lcd: u8,
    pub pcf: u8,
    pub sdf: u8,
    pub rflags: u16,
}

impl Default for Icw {
    fn default() -> Self {
        Self {
            scf: Scf::empty(),
            pdf: 0,
            lcd: 0,
            // Real hardware and the original simulator both start a freshly
            // initialized line at PCF=0xE (unused/idle) rather than 0.
            pcf: 0xE,
            sdf: 0,
            rflags: 0,
        }
    }
}

/// Scanner-private derived state, not visible to NCP directly.
#[derive(Clone, Debug, Default)]
pub struct ScannerLineState {
    /// PCF value from the previous scan cycle, for edge detection.
    pub pcf_prev: u8,
    /// The PCF value the scanner intends to transition into at cycle end.
    pub pcf_next: u8,
    /// Logical half-duplex direction.
    pub line_stat: LineStat,
    /// FILLED/EMPTY handshake flag for `pdf`.
    pub pdf_reg: PdfReg,
}

impl ScannerLineState {
    /// `true` the first cycle a state is entered (pcf_prev != current pcf).
    #[inline]
    pub fn first_entry(&self, current_pcf: u8) -> bool {
        self.pcf_prev != current_pcf
    }
}
