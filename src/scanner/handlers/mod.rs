//! Per-PCF handlers, grouped by family the way a dispatch table for a
//! hardware opcode set would be.

mod disable;
mod idle;
mod receive;
mod setmode;
mod transmit;
mod turnaround;

use crate::discipline::LineDiscipline;
use crate::error::{Result, ScannerError};
use crate::icw::{Icw, LineIndex, ScannerLineState};
use crate::interrupts::Interrupts;

use super::LineBuffers;

/// PCF values whose handlers are gated on "no L2 pending, not at L2 level".
fn l2_gated(interrupts: &Interrupts) -> bool {
    interrupts.l2_pending() || interrupts.at_l2_level()
}

/// Log an unsupported `lcd` once per line-state-entry, not on every scan
/// cycle the line spends stuck on it.
fn log_unsupported_lcd(state: &ScannerLineState, icw: &Icw, line: LineIndex) {
    if state.first_entry(icw.pcf) {
        log::debug!("{}", ScannerError::UnsupportedLineDiscipline { line, lcd: icw.lcd });
    }
}

/// Dispatch one Phase-B step for the line currently at `icw.pcf`. Returns
/// whether the handler wants an L2 interrupt requested in Phase C.
pub(super) fn dispatch(
    icw: &mut Icw,
    state: &mut ScannerLineState,
    disc: &dyn LineDiscipline,
    buf: &mut LineBuffers,
    interrupts: &Interrupts,
    line: LineIndex,
    buffer_size: usize,
) -> Result<bool> {
    match icw.pcf {
        0x0 => idle::pcf0(icw, state, buf),
        0x1 | 0x2 | 0x3 => setmode::handle(icw, state),
        0x4 | 0x5 => receive::pcf4_5(icw, state, disc, buf, line),
        0x6 => {
            if l2_gated(interrupts) {
                Ok(false)
            } else {
                receive::pcf6(icw, state, disc, buf)
            }
        }
        0x7 => {
            if l2_gated(interrupts) {
                Ok(false)
            } else {
                receive::pcf7(icw, state, disc, buf, line)
            }
        }
        0x8 => {
            if l2_gated(interrupts) {
                Ok(false)
            } else {
                transmit::pcf8(icw, state, disc, line)
            }
        }
        0x9 => {
            if l2_gated(interrupts) {
                Ok(false)
            } else {
                transmit::pcf9(icw, state, disc, buf, line, buffer_size)
            }
        }
        0xA => {
            if l2_gated(interrupts) {
                Ok(false)
            } else {
                transmit::pcf_a(icw, disc)
            }
        }
        0xB => idle::unused(),
        0xC => turnaround::pcf_c(icw, state, disc, buf, line),
        0xD => turnaround::pcf_d(icw, state, disc, line),
        0xE => idle::unused(),
        0xF => disable::pcf_f(icw, state),
        other => {
            log::warn!("line {line}: reached unreachable PCF nibble {other:#x}");
            Ok(false)
        }
    }
}
