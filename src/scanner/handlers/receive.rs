//! PCF 4/5 (monitor opening flag), PCF 6 (receive, block data interrupts),
//! PCF 7 (receive, allow data interrupts).

use crate::discipline::LineDiscipline;
use crate::error::Result;
use crate::icw::{Icw, LineIndex, LineStat, PdfReg, Scf, ScannerLineState};

use crate::scanner::LineBuffers;

use super::log_unsupported_lcd;

/// PCF 4/5 — wait for the opening flag. The core treats 4 and 5 identically
/// for SDLC (the DSR-error distinction is a hardware detail out of scope).
pub(super) fn pcf4_5(
    icw: &mut Icw,
    state: &mut ScannerLineState,
    disc: &dyn LineDiscipline,
    buf: &mut LineBuffers,
    line: LineIndex,
) -> Result<bool> {
    if matches!(state.line_stat, LineStat::Reset | LineStat::Tx) {
        return Ok(false);
    }

    buf.try_refill();
    if !disc.supports(icw.lcd) {
        log_unsupported_lcd(state, icw, line);
        return Ok(false);
    }
    let Some(first) = buf.first_rsp_byte() else {
        return Ok(false);
    };
    if !disc.is_opening_flag(first) {
        return Ok(false);
    }

    // Force the flag-detected bit on regardless of its prior value (the
    // original clears bit 0x04 with a 0xFB mask, then sets it — net effect
    // identical to an unconditional insert).
    icw.scf.insert(Scf::FLAG_DETECTED);
    icw.lcd = disc.normalized_lcd();
    state.pcf_next = 6;
    Ok(true)
}

/// PCF 6 — shift bytes out of `rsp` until a non-flag byte is found, then
/// deliver it to NCP and move on to PCF 7.
pub(super) fn pcf6(
    icw: &mut Icw,
    state: &mut ScannerLineState,
    disc: &dyn LineDiscipline,
    buf: &mut LineBuffers,
) -> Result<bool> {
    buf.try_refill();
    let Some(byte) = buf.take_rsp_byte() else {
        return Ok(false);
    };
    if disc.is_skippable_in_receive(byte) {
        return Ok(false);
    }
    icw.scf.insert(Scf::NORM_CHAR_SERVICE);
    icw.scf.remove(Scf::FLAG_DETECTED);
    icw.pdf = byte;
    state.pdf_reg = PdfReg::Filled;
    state.pcf_next = 7;
    Ok(true)
}

/// PCF 7 — deliver data bytes to NCP one at a time until the FCS + closing
/// flag pattern ends the frame, then turn the line around to TX.
pub(super) fn pcf7(
    icw: &mut Icw,
    state: &mut ScannerLineState,
    disc: &dyn LineDiscipline,
    buf: &mut LineBuffers,
    line: LineIndex,
) -> Result<bool> {
    if !disc.supports(icw.lcd) {
        log_unsupported_lcd(state, icw, line);
        return Ok(false);
    }
    if state.pdf_reg != PdfReg::Empty {
        return Ok(false);
    }
    buf.try_refill();
    let closing = buf
        .peek_last_three()
        .is_some_and(|triple| disc.is_closing_sequence(triple));
    let Some(byte) = buf.take_rsp_byte() else {
        return Ok(false);
    };

    if closing {
        buf.clear_rsp();
        state.line_stat = LineStat::Tx;
        icw.scf.insert(Scf::NORM_CHAR_SERVICE | Scf::FLAG_DETECTED);
        state.pcf_next = 6;
    } else {
        icw.pdf = byte;
        state.pdf_reg = PdfReg::Filled;
        icw.scf.insert(Scf::NORM_CHAR_SERVICE);
        state.pcf_next = 7;
    }
    Ok(true)
}
