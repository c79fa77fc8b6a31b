//! PCF 8 (Transmit Initial, RTS on), PCF 9 (Transmit Normal), PCF 0xA
//! (Transmit Normal with new sync).

use crate::discipline::LineDiscipline;
use crate::error::Result;
use crate::icw::{Icw, LineIndex, PdfReg, Scf, ScannerLineState};

use crate::scanner::LineBuffers;

use super::log_unsupported_lcd;

/// PCF 8 — RTS on. CTS is synthetic and always granted: there is no
/// collaborator in this core's scope that could withhold it, so the
/// transition is unconditional. Never requests an L2: the transition is
/// internal.
pub(super) fn pcf8(
    icw: &mut Icw,
    state: &mut ScannerLineState,
    disc: &dyn LineDiscipline,
    line: LineIndex,
) -> Result<bool> {
    if !disc.supports(icw.lcd) {
        log_unsupported_lcd(state, icw, line);
        return Ok(false);
    }
    icw.scf.remove(Scf::FLAG_DETECTED);
    state.pcf_next = 9;
    Ok(false)
}

/// PCF 9 — shift one NCP-supplied byte into `req` per cycle.
pub(super) fn pcf9(
    icw: &mut Icw,
    state: &mut ScannerLineState,
    disc: &dyn LineDiscipline,
    buf: &mut LineBuffers,
    line: LineIndex,
    buffer_size: usize,
) -> Result<bool> {
    if !disc.supports(icw.lcd) {
        log_unsupported_lcd(state, icw, line);
        return Ok(false);
    }
    if state.pdf_reg != PdfReg::Filled {
        return Ok(false);
    }
    buf.append_req(icw.pdf, line, buffer_size)?;
    state.pdf_reg = PdfReg::Empty;
    icw.scf.insert(Scf::NORM_CHAR_SERVICE);
    state.pcf_next = 9;
    Ok(true)
}

/// PCF 0xA — no-op beyond the L2/level gate already applied by the caller.
/// Real hardware re-issues sync bytes here; the TCP transport has no use
/// for them (open question, resolved as NCP's responsibility).
pub(super) fn pcf_a(icw: &Icw, disc: &dyn LineDiscipline) -> Result<bool> {
    let _ = (icw, disc);
    Ok(false)
}
