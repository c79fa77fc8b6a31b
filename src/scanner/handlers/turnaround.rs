//! PCF 0xC (turn-around, RTS off — end of outbound frame) and PCF 0xD
//! (turn-around, RTS on).

use crate::discipline::LineDiscipline;
use crate::error::Result;
use crate::icw::{Icw, LineIndex, LineStat, Scf, ScannerLineState};

use crate::scanner::LineBuffers;

use super::log_unsupported_lcd;

/// PCF 0xC — finalize the accumulated outbound frame, hand it to Line I/O,
/// and turn the line around to RX. The canonical end-of-outbound transition.
pub(super) fn pcf_c(
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
    if !state.first_entry(icw.pcf) {
        return Ok(false);
    }
    if let Some(dropped) = buf.finish_req() {
        log::warn!(
            "line {line}: outbound frame dropped, {} bytes, Line I/O had not drained the previous one",
            dropped.len()
        );
    }
    state.line_stat = LineStat::Rx;
    icw.scf.insert(Scf::NORM_CHAR_SERVICE);
    state.pcf_next = 5;
    Ok(true)
}

/// PCF 0xD — first-entry trace only, otherwise a no-op.
pub(super) fn pcf_d(
    icw: &Icw,
    state: &ScannerLineState,
    disc: &dyn LineDiscipline,
    line: LineIndex,
) -> Result<bool> {
    if disc.supports(icw.lcd) && state.first_entry(icw.pcf) {
        log::trace!("line {line}: PCF=0xD (turn-around, RTS on)");
    }
    Ok(false)
}
