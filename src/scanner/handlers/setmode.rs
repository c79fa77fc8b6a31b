//! PCF 1/2/3 — Set Mode, Monitor DSR on, Monitor RI or DSR on. The core
//! treats all three identically: a one-shot acknowledgment L2, then back to
//! idle.

use crate::error::Result;
use crate::icw::{Icw, Scf, ScannerLineState};

pub(super) fn handle(icw: &mut Icw, state: &mut ScannerLineState) -> Result<bool> {
    if state.first_entry(icw.pcf) {
        icw.scf.insert(Scf::NORM_CHAR_SERVICE);
        state.pcf_next = 0;
        return Ok(true);
    }
    Ok(false)
}
