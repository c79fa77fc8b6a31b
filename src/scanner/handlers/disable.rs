//! PCF 0xF — Disable line.

use crate::error::Result;
use crate::icw::{Icw, Scf, ScannerLineState};

pub(super) fn pcf_f(icw: &mut Icw, state: &mut ScannerLineState) -> Result<bool> {
    icw.scf.insert(Scf::NORM_CHAR_SERVICE);
    state.pcf_next = 0;
    Ok(true)
}
