//! PCF 0 (no-op/reset) and the two genuinely unused states, 0xB and 0xE.

use crate::error::Result;
use crate::icw::{Icw, ScannerLineState};

use crate::scanner::LineBuffers;

/// PCF 0 — idle. First entry clears check-condition bits and both buffers;
/// never raises an L2.
pub(super) fn pcf0(icw: &mut Icw, state: &mut ScannerLineState, buf: &mut LineBuffers) -> Result<bool> {
    if state.first_entry(icw.pcf) {
        icw.scf.reset_check_conditions();
        buf.clear_rsp();
        // The scanner only owns `req` while it is still mid-accumulation;
        // once handed off at PCF=0xC it belongs to Line I/O and is not
        // touched here.
        buf.req_local.clear();
    }
    Ok(false)
}

/// PCF 0xB / 0xE — unused, always a no-op.
pub(super) fn unused() -> Result<bool> {
    Ok(false)
}
