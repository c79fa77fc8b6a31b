/*!
Level-2 interrupt contract between the Scanner and the CCU.

A single `svc_req_L2` flag plus the `abar_int` word. The scanner rule is
strict: it is a bug to set `svc_req_L2` while it is already ON: the scanner
must spin-wait for the CCU to clear it first. The CCU rule (out of scope
here) is to clear `svc_req_L2` exactly when L2 handling completes.
*/

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use crate::ereg::ABAR_LINE_BASE;
use crate::icw::LineIndex;

/// The CCU interrupt level at which the scanner must not touch the PDF
/// handshake.
pub const L2_LEVEL: u32 = 2;

/// Shared level-2 interrupt signaling state.
pub struct Interrupts {
    svc_req_l2: AtomicBool,
    abar_int: AtomicU32,
    current_level: AtomicU32,
}

impl Default for Interrupts {
    fn default() -> Self {
        Self::new()
    }
}

impl Interrupts {
    pub fn new() -> Self {
        Interrupts {
            svc_req_l2: AtomicBool::new(false),
            abar_int: AtomicU32::new(0),
            current_level: AtomicU32::new(0),
        }
    }

    /// `true` while the CCU has not yet finished servicing the pending L2.
    pub fn l2_pending(&self) -> bool {
        self.svc_req_l2.load(Ordering::Acquire)
    }

    /// `true` when the CCU is currently executing at interrupt level 2; the
    /// scanner must not touch the PDF handshake while this holds.
    pub fn at_l2_level(&self) -> bool {
        self.current_level.load(Ordering::Acquire) == L2_LEVEL
    }

    /// CCU-side: set the level the CCU is currently executing at. Not part
    /// of the core's own behavior; provided for the demo/test harness that
    /// stands in for the CCU.
    pub fn set_current_level(&self, level: u32) {
        self.current_level.store(level, Ordering::Release);
    }

    /// CCU-side: clear the pending L2 request once handling is complete.
    pub fn clear_l2(&self) {
        self.svc_req_l2.store(false, Ordering::Release);
    }

    pub fn abar_int(&self) -> u32 {
        self.abar_int.load(Ordering::Acquire)
    }

    /// Scanner-side: raise an L2 interrupt for `line`, spin-waiting first if
    /// one is already pending (Phase C of the per-line step). It is a fatal
    /// bug — not a
    /// recoverable condition — for this to be called again before the spin
    /// wait below observes the flag clear, since that can only happen if two
    /// scan iterations both decided to request an L2 without an intervening
    /// post-process step.
    pub fn request_l2(&self, line: LineIndex, spin_sleep: Duration) {
        while self.svc_req_l2.load(Ordering::Acquire) {
            std::thread::sleep(spin_sleep);
        }
        self.abar_int.store(ABAR_LINE_BASE + line as u32, Ordering::Release);
        let was_pending = self.svc_req_l2.swap(true, Ordering::AcqRel);
        assert!(
            !was_pending,
            "scanner issued a second L2 request for line {line} while one was still pending"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_l2_sets_abar_and_flag() {
        let interrupts = Interrupts::new();
        interrupts.request_l2(2, Duration::from_micros(1));
        assert!(interrupts.l2_pending());
        assert_eq!(interrupts.abar_int(), ABAR_LINE_BASE + 2);
    }

    #[test]
    fn clear_allows_next_request() {
        let interrupts = Interrupts::new();
        interrupts.request_l2(0, Duration::from_micros(1));
        interrupts.clear_l2();
        assert!(!interrupts.l2_pending());
        interrupts.request_l2(1, Duration::from_micros(1));
        assert_eq!(interrupts.abar_int(), ABAR_LINE_BASE + 1);
    }

    #[test]
    fn at_l2_level_reflects_current_level() {
        let interrupts = Interrupts::new();
        assert!(!interrupts.at_l2_level());
        interrupts.set_current_level(2);
        assert!(interrupts.at_l2_level());
    }
}
