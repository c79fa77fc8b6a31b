/*!
Line discipline strategy.

Nearly every PCF handler gates its SDLC-specific behavior on `lcd ∈ {0x8,
0x9}`. This trait gives that gate, and the framing rules it protects, a named
seam instead of scattering `lcd` checks through the state machine. Only SDLC
is implemented; BSC and start-stop line disciplines are out of scope and are
not provided here.
*/

pub const FLAG: u8 = 0x7E;
/// FCS bytes that precede the closing flag on every outbound frame this core
/// emits, and that are recognized as the closing sequence on input.
pub const FCS: [u8; 2] = [0x47, 0x0F];

/// Behavior specific to one link-layer framing discipline.
pub trait LineDiscipline: Send + Sync {
    /// Whether this discipline handles the given Line Code Definer value.
    fn supports(&self, lcd: u8) -> bool;

    /// The `lcd` value to force once the opening flag has been recognized
    /// (SDLC normalizes both 0x8 and 0x9 to 0x9 on flag detection).
    fn normalized_lcd(&self) -> u8;

    /// Whether `byte` is the opening flag a PCF=4/5 handler watches for.
    fn is_opening_flag(&self, byte: u8) -> bool;

    /// Whether `byte` is a flag the PCF=6 receiver should silently skip
    /// rather than deliver to NCP.
    fn is_skippable_in_receive(&self, byte: u8) -> bool;

    /// Given the three most recently placed response bytes (oldest first),
    /// whether they form the FCS + closing-flag pattern that ends a frame.
    fn is_closing_sequence(&self, last_three: [u8; 3]) -> bool;
}

/// Synchronous Data Link Control (8-bit), the only discipline this core
/// implements.
#[derive(Copy, Clone, Debug, Default)]
pub struct Sdlc;

impl LineDiscipline for Sdlc {
    fn supports(&self, lcd: u8) -> bool {
        crate::icw::is_sdlc(lcd)
    }

    fn normalized_lcd(&self) -> u8 {
        crate::icw::LCD_SDLC_9
    }

    fn is_opening_flag(&self, byte: u8) -> bool {
        byte == FLAG
    }

    fn is_skippable_in_receive(&self, byte: u8) -> bool {
        byte == FLAG
    }

    fn is_closing_sequence(&self, last_three: [u8; 3]) -> bool {
        last_three == [FCS[0], FCS[1], FLAG]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_sdlc_lcd_values() {
        let sdlc = Sdlc;
        assert!(sdlc.supports(0x8));
        assert!(sdlc.supports(0x9));
        assert!(!sdlc.supports(0x2));
    }

    #[test]
    fn recognizes_closing_sequence() {
        let sdlc = Sdlc;
        assert!(sdlc.is_closing_sequence([0x47, 0x0F, 0x7E]));
        assert!(!sdlc.is_closing_sequence([0x47, 0x0F, 0x00]));
    }
}
