/*!
Error taxonomy for the scanner core.

Mirrors the error handling design: transient peer I/O and buffer overruns are
`ScannerError` values that a caller logs and acts on (closing a line's
connection); genuine internal invariant violations (e.g. raising a second L2
while one is already pending) are modeled as `assert!`/`panic!` instead, since
they indicate a bug in the scanner itself rather than a recoverable condition.
*/

use std::io;

use crate::icw::LineIndex;

/// Errors surfaced by the scanner and line I/O workers.
#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    /// A BLU buffer append pointer reached capacity. Fatal for the line: the
    /// caller must close the line's connection rather than write out of bounds.
    #[error("line {line}: BLU buffer overrun (capacity {capacity} bytes)")]
    BufferOverrun { line: LineIndex, capacity: usize },

    /// `lcd` named a line discipline this core does not implement (only SDLC,
    /// `0x8`/`0x9`, is supported). Logged, not fatal: the scanner simply
    /// no-ops for the line until NCP sets a supported `lcd`.
    #[error("line {line}: unsupported line code definer {lcd:#x}")]
    UnsupportedLineDiscipline { line: LineIndex, lcd: u8 },

    /// A transient TCP error on the peer connection. The line transitions to
    /// `DISC`; not reported to NCP.
    #[error("line {line}: peer I/O error: {source}")]
    PeerIo {
        line: LineIndex,
        #[source]
        source: io::Error,
    },

    /// A line index outside `[0, max_lines)` was requested of the external
    /// register bank. Indicates a bug at the CCU/core boundary.
    #[error("line index {line} out of range (max_lines = {max_lines})")]
    InvalidLineIndex { line: usize, max_lines: usize },
}

pub type Result<T> = std::result::Result<T, ScannerError>;
