#![doc = r#"
scan3705 — Type-2 Communication Scanner + SDLC primary-station line handler
for a simulated IBM 3705 front-end communications controller.

This crate is the core emulator library; `scan3705d` (`src/main.rs`) is a
thin CLI wrapper that wires it to real sockets for manual smoke testing.

Modules:
- icw: Interface Control Word fields and scanner-private derived state
- ereg: external register bank (CCU <-> Scanner)
- interrupts: the level-2 interrupt contract with the CCU
- channels: BLU buffer handoff between Scanner and Line I/O
- discipline: line discipline strategy (SDLC is the only implementation)
- scanner: the PCF state machine worker
- lineio: the per-line TCP endpoint worker
- config: layered scanner configuration
- error: the scanner's error taxonomy
- worker: advisory core-pinning helper for the long-lived worker threads
"#]

pub mod channels;
pub mod config;
pub mod discipline;
pub mod ereg;
pub mod error;
pub mod icw;
pub mod interrupts;
pub mod lineio;
pub mod scanner;
pub mod worker;

pub use config::ScannerConfig;
pub use ereg::ExternalRegisters;
pub use error::{Result, ScannerError};
pub use interrupts::Interrupts;
pub use lineio::LineIo;
pub use scanner::Scanner;
