/*!
BLU buffer handoff between Scanner and Line I/O.

Each direction's FILLED/EMPTY flag is modeled as a bounded, single-slot
`crossbeam_channel`: a successful non-blocking send is the EMPTY→FILLED
transition, a full channel is "still FILLED, producer must wait", and a
successful receive is FILLED→EMPTY. This gives the same single-writer-at-a-time
guarantee as a flag byte without any hand-rolled unsafe lock-free code.

- `req` (NCP→remote): Scanner is the producer (sends a finished frame at
  PCF=C), Line I/O is the consumer (flushes it over TCP).
- `rsp` (remote→NCP): Line I/O is the producer (sends a chunk read from the
  socket), Scanner is the consumer (drains it byte-by-byte via PDF).
*/

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::icw::BufState;

/// Scanner's handles into one line's channel pair.
pub struct ScannerChannelHalf {
    pub req_tx: Sender<Vec<u8>>,
    pub rsp_rx: Receiver<Vec<u8>>,
}

/// Line I/O's handles into one line's channel pair.
pub struct LineIoChannelHalf {
    pub req_rx: Receiver<Vec<u8>>,
    pub rsp_tx: Sender<Vec<u8>>,
}

/// Build `n` single-slot channel pairs and split them into the Scanner-side
/// and Line-I/O-side handles.
pub fn build_channels(n: usize) -> (Vec<ScannerChannelHalf>, Vec<LineIoChannelHalf>) {
    let mut scanner_halves = Vec::with_capacity(n);
    let mut lineio_halves = Vec::with_capacity(n);
    for _ in 0..n {
        let (req_tx, req_rx) = bounded(1);
        let (rsp_tx, rsp_rx) = bounded(1);
        scanner_halves.push(ScannerChannelHalf { req_tx, rsp_rx });
        lineio_halves.push(LineIoChannelHalf { req_rx, rsp_tx });
    }
    (scanner_halves, lineio_halves)
}

/// `true` if a bounded(1) sender's slot currently holds an unconsumed value.
pub fn is_filled(tx: &Sender<Vec<u8>>) -> bool {
    tx.is_full()
}

pub fn buf_state(tx: &Sender<Vec<u8>>) -> BufState {
    if is_filled(tx) {
        BufState::Filled
    } else {
        BufState::Empty
    }
}

/// Attempt to hand off a finished frame/chunk. `Ok(())` on success (slot was
/// empty); `Err(data)` hands the value back if the slot was still full so
/// the caller can retry on a later cycle without losing it.
pub fn try_handoff(tx: &Sender<Vec<u8>>, data: Vec<u8>) -> Result<(), Vec<u8>> {
    match tx.try_send(data) {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(data)) => Err(data),
        Err(TrySendError::Disconnected(data)) => Err(data),
    }
}
