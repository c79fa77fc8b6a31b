/*!
Per-line PCF state machine.

A [`Scanner`] owns one [`Line`] per configured line, a handle to the shared
[`ExternalRegisters`] bank and [`Interrupts`] signal, and a [`LineDiscipline`]
strategy object. [`Scanner::run`] drives the scan loop used by the
long-lived worker thread; the `ncp_*` methods are the synchronous entry
points a test harness or the demo CLI uses to stand in for the CCU/NCP side
that this core does not implement.
*/

mod handlers;
#[cfg(test)]
mod tests;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::channels::{self, ScannerChannelHalf};
use crate::discipline::LineDiscipline;
use crate::ereg::{EregView, ExternalRegisters};
use crate::error::{Result, ScannerError};
use crate::icw::{Icw, LineIndex, LineStat, PdfReg, ScannerLineState};
use crate::interrupts::Interrupts;

/// One line's scanner-owned state: the NCP-visible [`Icw`], the derived
/// [`ScannerLineState`], and the staging areas for the two BLU buffers.
pub struct Line {
    pub icw: Icw,
    pub state: ScannerLineState,
    /// Bytes accumulated for the outbound frame during PCF=9, handed off to
    /// Line I/O whole at PCF=0xC.
    req_local: Vec<u8>,
    /// Inbound bytes handed over from Line I/O, reassembled across however
    /// many socket reads a BLU frame actually arrived in.
    rsp_buf: VecDeque<u8>,
    /// The last up to two bytes already taken from `rsp_buf`, oldest first —
    /// lets the FCS+EFlag closing-sequence check in PCF=7 see three
    /// consecutive bytes even when they straddle a chunk boundary.
    rsp_history: VecDeque<u8>,
}

impl Default for Line {
    fn default() -> Self {
        Line {
            icw: Icw::default(),
            state: ScannerLineState::default(),
            req_local: Vec::new(),
            rsp_buf: VecDeque::new(),
            rsp_history: VecDeque::new(),
        }
    }
}

/// Borrowed handles a PCF handler needs to touch the BLU buffers, scoped to
/// a single [`Scanner::step_line`] call.
pub(crate) struct LineBuffers<'a> {
    req_local: &'a mut Vec<u8>,
    req_tx: &'a crossbeam_channel::Sender<Vec<u8>>,
    rsp_buf: &'a mut VecDeque<u8>,
    rsp_history: &'a mut VecDeque<u8>,
    rsp_rx: &'a Receiver<Vec<u8>>,
}

impl LineBuffers<'_> {
    /// Pull every chunk Line I/O currently has waiting and append it to the
    /// reassembly buffer. A BLU frame larger than one socket read arrives as
    /// several chunks over several scan cycles; calling this at the top of
    /// every PCF=4/5/6/7 entry (not just PCF=4/5) means none of them are
    /// missed while the scanner is mid-frame.
    fn try_refill(&mut self) {
        while let Ok(chunk) = self.rsp_rx.try_recv() {
            self.rsp_buf.extend(chunk);
        }
    }

    fn first_rsp_byte(&self) -> Option<u8> {
        self.rsp_buf.front().copied()
    }

    /// The three most recently placed bytes ending at the next byte to be
    /// taken, for the FCS+EFlag closing-sequence check in PCF=7. Uses
    /// `rsp_history` rather than indexing into a single chunk so the triple
    /// is seen correctly even when it spans a chunk boundary.
    fn peek_last_three(&self) -> Option<[u8; 3]> {
        if self.rsp_history.len() < 2 {
            return None;
        }
        let next = *self.rsp_buf.front()?;
        Some([self.rsp_history[0], self.rsp_history[1], next])
    }

    fn take_rsp_byte(&mut self) -> Option<u8> {
        let byte = self.rsp_buf.pop_front()?;
        if self.rsp_history.len() >= 2 {
            self.rsp_history.pop_front();
        }
        self.rsp_history.push_back(byte);
        Some(byte)
    }

    fn clear_rsp(&mut self) {
        self.rsp_buf.clear();
        self.rsp_history.clear();
    }

    fn append_req(&mut self, byte: u8, line: LineIndex, capacity: usize) -> Result<()> {
        if self.req_local.len() >= capacity {
            return Err(ScannerError::BufferOverrun { line, capacity });
        }
        self.req_local.push(byte);
        Ok(())
    }

    /// Finalize the accumulated outbound frame and hand it to Line I/O.
    /// Returns the frame back if the handoff slot is still full (Line I/O
    /// hasn't drained the previous one yet); the caller logs and drops it.
    pub(crate) fn finish_req(&mut self) -> Option<Vec<u8>> {
        if self.req_local.is_empty() {
            return None;
        }
        let frame = std::mem::take(self.req_local);
        channels::try_handoff(self.req_tx, frame).err()
    }
}

/// Owns all per-line state and the worker loop that advances the PCF state
/// machine.
pub struct Scanner {
    lines: Vec<Mutex<Line>>,
    channels: Vec<ScannerChannelHalf>,
    eregs: Arc<ExternalRegisters>,
    interrupts: Arc<Interrupts>,
    discipline: Box<dyn LineDiscipline>,
    buffer_size: usize,
    scan_interval: Duration,
    l2_spin_sleep: Duration,
    shutdown: Arc<AtomicBool>,
}

impl Scanner {
    pub fn new(
        max_lines: usize,
        buffer_size: usize,
        scan_interval: Duration,
        eregs: Arc<ExternalRegisters>,
        interrupts: Arc<Interrupts>,
        channels: Vec<ScannerChannelHalf>,
        discipline: Box<dyn LineDiscipline>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        assert_eq!(channels.len(), max_lines, "one channel half per line");
        let lines = (0..max_lines).map(|_| Mutex::new(Line::default())).collect();
        Scanner {
            lines,
            channels,
            eregs,
            interrupts,
            discipline,
            buffer_size,
            scan_interval,
            l2_spin_sleep: Duration::from_micros(50),
            shutdown,
        }
    }

    pub fn max_lines(&self) -> usize {
        self.lines.len()
    }

    /// Run the scan loop until the shutdown signal is set. Intended for the
    /// dedicated, pinned scanner worker thread.
    pub fn run(&self) {
        while !self.shutdown.load(Ordering::Relaxed) {
            for idx in 0..self.lines.len() {
                if let Err(err) = self.step_line(idx) {
                    log::error!("line {idx}: {err}");
                }
            }
            std::thread::sleep(self.scan_interval);
        }
    }

    /// One full Phase A / B / C cycle for a single line.
    pub(crate) fn step_line(&self, idx: LineIndex) -> Result<()> {
        let mut line = self.lines[idx].lock().unwrap();

        // Phase A: observe NCP writes to the external register bank.
        if let Some((_word, decoded)) = self.eregs.take_pcf45_write(idx) {
            line.icw.lcd = decoded.lcd;
            line.icw.sdf = decoded.sdf;
            line.state.pcf_next = decoded.pcf_next;
        }
        if let Some((_word, decoded)) = self.eregs.take_scf44_write(idx) {
            line.icw.pdf = decoded.pdf;
            line.state.pdf_reg = PdfReg::Filled;
        }
        if line.icw.pcf != line.state.pcf_next {
            if line.state.pcf_next == 0 {
                line.state.line_stat = LineStat::Reset;
            }
            line.state.pcf_prev = line.icw.pcf;
            line.icw.pcf = line.state.pcf_next;
        }

        // Phase B: act on the current PCF.
        let channel = &self.channels[idx];
        let mut buf = LineBuffers {
            req_local: &mut line.req_local,
            req_tx: &channel.req_tx,
            rsp_buf: &mut line.rsp_buf,
            rsp_history: &mut line.rsp_history,
            rsp_rx: &channel.rsp_rx,
        };
        let request_l2 = handlers::dispatch(
            &mut line.icw,
            &mut line.state,
            self.discipline.as_ref(),
            &mut buf,
            &self.interrupts,
            idx,
            self.buffer_size,
        )?;

        // Phase C: post-process.
        if request_l2 {
            self.interrupts.request_l2(idx, self.l2_spin_sleep);
        }
        line.state.pcf_prev = line.icw.pcf;
        if line.icw.pcf != line.state.pcf_next {
            line.icw.pcf = line.state.pcf_next;
        }
        self.eregs.publish_icw(idx, &line.icw);
        Ok(())
    }

    // -- NCP-facing API, used by the demo CLI and test harness in place of
    // a real CCU/NCP. --

    pub fn ncp_select_line(&self, line: LineIndex) {
        self.eregs.select_line(line);
    }

    pub fn ncp_write_pcf45(&self, line: LineIndex, word: u32) -> Result<()> {
        self.eregs.write_pcf45(line, word)
    }

    pub fn ncp_write_scf44(&self, line: LineIndex, word: u32) -> Result<()> {
        self.eregs.write_scf44(line, word)
    }

    pub fn ncp_read_icw(&self, line: LineIndex) -> Result<EregView> {
        self.eregs.read_view(line)
    }

    /// The NCP consuming a byte the scanner delivered during PCF=6/7. Clears
    /// `pdf_reg` back to EMPTY, the other half of the handshake invariant:
    /// on RX the scanner writes FILLED and NCP drains it back to EMPTY.
    pub fn ncp_read_pdf(&self, line: LineIndex) -> Option<u8> {
        let mut l = self.lines[line].lock().unwrap();
        if l.state.line_stat == LineStat::Rx && l.state.pdf_reg == PdfReg::Filled {
            l.state.pdf_reg = PdfReg::Empty;
            Some(l.icw.pdf)
        } else {
            None
        }
    }

    pub fn icw_snapshot(&self, line: LineIndex) -> Icw {
        self.lines[line].lock().unwrap().icw.clone()
    }

    pub fn line_stat(&self, line: LineIndex) -> LineStat {
        self.lines[line].lock().unwrap().state.line_stat
    }

    pub fn pcf_next(&self, line: LineIndex) -> u8 {
        self.lines[line].lock().unwrap().state.pcf_next
    }

    /// Test-only: force a line's logical direction without going through a
    /// full PCF=0xC/PCF=7 turnaround, to set up scenarios that start
    /// mid-conversation.
    #[cfg(test)]
    pub(crate) fn set_line_stat_for_test(&self, line: LineIndex, stat: LineStat) {
        self.lines[line].lock().unwrap().state.line_stat = stat;
    }
}
