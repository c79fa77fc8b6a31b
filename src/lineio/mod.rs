/*!
Per-line TCP endpoint lifecycle.

Mirrors the scanner's "one worker owns a `Mutex`-per-line array" shape, but
the work done per tick is socket plumbing rather than PCF dispatch: flush a
finished outbound BLU, drain whatever bytes the peer has sent, and poll the
listener for a reconnect while disconnected.
*/

#[cfg(test)]
mod tests;

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::channels::LineIoChannelHalf;
use crate::config::ScannerConfig;
use crate::error::{Result, ScannerError};
use crate::icw::LineIndex;

/// Connection lifecycle for one line's peer socket.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConnState {
    Disc,
    Conn,
}

/// Modem-clocking artifact bytes that may lead an outbound frame and are
/// stripped before it hits the wire.
const LEADING_SKIP: [u8; 2] = [0x00, 0xAA];

struct Endpoint {
    listener: TcpListener,
    stream: Option<TcpStream>,
    state: ConnState,
}

impl Endpoint {
    fn bind(bind_addr: &str, port: u16) -> io::Result<Self> {
        let listener = TcpListener::bind((bind_addr, port))?;
        listener.set_nonblocking(true)?;
        Ok(Endpoint {
            listener,
            stream: None,
            state: ConnState::Disc,
        })
    }

    fn close(&mut self) {
        self.stream = None;
        self.state = ConnState::Disc;
    }
}

/// Owns all per-line TCP endpoints and the worker loop that drives them.
pub struct LineIo {
    endpoints: Vec<Mutex<Endpoint>>,
    channels: Vec<LineIoChannelHalf>,
    buffer_size: usize,
    loop_interval: Duration,
    accept_poll_interval: Duration,
    shutdown: std::sync::Arc<AtomicBool>,
}

impl LineIo {
    /// Bind one listener per line at `port_base + line_index`.
    pub fn bind(
        config: &ScannerConfig,
        channels: Vec<LineIoChannelHalf>,
        shutdown: std::sync::Arc<AtomicBool>,
    ) -> io::Result<Self> {
        let mut endpoints = Vec::with_capacity(channels.len());
        for line in 0..channels.len() {
            let port = config.port_for_line(line);
            endpoints.push(Mutex::new(Endpoint::bind(&config.bind_addr, port)?));
        }
        Ok(LineIo {
            endpoints,
            channels,
            buffer_size: config.buffer_size,
            loop_interval: config.lineio_interval(),
            accept_poll_interval: config.accept_poll_interval(),
            shutdown,
        })
    }

    pub fn max_lines(&self) -> usize {
        self.endpoints.len()
    }

    /// Test-only: observe a line's connection lifecycle state directly,
    /// rather than inferring it from socket behavior.
    #[cfg(test)]
    pub(crate) fn conn_state_for_test(&self, line: LineIndex) -> ConnState {
        self.endpoints[line].lock().unwrap().state
    }

    /// The port a line's listener actually bound to. Useful when
    /// `port_base` is `0` (OS-assigned, as in tests) and for logging the
    /// effective bind at startup.
    pub fn local_port(&self, line: LineIndex) -> io::Result<u16> {
        Ok(self.endpoints[line].lock().unwrap().listener.local_addr()?.port())
    }

    /// Run the Line I/O loop until the shutdown signal is set. Intended for
    /// the dedicated, pinned Line I/O worker thread.
    pub fn run(&self) {
        let mut last_poll = std::time::Instant::now() - self.accept_poll_interval;
        while !self.shutdown.load(Ordering::Relaxed) {
            let do_accept_poll = last_poll.elapsed() >= self.accept_poll_interval;
            for idx in 0..self.endpoints.len() {
                if let Err(err) = self.step_line(idx, do_accept_poll) {
                    log::warn!("line {idx}: {err}");
                }
            }
            if do_accept_poll {
                last_poll = std::time::Instant::now();
            }
            std::thread::sleep(self.loop_interval);
        }
    }

    /// One flush/drain/reconnect cycle for a single line.
    pub(crate) fn step_line(&self, idx: LineIndex, poll_accept: bool) -> Result<()> {
        let mut ep = self.endpoints[idx].lock().unwrap();
        let channel = &self.channels[idx];

        if ep.state == ConnState::Conn {
            self.flush_outbound(idx, &mut ep, channel)?;
        }
        if ep.state == ConnState::Conn {
            self.drain_inbound(idx, &mut ep, channel)?;
        }
        if ep.state == ConnState::Disc && poll_accept {
            self.try_reconnect(idx, &mut ep);
        }
        Ok(())
    }

    /// Step 1 — flush outbound: send a finished BLU whole, stripping an
    /// optional leading clocking-artifact byte.
    fn flush_outbound(&self, idx: LineIndex, ep: &mut Endpoint, channel: &LineIoChannelHalf) -> Result<()> {
        let Ok(frame) = channel.req_rx.try_recv() else {
            return Ok(());
        };
        let payload: &[u8] = match frame.first() {
            Some(b) if LEADING_SKIP.contains(b) => &frame[1..],
            _ => &frame[..],
        };
        let stream = ep.stream.as_mut().expect("CONN implies a stream is present");
        match stream.write_all(payload) {
            Ok(()) => {
                log::trace!("line {idx}: sent {} bytes", payload.len());
                Ok(())
            }
            Err(source) => {
                log::warn!("line {idx}: send failed, disconnecting: {source}");
                ep.close();
                Err(ScannerError::PeerIo { line: idx, source })
            }
        }
    }

    /// Step 2 — drain inbound: read whatever is available directly into a
    /// fresh chunk and hand it to the scanner.
    fn drain_inbound(&self, idx: LineIndex, ep: &mut Endpoint, channel: &LineIoChannelHalf) -> Result<()> {
        if crate::channels::is_filled(&channel.rsp_tx) {
            return Ok(());
        }
        let stream = ep.stream.as_mut().expect("CONN implies a stream is present");
        let mut buf = vec![0u8; self.buffer_size];
        match stream.read(&mut buf) {
            Ok(0) => Ok(()),
            Ok(n) => {
                log::trace!("line {idx}: received {n} bytes");
                // The slot was just confirmed empty above and this line is
                // the sole producer, so the send cannot fail; if it somehow
                // does (spurious wakeup racing a test harness), drop the
                // chunk rather than block the loop.
                if channel.rsp_tx.try_send(buf[..n].to_vec()).is_err() {
                    log::warn!("line {idx}: rsp slot unexpectedly full, dropping {n} bytes");
                }
                Ok(())
            }
            Err(source) if source.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(source) => {
                log::warn!("line {idx}: read failed, disconnecting: {source}");
                ep.close();
                Err(ScannerError::PeerIo { line: idx, source })
            }
        }
    }

    /// Step 3 — reconnect: a non-blocking accept on the listener. Any
    /// in-flight `req`/`rsp` staging is simply abandoned; the next frame
    /// starts fresh once reconnected.
    fn try_reconnect(&self, idx: LineIndex, ep: &mut Endpoint) {
        match ep.listener.accept() {
            Ok((stream, addr)) => {
                log::info!("line {idx}: accepted connection from {addr}");
                if let Err(err) = stream.set_nonblocking(true) {
                    log::warn!("line {idx}: failed to set peer socket nonblocking: {err}");
                }
                ep.stream = Some(stream);
                ep.state = ConnState::Conn;
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
            Err(err) => log::warn!("line {idx}: accept failed: {err}"),
        }
    }
}
