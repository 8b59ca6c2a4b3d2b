//! Cooperative polling loop tying a byte source to the framer, decoder,
//! and cycle controller.
//!
//! Single-threaded by construction: one loop asks the source for whatever
//! is currently available (up to a cap), feeds it to the framer, and
//! processes every resulting packet synchronously and in arrival order
//! before polling again. Cancellation is observed between iterations, and
//! every exit path delivers a final [`Snapshot`] to the handler exactly
//! once, so partial cycle state is never silently discarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{trace, warn};

use crate::cycle::{CycleController, CycleEvent, Policy, Snapshot};
use crate::{Framer, Packet, Result, Sample};

/// Largest whole-packet read that fits in 4 KiB.
pub const DEFAULT_READ_MAX: usize = 4096 - 4096 % Packet::LEN;

/// Source of tap bytes, e.g. a serial transport.
///
/// `recv` must return promptly: `Ok(0)` means "no data right now", never
/// end-of-stream, so the loop stays responsive to cancellation. Retry and
/// reconnect policy belongs to the transport; a returned error ends the
/// run after the final snapshot is reported.
pub trait ByteSource {
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Consumer of decoded records and cycle results.
///
/// All methods default to no-ops so a handler implements only what it
/// needs. `on_sample` fires per decoded packet (live tracing),
/// `on_event` per resolved cycle or attempt, and `on_shutdown` exactly
/// once with the final state regardless of how the run ends.
pub trait Handler {
    fn on_sample(&mut self, _packet: &Packet, _sample: &Sample) {}
    fn on_event(&mut self, _event: &CycleEvent) {}
    fn on_shutdown(&mut self, _snapshot: &Snapshot) {}
}

/// Discards everything.
impl Handler for () {}

/// Cloneable flag for interrupting a [`Sniffer::run`] from another thread
/// or a signal handler. Checked once per poll iteration.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The decode loop: byte source in, cycle results out.
pub struct Sniffer<S, H> {
    source: S,
    handler: H,
    controller: CycleController,
    framer: Framer,
    cancel: CancelToken,
    read_max: usize,
}

impl<S, H> Sniffer<S, H>
where
    S: ByteSource,
    H: Handler,
{
    pub fn new(source: S, handler: H, policy: Policy) -> Self {
        Sniffer {
            source,
            handler,
            controller: CycleController::new(policy),
            framer: Framer::new(),
            cancel: CancelToken::new(),
            read_max: DEFAULT_READ_MAX,
        }
    }

    /// Use an externally held token to interrupt the run.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Cap on bytes requested per poll. Does not need to be packet-aligned;
    /// the framer carries any remainder.
    #[must_use]
    pub fn with_read_max(mut self, read_max: usize) -> Self {
        self.read_max = read_max;
        self
    }

    /// Run until cancelled, until the policy's attempt goal is reached, or
    /// until the source fails. The final snapshot goes to
    /// [`Handler::on_shutdown`] on every exit path before this returns.
    ///
    /// # Errors
    /// The first transport error, after the shutdown report.
    pub fn run(mut self) -> Result<Snapshot> {
        let zult = self.poll();
        let snapshot = self.controller.snapshot();
        self.handler.on_shutdown(&snapshot);
        zult.map(|()| snapshot)
    }

    fn poll(&mut self) -> Result<()> {
        let mut buf = vec![0u8; self.read_max];
        loop {
            if self.cancel.is_cancelled() {
                trace!("cancelled");
                return Ok(());
            }
            if self.controller.done() {
                trace!("attempt goal reached");
                return Ok(());
            }
            // A stalled attempt times out even when no bytes arrive.
            if let Some(event) = self.controller.check_timeout() {
                self.handler.on_event(&event);
            }

            let n = match self.source.recv(&mut buf) {
                Ok(n) => n,
                Err(err) => {
                    warn!(err = %err, "byte source failed");
                    return Err(err);
                }
            };
            if n == 0 {
                continue;
            }

            for packet in self.framer.feed(&buf[..n]) {
                let sample = packet.sample();
                trace!(
                    data = ?packet.data,
                    mosi = sample.mosi,
                    freq_mhz = sample.freq_mhz(),
                    "packet"
                );
                self.handler.on_sample(&packet, &sample);
                if let Some(event) = self.controller.handle(&sample) {
                    self.handler.on_event(&event);
                }
            }
        }
    }
}
