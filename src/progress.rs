use tokio::sync::mpsc;

/// Default bound for the progress channel
///
/// A transfer emits at most 101 distinct percentages, so the default bound
/// holds a full transfer's worth of updates for a lagging consumer.
pub const DEFAULT_PROGRESS_CAPACITY: usize = 128;

/// Non-blocking sink for percentage-complete notifications
///
/// The transfer loop pushes integer percentages into a bounded channel and a
/// separate consumer drains them. Delivery is best effort: when the channel
/// is full, or the receiver is gone, the update is dropped and the transfer
/// carries on.
#[derive(Debug, Clone)]
pub struct TransferProgress {
    tx: mpsc::Sender<u8>,
}

impl TransferProgress {
    /// Create a progress channel with the default capacity
    pub fn channel() -> (Self, ProgressReceiver) {
        Self::channel_with_capacity(DEFAULT_PROGRESS_CAPACITY)
    }

    /// Create a progress channel with an explicit bound
    pub fn channel_with_capacity(capacity: usize) -> (Self, ProgressReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, ProgressReceiver { rx })
    }

    /// Report a percentage, dropping the update rather than blocking
    pub(crate) fn report(&self, percent: u8) {
        let _ = self.tx.try_send(percent);
    }
}

/// Consumer end of a progress channel
#[derive(Debug)]
pub struct ProgressReceiver {
    rx: mpsc::Receiver<u8>,
}

impl ProgressReceiver {
    /// Receive the next percentage; `None` once the transfer has finished
    /// and all updates were drained
    pub async fn recv(&mut self) -> Option<u8> {
        self.rx.recv().await
    }

    /// Drain whatever updates have been delivered so far
    pub fn drain(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        while let Ok(p) = self.rx.try_recv() {
            out.push(p);
        }
        out
    }
}

/// Tracks cumulative bytes against a known total and emits percentages
///
/// Intermediate updates are capped at 99; the final 100 is emitted exactly
/// once via [`ProgressMeter::complete`], only after the transfer has been
/// confirmed successful. Each percentage is emitted at most once, so the
/// delivered sequence is strictly increasing.
#[derive(Debug)]
pub(crate) struct ProgressMeter {
    sink: Option<TransferProgress>,
    total: Option<u64>,
    transferred: u64,
    last_percent: Option<u8>,
}

impl ProgressMeter {
    /// A meter for a transfer of `total` declared bytes; with an unknown
    /// total (`None`) or no sink, per-chunk reporting is skipped
    ///
    /// A declared total of zero is a legitimate empty transfer: no
    /// intermediate percentages, only the final 100 on completion.
    pub(crate) fn new(sink: Option<TransferProgress>, total: Option<u64>) -> Self {
        Self {
            sink,
            total,
            transferred: 0,
            last_percent: None,
        }
    }

    /// Record bytes moved and emit the new percentage if it advanced
    pub(crate) fn record(&mut self, bytes: u64) {
        self.transferred += bytes;
        let Some(total) = self.total.filter(|&t| t > 0) else {
            return;
        };
        let percent = ((self.transferred.min(total) * 100) / total).min(99) as u8;
        if self.last_percent.map_or(true, |last| percent > last) {
            self.last_percent = Some(percent);
            if let Some(sink) = &self.sink {
                sink.report(percent);
            }
        }
    }

    /// Emit the final 100 after the transfer is confirmed complete
    pub(crate) fn complete(&mut self) {
        if self.last_percent == Some(100) {
            return;
        }
        self.last_percent = Some(100);
        if let Some(sink) = &self.sink {
            sink.report(100);
        }
    }
}
