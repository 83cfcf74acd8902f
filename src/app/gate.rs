use core::sync::atomic::{AtomicBool, Ordering};

/// Flag marking a transfer as in progress.
///
/// Response callbacks of a transfer whose gate is closed are ignored, which
/// makes closing the gate the way to cancel a download. Usable as a `static`.
pub struct TransferGate {
    downloading: AtomicBool,
}

impl TransferGate {
    pub const fn new() -> Self {
        Self {
            downloading: AtomicBool::new(false),
        }
    }

    pub fn open(&self) {
        self.downloading.store(true, Ordering::Relaxed);
    }

    /// Cancel the transfer in progress, if any.
    pub fn close(&self) {
        self.downloading.store(false, Ordering::Relaxed);
    }

    pub fn is_open(&self) -> bool {
        self.downloading.load(Ordering::Relaxed)
    }
}

impl Default for TransferGate {
    fn default() -> Self {
        Self::new()
    }
}
