//! OTA Controller
//!
//! Reports the progress of a firmware download through the log, and keeps
//! the outcome of the last transfer for the activation layer.

use log::{info, warn};

use crate::domain::entity::{FirmwareMetadata, TransferReport};
use crate::domain::ports::{TransferError, TransferObserver};

/// OTA Controller
///
/// Observes a download agent and prints progress as pages are committed.
#[derive(Debug, Default)]
pub struct OtaController {
    expected_size: u32,
    pages: u16,
    last_checksum: u32,
    outcome: Option<Result<TransferReport, TransferError>>,
}

impl OtaController {
    /// Create a new OTA controller
    pub const fn new() -> Self {
        Self {
            expected_size: 0,
            pages: 0,
            last_checksum: 0,
            outcome: None,
        }
    }

    /// Whether the last transfer finished successfully.
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, Some(Ok(_)))
    }

    /// Outcome of the last transfer, if one finished.
    pub fn outcome(&self) -> Option<&Result<TransferReport, TransferError>> {
        self.outcome.as_ref()
    }

    /// Pages committed during the current (or last) transfer.
    pub fn pages_committed(&self) -> u16 {
        self.pages
    }

    pub fn last_checksum(&self) -> u32 {
        self.last_checksum
    }
}

impl TransferObserver for OtaController {
    fn on_transfer_start(&mut self, metadata: &FirmwareMetadata) {
        self.expected_size = metadata.image_size();
        self.pages = 0;
        self.outcome = None;
        info!(
            "ota: starting update, version={} size={} bytes",
            metadata.version(),
            self.expected_size
        );
    }

    fn on_page_committed(&mut self, page: u16, address: u32, checksum: u32) {
        self.pages = page + 1;
        self.last_checksum = checksum;
        info!("ota: page {} written to {:#x} (sum {})", page, address, checksum);
    }

    fn on_transfer_complete(&mut self, report: &TransferReport) {
        let progress = if self.expected_size == 0 {
            100
        } else {
            u64::from(report.bytes_received) * 100 / u64::from(self.expected_size)
        };
        info!(
            "ota: update downloaded, {} pages, {} bytes ({}%)",
            report.pages_committed, report.bytes_received, progress
        );
        self.outcome = Some(Ok(*report));
    }

    fn on_transfer_abort(&mut self, error: TransferError) {
        warn!("ota: aborting update: {}", error.as_str());
        self.outcome = Some(Err(error));
    }
}
