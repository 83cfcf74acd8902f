use super::TransferError;
use crate::domain::entity::{FirmwareMetadata, TransferReport};

/// Progress hooks invoked by the download agent.
///
/// Every hook defaults to a no-op.
pub trait TransferObserver {
    fn on_transfer_start(&mut self, _metadata: &FirmwareMetadata) {}

    fn on_page_start(&mut self, _page: u16, _budget: u16) {}

    fn on_page_committed(&mut self, _page: u16, _address: u32, _checksum: u32) {}

    fn on_transfer_complete(&mut self, _report: &TransferReport) {}

    fn on_transfer_abort(&mut self, _error: TransferError) {}
}

impl TransferObserver for () {}

impl<T: TransferObserver> TransferObserver for &mut T {
    fn on_transfer_start(&mut self, metadata: &FirmwareMetadata) {
        (**self).on_transfer_start(metadata);
    }

    fn on_page_start(&mut self, page: u16, budget: u16) {
        (**self).on_page_start(page, budget);
    }

    fn on_page_committed(&mut self, page: u16, address: u32, checksum: u32) {
        (**self).on_page_committed(page, address, checksum);
    }

    fn on_transfer_complete(&mut self, report: &TransferReport) {
        (**self).on_transfer_complete(report);
    }

    fn on_transfer_abort(&mut self, error: TransferError) {
        (**self).on_transfer_abort(error);
    }
}
