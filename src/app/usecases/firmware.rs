use crate::domain::entity::TransferReport;
use crate::domain::ports::{FirmwareDownloader, TransferError};

/// Firmware update usecases on top of a downloader.
pub struct FirmwareUsecases<P: FirmwareDownloader> {
    downloader: P,
    last_report: Option<TransferReport>,
}

impl<P: FirmwareDownloader> FirmwareUsecases<P> {
    pub fn new(downloader: P) -> Self {
        Self {
            downloader,
            last_report: None,
        }
    }

    /// Download a new image, returning whether it is ready for activation.
    pub async fn fetch_update(&mut self) -> bool {
        self.download_firmware().await.is_ok()
    }

    /// Report of the last successful download.
    pub fn last_report(&self) -> Option<&TransferReport> {
        self.last_report.as_ref()
    }

    pub fn downloader(&self) -> &P {
        &self.downloader
    }
}

impl<P: FirmwareDownloader> FirmwareDownloader for FirmwareUsecases<P> {
    async fn download_firmware(&mut self) -> Result<TransferReport, TransferError> {
        let result = self.downloader.download_firmware().await;
        self.last_report = result.as_ref().ok().copied();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{FirmwareMetadata, TransferEnd};
    use crate::domain::ports::TransportFailure;

    struct FixedDownloader(Result<TransferReport, TransferError>);

    impl FirmwareDownloader for FixedDownloader {
        async fn download_firmware(&mut self) -> Result<TransferReport, TransferError> {
            self.0
        }
    }

    #[test]
    fn successful_download_is_ready() {
        let report = TransferReport {
            metadata: FirmwareMetadata::new(10, 1, 1, 0),
            pages_committed: 1,
            bytes_received: 10,
            end: TransferEnd::ImageLength,
        };
        let mut usecases = FirmwareUsecases::new(FixedDownloader(Ok(report)));

        assert!(embassy_futures::block_on(usecases.fetch_update()));
        assert_eq!(usecases.last_report(), Some(&report));
    }

    #[test]
    fn failed_download_is_not_ready() {
        let error = TransferError::Transport(TransportFailure::Error);
        let mut usecases = FirmwareUsecases::new(FixedDownloader(Err(error)));

        assert!(!embassy_futures::block_on(usecases.fetch_update()));
        assert!(usecases.last_report().is_none());
    }

    #[test]
    fn downloader_port_keeps_last_report() {
        let report = TransferReport {
            metadata: FirmwareMetadata::new(10, 1, 1, 0),
            pages_committed: 1,
            bytes_received: 10,
            end: TransferEnd::Sentinel,
        };
        let mut usecases = FirmwareUsecases::new(FixedDownloader(Ok(report)));

        assert_eq!(embassy_futures::block_on(usecases.download_firmware()), Ok(report));
        assert_eq!(usecases.last_report(), Some(&report));

        usecases.downloader.0 = Err(TransferError::Cancelled);
        assert!(embassy_futures::block_on(usecases.download_firmware()).is_err());
        assert!(usecases.last_report().is_none());
    }
}
