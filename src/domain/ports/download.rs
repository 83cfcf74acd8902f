use super::{StorageError, TransportFailure};
use crate::domain::entity::TransferReport;

/// Response stream that could not be framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingAnomaly {
    /// The response closed before the payload start marker was seen.
    MissingPayloadStart,
    /// The payload carried no bytes and the image is not complete.
    EmptyResponse,
}

/// Metadata response that cannot drive a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataError {
    /// Fewer bytes than the metadata record were received.
    Truncated,
    /// The announced image length is zero.
    EmptyImage,
    /// The announced image does not fit in the page budget.
    TooLarge,
}

/// Error type for the firmware download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferError {
    Transport(TransportFailure),
    Framing(FramingAnomaly),
    Metadata(MetadataError),
    Storage(StorageError),
    /// The request URL does not fit the URL buffer.
    UrlTooLong,
    /// Page size, metadata space and markers are inconsistent.
    InvalidConfig,
    /// The transfer gate was closed while downloading.
    Cancelled,
}

impl TransferError {
    /// Whether a new attempt at the same request may succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, TransferError::Transport(_) | TransferError::Framing(_))
    }

    /// Failure class, as printed in diagnostics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransferError::Transport(failure) => failure.as_str(),
            TransferError::Framing(FramingAnomaly::MissingPayloadStart) => "payload start not found",
            TransferError::Framing(FramingAnomaly::EmptyResponse) => "empty response",
            TransferError::Metadata(MetadataError::Truncated) => "metadata truncated",
            TransferError::Metadata(MetadataError::EmptyImage) => "image is empty",
            TransferError::Metadata(MetadataError::TooLarge) => "image exceeds page budget",
            TransferError::Storage(_) => "storage write failed",
            TransferError::UrlTooLong => "url too long",
            TransferError::InvalidConfig => "invalid configuration",
            TransferError::Cancelled => "cancelled",
        }
    }
}

impl From<TransportFailure> for TransferError {
    fn from(failure: TransportFailure) -> Self {
        TransferError::Transport(failure)
    }
}

impl From<FramingAnomaly> for TransferError {
    fn from(anomaly: FramingAnomaly) -> Self {
        TransferError::Framing(anomaly)
    }
}

impl From<MetadataError> for TransferError {
    fn from(error: MetadataError) -> Self {
        TransferError::Metadata(error)
    }
}

impl From<StorageError> for TransferError {
    fn from(error: StorageError) -> Self {
        TransferError::Storage(error)
    }
}

/// Port of anything able to download a firmware image into storage.
#[allow(async_fn_in_trait)]
pub trait FirmwareDownloader {
    /// Run one complete transfer.
    async fn download_firmware(&mut self) -> Result<TransferReport, TransferError>;
}
