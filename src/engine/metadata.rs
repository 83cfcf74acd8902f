use crate::domain::entity::{FirmwareMetadata, METADATA_LEN};
use crate::domain::ports::MetadataError;

/// Parse the metadata record from the first `received` bytes of the page buffer.
///
/// `image_capacity` is the number of image bytes the page budget can hold.
pub fn extract(
    buffer: &[u8],
    received: usize,
    image_capacity: u64,
) -> Result<FirmwareMetadata, MetadataError> {
    if received < METADATA_LEN {
        return Err(MetadataError::Truncated);
    }
    let metadata = buffer
        .get(..received)
        .and_then(FirmwareMetadata::from_bytes)
        .ok_or(MetadataError::Truncated)?;

    match u64::from(metadata.image_size()) {
        0 => Err(MetadataError::EmptyImage),
        size if size > image_capacity => Err(MetadataError::TooLarge),
        _ => Ok(metadata),
    }
}
