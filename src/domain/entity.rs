use bytemuck::{Pod, Zeroable};

/// Size of the metadata record as transmitted by the image server.
pub const METADATA_LEN: usize = core::mem::size_of::<FirmwareMetadata>();

/// Phase of a firmware transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    FetchingMetadata,
    FetchingPage,
    Done,
    Failed,
}

impl TransferPhase {
    pub const fn is_terminal(self) -> bool {
        matches!(self, TransferPhase::Done | TransferPhase::Failed)
    }
}

/// Firmware metadata record.
///
/// Fields are kept in their little-endian wire representation, so the record
/// can be copied verbatim from a received page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct FirmwareMetadata {
    crc: u16,
    crc_shadow: u16,
    size: u32,
    uuid: u32,
    version: u16,
    reserved: u16,
}

impl FirmwareMetadata {
    /// Create a metadata record
    pub const fn new(size: u32, version: u16, uuid: u32, crc: u16) -> Self {
        Self {
            crc: crc.to_le(),
            crc_shadow: 0,
            size: size.to_le(),
            uuid: uuid.to_le(),
            version: version.to_le(),
            reserved: 0,
        }
    }

    /// Copy a record from the first [`METADATA_LEN`] bytes of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let raw = bytes.get(..METADATA_LEN)?;
        Some(bytemuck::pod_read_unaligned(raw))
    }

    /// Wire representation of the record
    pub fn to_bytes(&self) -> [u8; METADATA_LEN] {
        bytemuck::cast(*self)
    }

    /// Total image length in bytes, metadata excluded.
    pub const fn image_size(&self) -> u32 {
        u32::from_le(self.size)
    }

    pub const fn version(&self) -> u16 {
        u16::from_le(self.version)
    }

    pub const fn uuid(&self) -> u32 {
        u32::from_le(self.uuid)
    }

    pub const fn crc(&self) -> u16 {
        u16::from_le(self.crc)
    }

    pub const fn crc_shadow(&self) -> u16 {
        u16::from_le(self.crc_shadow)
    }
}

/// What ended a successful transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEnd {
    /// The server sent the end-of-image sentinel.
    Sentinel,
    /// The image length announced by the metadata was reached.
    ImageLength,
    /// Every page of the budget was committed.
    PageBudget,
}

/// Summary of a finished transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    pub metadata: FirmwareMetadata,
    pub pages_committed: u16,
    pub bytes_received: u32,
    pub end: TransferEnd,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_is_sixteen_bytes_little_endian() {
        let metadata = FirmwareMetadata::new(0x0001_2345, 3, 0xDEAD_BEEF, 0xABCD);
        let bytes = metadata.to_bytes();

        assert_eq!(METADATA_LEN, 16);
        assert_eq!(&bytes[0..2], &[0xCD, 0xAB]);
        assert_eq!(&bytes[4..8], &[0x45, 0x23, 0x01, 0x00]);
        assert_eq!(&bytes[8..12], &[0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(&bytes[12..14], &[3, 0]);
    }

    #[test]
    fn metadata_reads_from_unaligned_slice() {
        let metadata = FirmwareMetadata::new(9000, 7, 42, 1);
        let mut raw = [0xFFu8; METADATA_LEN + 1];
        raw[1..].copy_from_slice(&metadata.to_bytes());

        let parsed = FirmwareMetadata::from_bytes(&raw[1..]).unwrap();
        assert_eq!(parsed.image_size(), 9000);
        assert_eq!(parsed.version(), 7);
        assert_eq!(parsed.uuid(), 42);
        assert_eq!(parsed.crc(), 1);
    }

    #[test]
    fn short_slice_has_no_metadata() {
        assert!(FirmwareMetadata::from_bytes(&[0u8; METADATA_LEN - 1]).is_none());
    }

    #[test]
    fn only_done_and_failed_are_terminal() {
        assert!(TransferPhase::Done.is_terminal());
        assert!(TransferPhase::Failed.is_terminal());
        assert!(!TransferPhase::FetchingMetadata.is_terminal());
        assert!(!TransferPhase::FetchingPage.is_terminal());
    }
}
