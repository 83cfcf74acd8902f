use crate::config::PAGE_SIZE;
use crate::domain::entity::{FirmwareMetadata, TransferPhase};
use crate::engine::page::{self, PageBuffer, PageLayout, StreamPosition};

/// State of one firmware transfer, owned by the download agent.
pub struct TransferSession<const N: usize = PAGE_SIZE> {
    pub(crate) phase: TransferPhase,
    pub(crate) page: u16,
    pub(crate) pages_committed: u16,
    pub(crate) position: StreamPosition,
    pub(crate) metadata: Option<FirmwareMetadata>,
    pub(crate) checksum: u32,
    pub(crate) buffer: PageBuffer<N>,
}

impl<const N: usize> TransferSession<N> {
    pub const fn new() -> Self {
        Self {
            phase: TransferPhase::FetchingMetadata,
            page: 0,
            pages_committed: 0,
            position: StreamPosition {
                cursor: 0,
                received: 0,
            },
            metadata: None,
            checksum: 0,
            buffer: PageBuffer::new(),
        }
    }

    pub fn phase(&self) -> TransferPhase {
        self.phase
    }

    /// Offset of the next byte of the current phase.
    pub fn cursor(&self) -> u32 {
        self.position.cursor
    }

    /// Bytes received by the last request.
    pub fn bytes_received(&self) -> u32 {
        self.position.received
    }

    /// Index of the page being downloaded.
    pub fn page_index(&self) -> u16 {
        self.page
    }

    pub fn pages_committed(&self) -> u16 {
        self.pages_committed
    }

    pub fn metadata(&self) -> Option<&FirmwareMetadata> {
        self.metadata.as_ref()
    }

    /// Image length announced by the metadata, zero until it is known.
    pub fn image_length(&self) -> u32 {
        self.metadata.map_or(0, |m| m.image_size())
    }

    /// Checksum of the last committed page.
    pub fn last_checksum(&self) -> u32 {
        self.checksum
    }

    pub fn buffer(&self) -> &PageBuffer<N> {
        &self.buffer
    }

    /// Restart the metadata phase from an erased buffer.
    pub(crate) fn restart_metadata(&mut self) {
        self.phase = TransferPhase::FetchingMetadata;
        self.buffer.reset();
        self.position = StreamPosition::default();
    }

    /// Switch to the image phase. The buffer keeps the metadata bytes.
    pub(crate) fn enter_pages(&mut self, metadata: FirmwareMetadata) {
        self.phase = TransferPhase::FetchingPage;
        self.metadata = Some(metadata);
        self.position = StreamPosition::default();
        self.page = 0;
    }

    /// Prepare page `index`; every page but the first starts erased.
    pub(crate) fn begin_page(&mut self, index: u16) {
        self.page = index;
        if index > 0 {
            self.buffer.reset();
        }
    }

    pub(crate) fn image_layout(&self, reserved: usize) -> PageLayout {
        PageLayout::Image {
            reserved,
            index: self.page,
        }
    }

    /// Room left in the current page.
    pub(crate) fn page_room(&self, reserved: usize) -> usize {
        page::room_left::<N>(self.image_layout(reserved), self.position.cursor)
    }

    /// Image bytes not received yet.
    pub(crate) fn image_remaining(&self) -> u32 {
        self.image_length().saturating_sub(self.position.cursor)
    }

    pub(crate) fn finish(&mut self, phase: TransferPhase) {
        self.phase = phase;
    }
}

impl<const N: usize> Default for TransferSession<N> {
    fn default() -> Self {
        Self::new()
    }
}
