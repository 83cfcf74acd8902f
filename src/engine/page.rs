//! Page buffer and the assembler placing image bytes into it.

/// Value of a flash byte that was never written.
pub const ERASED_BYTE: u8 = 0xFF;

/// Fixed-capacity buffer holding one storage page.
#[derive(Clone)]
pub struct PageBuffer<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> PageBuffer<N> {
    /// Create an erased page buffer
    pub const fn new() -> Self {
        Self {
            bytes: [ERASED_BYTE; N],
        }
    }

    /// Fill the whole buffer with [`ERASED_BYTE`].
    pub fn reset(&mut self) {
        self.bytes.fill(ERASED_BYTE);
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    /// Sum of every byte of the page, erased bytes included.
    pub fn checksum(&self) -> u32 {
        self.bytes.iter().map(|&b| u32::from(b)).sum()
    }
}

impl<const N: usize> Default for PageBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Where incoming bytes land in the page buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLayout {
    /// Metadata phase: bytes are appended from offset 0, at most `limit` of them.
    Sequential { limit: usize },
    /// Image phase: byte `cursor` lands at `(reserved + cursor) % N`, and page
    /// `index` is full once `reserved + cursor` reaches `(index + 1) * N`.
    Image { reserved: usize, index: u16 },
}

/// Result of offering a byte to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Written,
    /// The page has no room left; the byte was not written.
    PageFull,
}

/// Consumer of framed payload bytes.
pub trait ByteSink {
    fn push(&mut self, byte: u8) -> Placement;
    fn is_full(&self) -> bool;
}

/// Cursor and counters advanced by the assembler.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamPosition {
    /// Offset of the next byte in the logical stream.
    pub cursor: u32,
    /// Bytes written during the current request.
    pub received: u32,
}

/// Writes payload bytes into a page buffer at cursor-derived offsets.
pub struct PageAssembler<'a, const N: usize> {
    buffer: &'a mut PageBuffer<N>,
    position: &'a mut StreamPosition,
    layout: PageLayout,
}

impl<'a, const N: usize> PageAssembler<'a, N> {
    pub fn new(
        buffer: &'a mut PageBuffer<N>,
        position: &'a mut StreamPosition,
        layout: PageLayout,
    ) -> Self {
        Self {
            buffer,
            position,
            layout,
        }
    }

    /// Bytes of the page that are occupied, reserved region included.
    pub fn fill(&self) -> usize {
        fill_level::<N>(self.layout, self.position.cursor)
    }

    /// Room left in the page.
    pub fn remaining(&self) -> usize {
        capacity::<N>(self.layout).saturating_sub(self.fill())
    }

    /// Buffer offset of the next byte.
    pub fn offset(&self) -> usize {
        let cursor = self.position.cursor as usize;
        match self.layout {
            PageLayout::Sequential { .. } => cursor,
            PageLayout::Image { reserved, .. } => (reserved + cursor) % N,
        }
    }
}

impl<const N: usize> ByteSink for PageAssembler<'_, N> {
    fn push(&mut self, byte: u8) -> Placement {
        if self.remaining() == 0 {
            return Placement::PageFull;
        }
        let offset = self.offset();
        self.buffer.bytes[offset] = byte;
        self.position.cursor += 1;
        self.position.received += 1;
        Placement::Written
    }

    fn is_full(&self) -> bool {
        self.remaining() == 0
    }
}

/// Room left in the page described by `layout` when the stream is at `cursor`.
pub fn room_left<const N: usize>(layout: PageLayout, cursor: u32) -> usize {
    capacity::<N>(layout).saturating_sub(fill_level::<N>(layout, cursor))
}

fn capacity<const N: usize>(layout: PageLayout) -> usize {
    match layout {
        PageLayout::Sequential { limit } => limit.min(N),
        PageLayout::Image { .. } => N,
    }
}

fn fill_level<const N: usize>(layout: PageLayout, cursor: u32) -> usize {
    let cursor = cursor as usize;
    match layout {
        PageLayout::Sequential { .. } => cursor,
        PageLayout::Image { reserved, index } => {
            (reserved + cursor).saturating_sub(usize::from(index) * N)
        }
    }
}
