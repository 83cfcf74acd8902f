/// Error type for the page storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    Erase,
    Write,
    OutOfBounds,
}

/// Non-volatile storage receiving committed pages.
#[allow(async_fn_in_trait)]
pub trait PageStorage<const PAGE_SIZE: usize> {
    /// Write a full page at `address`.
    async fn write_page(&mut self, address: u32, page: &[u8; PAGE_SIZE]) -> Result<(), StorageError>;
}

impl<const PAGE_SIZE: usize, T: PageStorage<PAGE_SIZE>> PageStorage<PAGE_SIZE> for &mut T {
    async fn write_page(&mut self, address: u32, page: &[u8; PAGE_SIZE]) -> Result<(), StorageError> {
        (**self).write_page(address, page).await
    }
}
