//! Page storage backed by a NOR flash driver.

use embedded_storage::nor_flash::NorFlash;

use crate::domain::ports::{PageStorage, StorageError};

/// Writes pages to a NOR flash, erasing each page before it is written.
pub struct NorFlashPageStorage<F> {
    flash: F,
}

impl<F: NorFlash> NorFlashPageStorage<F> {
    pub fn new(flash: F) -> Self {
        Self { flash }
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn into_inner(self) -> F {
        self.flash
    }
}

impl<F: NorFlash, const N: usize> PageStorage<N> for NorFlashPageStorage<F> {
    #[allow(clippy::cast_possible_truncation)]
    async fn write_page(&mut self, address: u32, page: &[u8; N]) -> Result<(), StorageError> {
        let end = address
            .checked_add(N as u32)
            .filter(|&end| end as usize <= self.flash.capacity())
            .ok_or(StorageError::OutOfBounds)?;

        self.flash
            .erase(address, end)
            .map_err(|_| StorageError::Erase)?;
        self.flash
            .write(address, page)
            .map_err(|_| StorageError::Write)
    }
}
