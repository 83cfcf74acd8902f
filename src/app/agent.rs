//! Transfer state machine.
//!
//! The agent fetches the metadata record first, then the image page by page.
//! Every request is awaited until its single terminal event before the next
//! one is issued, and every completed page is committed to storage before the
//! next page starts.

use core::fmt::Write as _;

use embassy_futures::select::{Either, select};
use embassy_sync::{blocking_mutex::raw::NoopRawMutex, signal::Signal};
use embedded_hal_async::delay::DelayNs;
use heapless::String;
use log::{debug, info, warn};

use super::{TransferGate, TransferSession};
use crate::config::{OtaConfig, PAGE_SIZE};
use crate::domain::entity::{
    FirmwareMetadata,
    METADATA_LEN,
    TransferEnd,
    TransferPhase,
    TransferReport,
};
use crate::domain::ports::{
    FirmwareDownloader,
    GetRequest,
    HttpEvent,
    HttpTransport,
    PageStorage,
    TransferError,
    TransferObserver,
    TransportFailure,
};
use crate::engine::{Framer, PageAssembler, PageLayout, RequestOutcome, metadata};

/// Longest request URL.
pub const MAX_URL_LEN: usize = 120;

pub type Url = String<MAX_URL_LEN>;

/// How the download of one page ended.
enum PageEnd {
    Full,
    Image(TransferEnd),
}

/// Firmware download agent.
///
/// Generic over the transport, the page storage, the delay used between
/// retries and an optional progress observer. `N` is the storage page size.
pub struct DownloadAgent<'g, T, S, D, O = (), const N: usize = PAGE_SIZE> {
    config: OtaConfig,
    transport: T,
    storage: S,
    delay: D,
    observer: O,
    gate: &'g TransferGate,
    session: TransferSession<N>,
}

impl<'g, T, S, D, const N: usize> DownloadAgent<'g, T, S, D, (), N>
where
    T: HttpTransport,
    S: PageStorage<N>,
    D: DelayNs,
{
    pub fn new(
        config: OtaConfig,
        transport: T,
        storage: S,
        delay: D,
        gate: &'g TransferGate,
    ) -> Self {
        Self {
            config,
            transport,
            storage,
            delay,
            observer: (),
            gate,
            session: TransferSession::new(),
        }
    }
}

impl<'g, T, S, D, O, const N: usize> DownloadAgent<'g, T, S, D, O, N>
where
    T: HttpTransport,
    S: PageStorage<N>,
    D: DelayNs,
    O: TransferObserver,
{
    /// Attach a progress observer.
    pub fn with_observer<P: TransferObserver>(self, observer: P) -> DownloadAgent<'g, T, S, D, P, N> {
        DownloadAgent {
            config: self.config,
            transport: self.transport,
            storage: self.storage,
            delay: self.delay,
            observer,
            gate: self.gate,
            session: self.session,
        }
    }

    /// State of the current (or last) transfer.
    pub fn session(&self) -> &TransferSession<N> {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Download the whole image into storage.
    ///
    /// Opens the transfer gate for the duration of the transfer and closes it
    /// when the transfer ends, successfully or not.
    pub async fn run(&mut self) -> Result<TransferReport, TransferError> {
        self.session = TransferSession::new();
        self.gate.open();

        let result = self.transfer().await;
        match &result {
            Ok(report) => {
                self.session.finish(TransferPhase::Done);
                info!(
                    "ota: done downloading, {} pages, {} bytes ({:?})",
                    report.pages_committed, report.bytes_received, report.end
                );
                self.observer.on_transfer_complete(report);
            }
            Err(error) => {
                self.session.finish(TransferPhase::Failed);
                warn!("ota: transfer failed: {}", error.as_str());
                self.observer.on_transfer_abort(*error);
            }
        }

        self.gate.close();
        result
    }

    async fn transfer(&mut self) -> Result<TransferReport, TransferError> {
        self.check_config()?;

        let metadata = self.fetch_metadata().await?;
        self.observer.on_transfer_start(&metadata);
        self.session.enter_pages(metadata);

        let budget = self.config.page_count;
        for page in 0..budget {
            self.session.begin_page(page);
            info!("ota: downloading page {}/{}", page, budget);
            self.observer.on_page_start(page, budget);

            let end = self.fetch_page().await?;
            self.commit_page().await?;

            if let PageEnd::Image(end) = end {
                return Ok(self.report(metadata, end));
            }
        }

        Ok(self.report(metadata, TransferEnd::PageBudget))
    }

    async fn fetch_metadata(&mut self) -> Result<FirmwareMetadata, TransferError> {
        let url = metadata_url(&self.config)?;
        let layout = PageLayout::Sequential {
            limit: self.config.metadata_space,
        };

        let mut attempt = 0;
        loop {
            self.session.restart_metadata();
            info!("ota: requesting metadata from {}", url.as_str());

            let framer = Framer::for_metadata(self.config.framing);
            match self.issue(&url, framer, layout).await? {
                RequestOutcome::Failed(error) => self.retry_or_fail(error, &mut attempt).await?,
                _ => break,
            }
        }

        let received = self.session.position.cursor as usize;
        debug!("ota: metadata response, {} bytes received", received);
        let metadata =
            metadata::extract(self.session.buffer.as_bytes(), received, self.image_capacity())?;
        info!(
            "ota: metadata: size={} version={} uuid={:#x} crc={:#x}",
            metadata.image_size(),
            metadata.version(),
            metadata.uuid(),
            metadata.crc()
        );
        Ok(metadata)
    }

    /// Request ranges of the current page until it is full or the image ends.
    async fn fetch_page(&mut self) -> Result<PageEnd, TransferError> {
        let reserved = self.config.metadata_space;

        let mut attempt = 0;
        loop {
            let remaining = self.session.image_remaining();
            if remaining == 0 {
                return Ok(PageEnd::Image(TransferEnd::ImageLength));
            }
            let room = self.session.page_room(reserved);
            if room == 0 {
                return Ok(PageEnd::Full);
            }

            let length = self
                .config
                .request_length
                .min(remaining)
                .min(u32::try_from(room).unwrap_or(u32::MAX));
            let url = range_url(self.config.base_url, self.session.position.cursor, length)?;
            debug!("ota: GET {}", url.as_str());

            let layout = self.session.image_layout(reserved);
            let framer = Framer::for_image(self.config.framing);
            match self.issue(&url, framer, layout).await? {
                RequestOutcome::ImageComplete => {
                    debug!("ota: end of image at byte {}", self.session.position.cursor);
                    return Ok(PageEnd::Image(TransferEnd::Sentinel));
                }
                RequestOutcome::Success | RequestOutcome::PageComplete => {
                    debug!("ota: {} bytes received", self.session.position.received);
                    attempt = 0;
                }
                RequestOutcome::Failed(error) => self.retry_or_fail(error, &mut attempt).await?,
            }
        }
    }

    /// Issue one request and wait for its terminal event.
    async fn issue(
        &mut self,
        url: &str,
        mut framer: Framer,
        layout: PageLayout,
    ) -> Result<RequestOutcome, TransferError> {
        let gate = self.gate;
        let signal = Signal::<NoopRawMutex, RequestOutcome>::new();
        let request = GetRequest::new(url);

        let TransferSession {
            buffer, position, ..
        } = &mut self.session;
        position.received = 0;

        let on_event = |event: HttpEvent<'_>| {
            if !gate.is_open() {
                return;
            }
            let mut assembler = PageAssembler::new(&mut *buffer, &mut *position, layout);
            if let Some(outcome) = framer.on_event(event, &mut assembler) {
                signal.signal(outcome);
            }
        };

        let outcome = match select(self.transport.get(&request, on_event), signal.wait()).await {
            Either::First(()) => signal.try_take(),
            Either::Second(outcome) => Some(outcome),
        };

        if !gate.is_open() {
            return Err(TransferError::Cancelled);
        }
        // A transport that returns without a terminal event dropped the request.
        Ok(outcome.unwrap_or(RequestOutcome::Failed(TransportFailure::Aborted.into())))
    }

    async fn retry_or_fail(
        &mut self,
        error: TransferError,
        attempt: &mut u8,
    ) -> Result<(), TransferError> {
        let policy = self.config.retry;
        if !error.is_retryable() || *attempt >= policy.max_retries {
            return Err(error);
        }

        *attempt += 1;
        let backoff = policy.backoff_ms(*attempt);
        warn!(
            "ota: request failed ({}), retry {}/{} in {} ms",
            error.as_str(),
            attempt,
            policy.max_retries,
            backoff
        );
        self.delay.delay_ms(backoff).await;
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    async fn commit_page(&mut self) -> Result<(), TransferError> {
        let page = self.session.page;
        let address = (self.config.storage_base_page + u32::from(page)) * N as u32;
        let checksum = self.session.buffer.checksum();

        self.storage
            .write_page(address, self.session.buffer.as_bytes())
            .await?;
        self.session.pages_committed += 1;
        self.session.checksum = checksum;

        info!(
            "ota: page {} stored at {:#x}, {} bytes received, sum {}",
            page, address, self.session.position.cursor, checksum
        );
        self.observer.on_page_committed(page, address, checksum);
        Ok(())
    }

    fn check_config(&self) -> Result<(), TransferError> {
        let config = &self.config;
        let valid = config.metadata_space >= METADATA_LEN
            && config.metadata_space < N
            && config.request_length > 0
            && config.page_count > 0
            && config.framing.is_valid();
        if valid {
            Ok(())
        } else {
            Err(TransferError::InvalidConfig)
        }
    }

    /// Image bytes the page budget can hold.
    fn image_capacity(&self) -> u64 {
        (u64::from(self.config.page_count) * N as u64)
            .saturating_sub(self.config.metadata_space as u64)
    }

    fn report(&self, metadata: FirmwareMetadata, end: TransferEnd) -> TransferReport {
        TransferReport {
            metadata,
            pages_committed: self.session.pages_committed,
            bytes_received: self.session.position.cursor,
            end,
        }
    }
}

impl<T, S, D, O, const N: usize> FirmwareDownloader for DownloadAgent<'_, T, S, D, O, N>
where
    T: HttpTransport,
    S: PageStorage<N>,
    D: DelayNs,
    O: TransferObserver,
{
    async fn download_firmware(&mut self) -> Result<TransferReport, TransferError> {
        self.run().await
    }
}

fn metadata_url(config: &OtaConfig) -> Result<Url, TransferError> {
    let mut url = Url::new();
    write!(url, "{}{}", config.base_url, config.metadata_path)
        .map_err(|_| TransferError::UrlTooLong)?;
    Ok(url)
}

/// URL of the image range `[offset, offset + length)`.
fn range_url(base_url: &str, offset: u32, length: u32) -> Result<Url, TransferError> {
    let mut url = Url::new();
    write!(url, "{}/{}/{}", base_url, offset, length).map_err(|_| TransferError::UrlTooLong)?;
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OTA;

    #[test]
    fn range_url_encodes_offset_and_length() {
        let url = range_url("http://[bbbb::1]:3003", 3840, 1024).unwrap();
        assert_eq!(url.as_str(), "http://[bbbb::1]:3003/3840/1024");
    }

    #[test]
    fn metadata_url_appends_path() {
        let url = metadata_url(&OTA).unwrap();
        assert_eq!(url.as_str(), "http://[bbbb::1]:3003/metadata");
    }

    #[test]
    fn overlong_url_is_rejected() {
        let base = "http://example.com/firmware/images/very/long/path/that/keeps/going/and/going/and/going/forever/and/ever";
        assert_eq!(range_url(base, u32::MAX, u32::MAX), Err(TransferError::UrlTooLong));
    }
}
