#![allow(dead_code)]

use embedded_hal_async::delay::DelayNs;
use myrtio_ota_download::config::OtaConfig;
use myrtio_ota_download::domain::ports::{GetRequest, HttpEvent, HttpTransport, PageStorage};
use myrtio_ota_download::{FirmwareMetadata, StorageError};

pub const PAGE: usize = 64;
pub const RESERVED: usize = 16;
pub const BASE_PAGE: u32 = 0x32;

const RESPONSE_HEAD: &[u8] = b"HTTP/1.0 200 OK\r\nContent-Type: application/octet-stream\r\n\r\n";
const RESPONSE_TAIL: &[u8] = b"\r\n.\r\n";

pub fn config() -> OtaConfig {
    OtaConfig::new("http://[bbbb::1]:3003")
        .with_request_length(24)
        .with_page_count(4)
        .with_metadata_space(RESERVED)
}

/// Image bytes that never form a framing marker.
pub fn image(len: usize) -> Vec<u8> {
    (0..len).map(|i| b'a' + (i % 26) as u8).collect()
}

pub fn metadata_for(len: usize) -> FirmwareMetadata {
    FirmwareMetadata::new(len as u32, 3, 0x1234_5678, 0xBEEF)
}

/// Failure injected into a request.
#[derive(Clone, Copy)]
pub struct Fault {
    /// Index of the request, 0 being the metadata request.
    pub request: usize,
    /// Chunks delivered before the failure.
    pub after_chunks: usize,
    pub event: HttpEvent<'static>,
}

/// Image server answering `/metadata` and `/{offset}/{length}` requests.
pub struct ImageServer {
    pub metadata: Vec<u8>,
    pub image: Vec<u8>,
    /// Append the end-of-image sentinel to the range holding the last byte.
    pub sentinel: bool,
    pub chunk_size: usize,
    /// Bytes sent after the payload end marker of every response.
    pub trailer: Vec<u8>,
    pub faults: Vec<Fault>,
    pub urls: Vec<String>,
}

impl ImageServer {
    pub fn new(image: Vec<u8>) -> Self {
        Self {
            metadata: metadata_for(image.len()).to_bytes().to_vec(),
            image,
            sentinel: false,
            chunk_size: 32,
            trailer: Vec::new(),
            faults: Vec::new(),
            urls: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: FirmwareMetadata) -> Self {
        self.metadata = metadata.to_bytes().to_vec();
        self
    }

    pub fn with_sentinel(mut self) -> Self {
        self.sentinel = true;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_trailer(mut self, trailer: &[u8]) -> Self {
        self.trailer = trailer.to_vec();
        self
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.faults.push(fault);
        self
    }

    /// `(offset, length)` of every range request, in order.
    pub fn ranges(&self) -> Vec<(u32, u32)> {
        self.urls
            .iter()
            .filter_map(|url| {
                let path = url.strip_prefix("http://[bbbb::1]:3003/")?;
                let (offset, length) = path.split_once('/')?;
                Some((offset.parse().ok()?, length.parse().ok()?))
            })
            .collect()
    }

    /// Raw response to `url`.
    pub fn respond(&self, url: &str) -> Vec<u8> {
        let mut response = RESPONSE_HEAD.to_vec();
        let path = url.strip_prefix("http://[bbbb::1]:3003").unwrap_or(url);

        if path == "/metadata" {
            response.extend_from_slice(&self.metadata);
        } else {
            let mut parts = path.trim_start_matches('/').split('/');
            let offset: usize = parts.next().unwrap().parse().unwrap();
            let length: usize = parts.next().unwrap().parse().unwrap();
            let end = (offset + length).min(self.image.len());
            if offset < end {
                response.extend_from_slice(&self.image[offset..end]);
            }
            if self.sentinel && offset + length >= self.image.len() {
                response.extend_from_slice(b"EOF");
            }
        }

        response.extend_from_slice(RESPONSE_TAIL);
        response.extend_from_slice(&self.trailer);
        response
    }
}

impl HttpTransport for ImageServer {
    async fn get(&mut self, request: &GetRequest<'_>, mut on_event: impl FnMut(HttpEvent<'_>)) {
        let index = self.urls.len();
        self.urls.push(request.url.to_string());

        let response = self.respond(request.url);
        let fault = self.faults.iter().find(|fault| fault.request == index).copied();

        for (n, chunk) in response.chunks(self.chunk_size).enumerate() {
            if let Some(fault) = fault.filter(|fault| fault.after_chunks == n) {
                on_event(fault.event);
                return;
            }
            on_event(HttpEvent::Data(chunk));
        }
        on_event(HttpEvent::Closed);
    }
}

/// Page storage keeping every written page in memory.
#[derive(Default)]
pub struct RamStorage<const N: usize> {
    pub writes: Vec<(u32, Vec<u8>)>,
    pub fail_at: Option<usize>,
}

impl<const N: usize> RamStorage<N> {
    pub fn new() -> Self {
        Self {
            writes: Vec::new(),
            fail_at: None,
        }
    }

    pub fn addresses(&self) -> Vec<u32> {
        self.writes.iter().map(|(address, _)| *address).collect()
    }
}

impl<const N: usize> PageStorage<N> for RamStorage<N> {
    async fn write_page(&mut self, address: u32, page: &[u8; N]) -> Result<(), StorageError> {
        if self.fail_at == Some(self.writes.len()) {
            return Err(StorageError::Write);
        }
        self.writes.push((address, page.to_vec()));
        Ok(())
    }
}

/// Delay that returns immediately and records what was asked.
#[derive(Default)]
pub struct NoDelay {
    pub delays_ms: Vec<u32>,
}

impl DelayNs for NoDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.delays_ms.push(ns / 1_000_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.delays_ms.push(ms);
    }
}
