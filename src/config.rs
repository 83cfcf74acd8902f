#![allow(clippy::unreadable_literal)]

/// Storage page size of the target flash (erase/write granularity).
pub const PAGE_SIZE: usize = 4096;

/// Longest framing marker the framer can hold while matching.
pub const MAX_MARKER_LEN: usize = 8;

/// Inline markers delimiting the payload of every response.
///
/// Markers are matched in-band: an image containing `payload_end` or
/// `end_of_image` cuts its response, or the whole transfer, short at that
/// point. The default end marker `\r\n.\r\n` differs from the header
/// terminator, so images may contain blank lines.
#[derive(Debug, Clone, Copy)]
pub struct FramingConfig {
    /// Sequence preceding the payload (the header terminator of a raw response).
    pub payload_start: &'static [u8],
    /// Sequence ending the payload of a single response.
    pub payload_end: &'static [u8],
    /// Sequence ending the whole image.
    pub end_of_image: [u8; 3],
}

impl FramingConfig {
    pub const fn new() -> Self {
        Self {
            payload_start: b"\r\n\r\n",
            payload_end: b"\r\n.\r\n",
            end_of_image: *b"EOF",
        }
    }

    /// Set the payload start and end markers.
    #[must_use]
    pub const fn with_markers(
        mut self,
        payload_start: &'static [u8],
        payload_end: &'static [u8],
    ) -> Self {
        self.payload_start = payload_start;
        self.payload_end = payload_end;
        self
    }

    /// Set the end-of-image sentinel.
    #[must_use]
    pub const fn with_end_of_image(mut self, end_of_image: [u8; 3]) -> Self {
        self.end_of_image = end_of_image;
        self
    }

    pub(crate) const fn is_valid(&self) -> bool {
        !self.payload_start.is_empty()
            && !self.payload_end.is_empty()
            && self.payload_start.len() <= MAX_MARKER_LEN
            && self.payload_end.len() <= MAX_MARKER_LEN
    }
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Retry policy for failed requests.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u8,
    pub initial_backoff_ms: u32,
    pub max_backoff_ms: u32,
}

impl RetryPolicy {
    /// Fail on the first transport error.
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    /// Retry up to `max_retries` times, doubling the delay after each attempt.
    pub const fn bounded(max_retries: u8, initial_backoff_ms: u32, max_backoff_ms: u32) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff_ms(&self, attempt: u8) -> u32 {
        let shift = u32::from(attempt.saturating_sub(1)).min(16);
        self.initial_backoff_ms
            .saturating_mul(1 << shift)
            .min(self.max_backoff_ms.max(self.initial_backoff_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Download agent configuration.
#[derive(Debug, Clone, Copy)]
pub struct OtaConfig {
    /// Image server base URL, without trailing slash.
    pub base_url: &'static str,
    /// Path of the metadata resource, appended to `base_url`.
    pub metadata_path: &'static str,
    /// Upper bound of bytes asked for in a single range request.
    pub request_length: u32,
    /// Maximum number of pages a single image may span.
    pub page_count: u16,
    /// First storage page receiving the image.
    pub storage_base_page: u32,
    /// Bytes at the start of page 0 reserved for the metadata record.
    pub metadata_space: usize,
    pub framing: FramingConfig,
    pub retry: RetryPolicy,
}

impl OtaConfig {
    pub const fn new(base_url: &'static str) -> Self {
        Self {
            base_url,
            metadata_path: "/metadata",
            request_length: 1024,
            page_count: 25,
            storage_base_page: 0x32,
            metadata_space: 0x100,
            framing: FramingConfig::new(),
            retry: RetryPolicy::none(),
        }
    }

    #[must_use]
    pub const fn with_metadata_path(mut self, path: &'static str) -> Self {
        self.metadata_path = path;
        self
    }

    #[must_use]
    pub const fn with_request_length(mut self, length: u32) -> Self {
        self.request_length = length;
        self
    }

    #[must_use]
    pub const fn with_page_count(mut self, count: u16) -> Self {
        self.page_count = count;
        self
    }

    #[must_use]
    pub const fn with_storage_base_page(mut self, page: u32) -> Self {
        self.storage_base_page = page;
        self
    }

    #[must_use]
    pub const fn with_metadata_space(mut self, space: usize) -> Self {
        self.metadata_space = space;
        self
    }

    #[must_use]
    pub const fn with_framing(mut self, framing: FramingConfig) -> Self {
        self.framing = framing;
        self
    }

    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

pub const OTA: OtaConfig = OtaConfig::new("http://[bbbb::1]:3003");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_reference_server() {
        assert_eq!(OTA.base_url, "http://[bbbb::1]:3003");
        assert_eq!(OTA.page_count, 25);
        assert_eq!(OTA.storage_base_page, 0x32);
        assert_eq!(OTA.metadata_space, 0x100);
        assert!(OTA.framing.is_valid());
        assert_ne!(OTA.framing.payload_start, OTA.framing.payload_end);
    }

    #[test]
    fn backoff_doubles_up_to_max() {
        let policy = RetryPolicy::bounded(5, 100, 350);
        assert_eq!(policy.backoff_ms(1), 100);
        assert_eq!(policy.backoff_ms(2), 200);
        assert_eq!(policy.backoff_ms(3), 350);
        assert_eq!(policy.backoff_ms(4), 350);
    }

    #[test]
    fn oversized_marker_is_rejected() {
        let framing = FramingConfig::new().with_markers(b"<<<<<<<<<", b"\r\n");
        assert!(!framing.is_valid());
    }
}
