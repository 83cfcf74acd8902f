use core::fmt::Write;

use heapless::Vec;

/// HTTP socket connection policy.
#[derive(Debug, Clone, Copy)]
pub enum ConnectionPolicy {
    Close,
}

impl ConnectionPolicy {
    fn as_str(self) -> &'static str {
        match self {
            ConnectionPolicy::Close => "close",
        }
    }
}

pub trait BufferedWriter {
    fn write_to(&self, writer: &mut impl Write) -> Result<(), core::fmt::Error>;
}

/// Parsed `http://` URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Url<'a> {
    /// Host and optional port, as written in the URL.
    pub authority: &'a str,
    /// Host name or address, without IPv6 brackets.
    pub host: &'a str,
    pub port: u16,
    pub path: &'a str,
}

impl<'a> Url<'a> {
    pub const DEFAULT_PORT: u16 = 80;

    /// Parse a plain `http://` URL.
    ///
    /// IPv6 literals must be bracketed, e.g. `http://[bbbb::1]:3003/metadata`.
    pub fn parse(url: &'a str) -> Option<Self> {
        let rest = url.strip_prefix("http://")?;
        let (authority, path) = match rest.find('/') {
            Some(pos) => (&rest[..pos], &rest[pos..]),
            None => (rest, "/"),
        };

        let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
            let end = bracketed.find(']')?;
            let port = match &bracketed[end + 1..] {
                "" => Self::DEFAULT_PORT,
                port => port.strip_prefix(':')?.parse().ok()?,
            };
            (&bracketed[..end], port)
        } else {
            match authority.rsplit_once(':') {
                Some((host, port)) => (host, port.parse().ok()?),
                None => (authority, Self::DEFAULT_PORT),
            }
        };
        if host.is_empty() {
            return None;
        }

        Some(Self {
            authority,
            host,
            port,
            path,
        })
    }
}

/// Request line and headers of a GET request.
///
/// Requests are sent as HTTP/1.0, so the response body is never chunked and
/// ends when the server closes the connection.
pub struct RequestHeaders<'a> {
    url: &'a Url<'a>,
    connection: ConnectionPolicy,
    extra: &'a [(&'a str, &'a str)],
    content_length: Option<usize>,
}

impl<'a> RequestHeaders<'a> {
    pub const fn get(url: &'a Url<'a>) -> Self {
        Self {
            url,
            connection: ConnectionPolicy::Close,
            extra: &[],
            content_length: None,
        }
    }

    /// Add headers written after the mandatory ones.
    #[must_use]
    pub const fn with_extra(mut self, extra: &'a [(&'a str, &'a str)]) -> Self {
        self.extra = extra;
        self
    }

    #[must_use]
    pub const fn with_content_length(mut self, content_length: usize) -> Self {
        self.content_length = Some(content_length);
        self
    }
}

impl BufferedWriter for RequestHeaders<'_> {
    fn write_to(&self, writer: &mut impl Write) -> Result<(), core::fmt::Error> {
        write!(writer, "GET {} HTTP/1.0\r\n", self.url.path)?;
        write!(writer, "Host: {}\r\n", self.url.authority)?;
        write!(writer, "Connection: {}\r\n", self.connection.as_str())?;
        for (name, value) in self.extra {
            write!(writer, "{}: {}\r\n", name, value)?;
        }
        if let Some(content_length) = self.content_length {
            write!(writer, "Content-Length: {}\r\n", content_length)?;
        }
        write!(writer, "\r\n")?;
        Ok(())
    }
}

/// Parse the status code from the start of a response.
///
/// Returns `None` if the status line is not complete in `head`.
pub fn parse_status_line(head: &[u8]) -> Option<u16> {
    let line_end = head.windows(2).position(|w| w == b"\r\n")?;
    let line = core::str::from_utf8(&head[..line_end]).ok()?;
    let mut parts = line.split_whitespace();
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

/// Response head that must not be forwarded as payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseError {
    /// The status line is missing or unreadable.
    Malformed,
    /// The server answered with a non-2xx status.
    Status(u16),
    /// The body uses chunked transfer coding.
    Chunked,
    /// The head does not fit the head buffer.
    TooLong,
}

/// Length of the response head, header terminator included.
///
/// Returns `None` while the terminator has not been received.
pub fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4)
}

/// Check a complete response head before its body is streamed.
pub fn check_response_head(head: &[u8]) -> Result<u16, ResponseError> {
    let status = parse_status_line(head).ok_or(ResponseError::Malformed)?;
    if !(200..300).contains(&status) {
        return Err(ResponseError::Status(status));
    }
    let header = core::str::from_utf8(head).map_err(|_| ResponseError::Malformed)?;
    if is_chunked(header) {
        return Err(ResponseError::Chunked);
    }
    Ok(status)
}

/// Collects the response head across reads and checks it before any byte
/// reaches the caller.
pub struct HeadReader<const SIZE: usize> {
    buf: Vec<u8, SIZE>,
    complete: bool,
}

impl<const SIZE: usize> HeadReader<SIZE> {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            complete: false,
        }
    }

    /// Whether the head was received and accepted.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Feed received bytes.
    ///
    /// Returns the bytes to forward: nothing while the head is incomplete,
    /// then the whole head with the body bytes read along with it, then
    /// every later chunk unchanged.
    pub fn feed<'a>(&'a mut self, data: &'a [u8]) -> Result<Option<&'a [u8]>, ResponseError> {
        if self.complete {
            return Ok(Some(data));
        }
        self.buf
            .extend_from_slice(data)
            .map_err(|()| ResponseError::TooLong)?;

        let Some(end) = find_head_end(&self.buf) else {
            return Ok(None);
        };
        check_response_head(&self.buf[..end])?;
        self.complete = true;
        Ok(Some(&self.buf))
    }
}

impl<const SIZE: usize> Default for HeadReader<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

fn is_chunked(header: &str) -> bool {
    header.split("\r\n").skip(1).any(|line| {
        line.split_once(':').is_some_and(|(name, value)| {
            name.trim().eq_ignore_ascii_case("transfer-encoding")
                && value
                    .split(',')
                    .any(|coding| coding.trim().eq_ignore_ascii_case("chunked"))
        })
    })
}

#[cfg(test)]
mod tests {
    use heapless::String;

    use super::*;

    #[test]
    fn parses_bracketed_ipv6_url() {
        let url = Url::parse("http://[bbbb::1]:3003/256/1024").unwrap();

        assert_eq!(url.host, "bbbb::1");
        assert_eq!(url.authority, "[bbbb::1]:3003");
        assert_eq!(url.port, 3003);
        assert_eq!(url.path, "/256/1024");
    }

    #[test]
    fn parses_host_without_port_or_path() {
        let url = Url::parse("http://updates.local").unwrap();

        assert_eq!(url.host, "updates.local");
        assert_eq!(url.port, 80);
        assert_eq!(url.path, "/");
    }

    #[test]
    fn rejects_unsupported_urls() {
        assert!(Url::parse("https://updates.local/metadata").is_none());
        assert!(Url::parse("http://[bbbb::1/metadata").is_none());
        assert!(Url::parse("http://host:port/").is_none());
        assert!(Url::parse("http:///metadata").is_none());
    }

    #[test]
    fn writes_get_request() {
        let url = Url::parse("http://[bbbb::1]:3003/metadata").unwrap();
        let headers = RequestHeaders::get(&url).with_extra(&[("Accept", "*/*")]);

        let mut head = String::<256>::new();
        headers.write_to(&mut head).unwrap();

        assert_eq!(
            head.as_str(),
            "GET /metadata HTTP/1.0\r\nHost: [bbbb::1]:3003\r\nConnection: close\r\nAccept: */*\r\n\r\n"
        );
    }

    #[test]
    fn parses_status_code() {
        assert_eq!(parse_status_line(b"HTTP/1.1 200 OK\r\nServer: x\r\n"), Some(200));
        assert_eq!(parse_status_line(b"HTTP/1.0 404 Not Found\r\n"), Some(404));
        assert_eq!(parse_status_line(b"HTTP/1.1 200 O"), None);
        assert_eq!(parse_status_line(b"\r\n\r\nbody\r\n"), None);
    }

    #[test]
    fn head_ends_after_header_terminator() {
        assert_eq!(find_head_end(b"HTTP/1.0 200 OK\r\n\r\nbody"), Some(19));
        assert_eq!(find_head_end(b"HTTP/1.0 200 OK\r\nServer: x\r\n"), None);
    }

    #[test]
    fn accepts_plain_success_head() {
        let head = b"HTTP/1.0 200 OK\r\nContent-Length: 24\r\n\r\n";
        assert_eq!(check_response_head(head), Ok(200));
    }

    #[test]
    fn rejects_error_status() {
        let head = b"HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\n\r\n";
        assert_eq!(check_response_head(head), Err(ResponseError::Status(404)));
    }

    #[test]
    fn rejects_chunked_body() {
        let head = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: gzip, Chunked\r\n\r\n";
        assert_eq!(check_response_head(head), Err(ResponseError::Chunked));
    }

    #[test]
    fn rejects_head_without_status_line() {
        assert_eq!(check_response_head(b"\r\n\r\n"), Err(ResponseError::Malformed));
        assert_eq!(check_response_head(b"garbage 200\r\n\r\n"), Err(ResponseError::Malformed));
    }

    #[test]
    fn status_split_across_reads_is_checked() {
        let mut reader = HeadReader::<64>::new();

        assert_eq!(reader.feed(b"HTTP/1.1 40"), Ok(None));
        assert_eq!(
            reader.feed(b"4 Not Found\r\n\r\nnot an image"),
            Err(ResponseError::Status(404))
        );
        assert!(!reader.is_complete());
    }

    #[test]
    fn head_is_forwarded_once_complete() {
        let mut reader = HeadReader::<64>::new();

        assert_eq!(reader.feed(b"HTTP/1.0 200 OK\r"), Ok(None));
        assert_eq!(
            reader.feed(b"\n\r\nab"),
            Ok(Some(&b"HTTP/1.0 200 OK\r\n\r\nab"[..]))
        );
        assert!(reader.is_complete());
        assert_eq!(reader.feed(b"cd"), Ok(Some(&b"cd"[..])));
    }

    #[test]
    fn oversized_head_is_rejected() {
        let mut reader = HeadReader::<16>::new();
        assert_eq!(reader.feed(b"HTTP/1.0 200 OK\r\nServer: "), Err(ResponseError::TooLong));
    }
}
