use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::{ConnectError, TcpSocket};
use embassy_net::{IpAddress, Ipv4Address, Ipv6Address, Stack};
use embassy_time::{Duration, with_timeout};
use embedded_io_async::Write as _;
use heapless::String;
use log::{debug, warn};

use super::headers::{BufferedWriter as _, HeadReader, RequestHeaders, Url};
use crate::domain::ports::{GetRequest, HttpEvent, HttpTransport};

const REQUEST_HEAD_SIZE: usize = 256;
const READ_CHUNK_SIZE: usize = 256;
const RESPONSE_HEAD_SIZE: usize = 512;

/// Resolve a host name or address literal.
pub async fn resolve_host(stack: Stack<'_>, host: &str) -> Result<IpAddress, ()> {
    if let Ok(ip) = host.parse::<Ipv6Address>() {
        return Ok(IpAddress::Ipv6(ip));
    }
    if let Ok(ip) = host.parse::<Ipv4Address>() {
        return Ok(IpAddress::Ipv4(ip));
    }

    for query in [DnsQueryType::Aaaa, DnsQueryType::A] {
        if let Ok(addresses) = stack.dns_query(host, query).await
            && let Some(address) = addresses.first()
        {
            return Ok(*address);
        }
    }
    Err(())
}

/// HTTP client issuing one connection per request.
///
/// The response is delivered raw, status line and headers included, so the
/// framer can locate the payload after the header terminator. Nothing is
/// delivered until the whole head has arrived with a 2xx status and no
/// chunked transfer coding.
pub struct HttpClient<'s, const RX: usize = 1024, const TX: usize = 512> {
    stack: Stack<'s>,
    timeout: Duration,
}

impl<'s, const RX: usize, const TX: usize> HttpClient<'s, RX, TX> {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(stack: Stack<'s>) -> Self {
        Self {
            stack,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Set the inactivity timeout of a request.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run one request, returning its terminal event.
    async fn exchange(
        &mut self,
        request: &GetRequest<'_>,
        on_event: &mut impl FnMut(HttpEvent<'_>),
    ) -> HttpEvent<'static> {
        let Some(url) = Url::parse(request.url) else {
            warn!("http: invalid url {}", request.url);
            return HttpEvent::Error;
        };
        let Ok(address) = resolve_host(self.stack, url.host).await else {
            warn!("http: host {} not found", url.host);
            return HttpEvent::HostNotFound;
        };

        let mut rx_buffer = [0u8; RX];
        let mut tx_buffer = [0u8; TX];
        let mut socket = TcpSocket::new(self.stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(self.timeout));

        if let Err(e) = socket.connect((address, url.port)).await {
            warn!("http: connect to {} failed: {:?}", url.authority, e);
            socket.abort();
            return match e {
                ConnectError::TimedOut => HttpEvent::TimedOut,
                _ => HttpEvent::Error,
            };
        }

        let mut head = String::<REQUEST_HEAD_SIZE>::new();
        let mut headers = RequestHeaders::get(&url).with_extra(request.headers);
        if !request.body.is_empty() {
            headers = headers.with_content_length(request.body.len());
        }
        if headers.write_to(&mut head).is_err() {
            warn!("http: request head too long");
            socket.abort();
            return HttpEvent::Error;
        }
        let sent = async {
            socket.write_all(head.as_bytes()).await?;
            socket.write_all(request.body).await?;
            socket.flush().await
        }
        .await;
        if sent.is_err() {
            socket.abort();
            return HttpEvent::Aborted;
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let mut response = HeadReader::<RESPONSE_HEAD_SIZE>::new();
        loop {
            let n = match with_timeout(self.timeout, socket.read(&mut chunk)).await {
                Err(_) => {
                    socket.abort();
                    return HttpEvent::TimedOut;
                }
                Ok(Err(_)) => return HttpEvent::Aborted,
                Ok(Ok(0)) => {
                    socket.close();
                    if !response.is_complete() {
                        warn!("http: response for {} closed before its head", url.path);
                        return HttpEvent::Error;
                    }
                    return HttpEvent::Closed;
                }
                Ok(Ok(n)) => n,
            };

            match response.feed(&chunk[..n]) {
                Ok(Some(data)) => on_event(HttpEvent::Data(data)),
                Ok(None) => debug!("http: {} head bytes buffered", n),
                Err(e) => {
                    warn!("http: rejected response for {}: {:?}", url.path, e);
                    socket.abort();
                    return HttpEvent::Error;
                }
            }
        }
    }
}

impl<const RX: usize, const TX: usize> HttpTransport for HttpClient<'_, RX, TX> {
    async fn get(&mut self, request: &GetRequest<'_>, mut on_event: impl FnMut(HttpEvent<'_>)) {
        let event = self.exchange(request, &mut on_event).await;
        on_event(event);
    }
}
