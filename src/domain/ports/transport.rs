/// Socket-level failure reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    Error,
    TimedOut,
    Aborted,
    HostNotFound,
}

impl TransportFailure {
    pub const fn as_str(self) -> &'static str {
        match self {
            TransportFailure::Error => "socket error",
            TransportFailure::TimedOut => "timed out",
            TransportFailure::Aborted => "aborted",
            TransportFailure::HostNotFound => "hostname not found",
        }
    }
}

/// Event delivered by the transport while a request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpEvent<'a> {
    /// Raw response bytes, in arrival order.
    Data(&'a [u8]),
    /// The server closed the connection after responding.
    Closed,
    Error,
    TimedOut,
    Aborted,
    HostNotFound,
}

impl HttpEvent<'_> {
    /// The failure carried by this event, if any.
    pub const fn failure(&self) -> Option<TransportFailure> {
        match self {
            HttpEvent::Error => Some(TransportFailure::Error),
            HttpEvent::TimedOut => Some(TransportFailure::TimedOut),
            HttpEvent::Aborted => Some(TransportFailure::Aborted),
            HttpEvent::HostNotFound => Some(TransportFailure::HostNotFound),
            HttpEvent::Data(_) | HttpEvent::Closed => None,
        }
    }
}

impl From<TransportFailure> for HttpEvent<'_> {
    fn from(failure: TransportFailure) -> Self {
        match failure {
            TransportFailure::Error => HttpEvent::Error,
            TransportFailure::TimedOut => HttpEvent::TimedOut,
            TransportFailure::Aborted => HttpEvent::Aborted,
            TransportFailure::HostNotFound => HttpEvent::HostNotFound,
        }
    }
}

/// GET request issued to the image server.
#[derive(Debug, Clone, Copy)]
pub struct GetRequest<'a> {
    pub url: &'a str,
    /// Extra request headers, written after the mandatory ones.
    pub headers: &'a [(&'a str, &'a str)],
    pub body: &'a [u8],
}

impl<'a> GetRequest<'a> {
    pub const fn new(url: &'a str) -> Self {
        Self {
            url,
            headers: &[],
            body: &[],
        }
    }

    #[must_use]
    pub const fn with_headers(mut self, headers: &'a [(&'a str, &'a str)]) -> Self {
        self.headers = headers;
        self
    }
}

/// Request/response transport used to reach the image server.
#[allow(async_fn_in_trait)]
pub trait HttpTransport {
    /// Issue a GET request and deliver every response event to `on_event`.
    ///
    /// Returns once the request has terminated with [`HttpEvent::Closed`] or a
    /// failure event. Dropping the future aborts the request.
    async fn get(&mut self, request: &GetRequest<'_>, on_event: impl FnMut(HttpEvent<'_>));
}

impl<T: HttpTransport> HttpTransport for &mut T {
    async fn get(&mut self, request: &GetRequest<'_>, on_event: impl FnMut(HttpEvent<'_>)) {
        (**self).get(request, on_event).await;
    }
}
