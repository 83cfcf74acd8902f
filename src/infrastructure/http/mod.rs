//! Minimal HTTP/1.1 client used to reach the image server.

mod client;
mod headers;

pub use client::{HttpClient, resolve_host};
pub use headers::{
    BufferedWriter,
    ConnectionPolicy,
    HeadReader,
    RequestHeaders,
    ResponseError,
    Url,
    check_response_head,
    find_head_end,
    parse_status_line,
};
