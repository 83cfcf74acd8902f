//! Paginated firmware download engine.
//!
//! Fetches a firmware image page by page over a request/response transport and
//! commits each page to non-volatile storage. The entry point is
//! [`app::DownloadAgent`].

#![cfg_attr(not(test), no_std)]

pub mod app;
pub mod config;
pub mod controllers;
pub mod domain;
pub mod engine;
pub mod infrastructure;

pub use app::{DownloadAgent, TransferGate};
pub use config::OtaConfig;
pub use domain::entity::{FirmwareMetadata, TransferEnd, TransferPhase, TransferReport};
pub use domain::ports::{
    HttpEvent,
    HttpTransport,
    PageStorage,
    StorageError,
    TransferError,
    TransferObserver,
    TransportFailure,
};
