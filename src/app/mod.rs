//! Application layer - the transfer state machine and its usecases

pub mod agent;
pub mod gate;
pub mod session;
pub mod usecases;

pub use agent::DownloadAgent;
pub use gate::TransferGate;
pub use session::TransferSession;
