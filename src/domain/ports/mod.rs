pub mod download;
pub mod observer;
pub mod storage;
pub mod transport;

pub use download::*;
pub use observer::*;
pub use storage::*;
pub use transport::*;
