pub mod ota;

pub use ota::OtaController;
