mod handler;

pub use handler::OtaController;
