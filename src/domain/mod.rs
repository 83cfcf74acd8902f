//! Domain layer - entities and ports of the download engine

pub mod entity;
pub mod ports;
