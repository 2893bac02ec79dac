pub mod config;
pub mod goal;
pub mod session;
pub mod stats;
pub mod sweep;
