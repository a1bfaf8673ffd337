pub mod client;

pub use client::MonitoringClient;
