pub mod client;
pub mod types;
pub mod xml;

pub use client::{
    HttpSesClient, HttpSesClientFactory, SendStatisticsApi, SesClientConfig, SesClientFactory,
};
pub use types::SendDataPoint;
