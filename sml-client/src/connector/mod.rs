//! Connector module

pub mod builder;
pub mod config;
pub mod connector;

pub use builder::ConnectorBuilder;
pub use config::ConnectorConfig;
pub use connector::{ConnectionState, MeterReader, SmlConnector};
