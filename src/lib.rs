//! MEV Shield Connector - Library Root
//!
//! Client-side connector for the MEV Shield opportunity service: a
//! supervised push stream with reconnect and gap signaling, periodic
//! status polling, and a bounded event stream for the consumer.
//!
//! ```no_run
//! use mev_shield_connector::{Connector, ConnectorConfig, ConnectorEvent};
//!
//! # async fn demo() -> Result<(), mev_shield_connector::ConnectorError> {
//! let connector = Connector::from_config(ConnectorConfig::new("localhost:8765"))?;
//! let mut events = connector.start()?;
//! while let Some(event) = events.recv().await {
//!     if let ConnectorEvent::Opportunity(opp) = event {
//!         println!("{} {}", opp.category(), opp.estimated_profit());
//!     }
//! }
//! connector.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod usecases;

pub use config::{BackpressurePolicy, ConnectorConfig};
pub use domain::{Category, ConnectionState, ConnectorEvent, Opportunity, StatusSnapshot};
pub use error::{ConnectorError, DecodeError, ShutdownReason};
pub use usecases::{Connector, EventStream};
