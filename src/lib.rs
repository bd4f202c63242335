//! Receives JSON webhooks over HTTP, stores every delivery and forwards it to
//! the targets configured for its path.
//!
//! Request flow: [`server::ingest`] validates the body, derives a key with
//! [`key::generate_key`], writes through a [`storage::Storage`] backend and,
//! once the write succeeded, hands the payload to [`forward::Forwarder`]
//! according to the [`dispatch::DispatchTable`].

pub mod config;
pub mod data;
pub mod dispatch;
pub mod error;
pub mod forward;
pub mod key;
pub mod metrics;
pub mod server;
pub mod storage;
