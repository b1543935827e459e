//! Venue adapter trait and a venue-agnostic reconnecting stream driver.
//!
//! Concrete venue SDKs are out of scope for this workspace; this crate
//! ships the uniform capability set (`VenueAdapter`), the shared error
//! vocabulary, a reusable reconnect-with-backoff driver any adapter's
//! `subscribe_stream` can delegate to, and an in-memory `MockAdapter` test
//! double used by the rest of the workspace's test suite.

pub mod adapter;
pub mod error;
pub mod mock;
pub mod reconnect;
pub mod stream;

pub use adapter::VenueAdapter;
pub use error::{AdapterError, AdapterResult};
pub use mock::MockAdapter;
pub use reconnect::{calculate_backoff_delay, spawn_reconnecting, ReconnectConfig};
pub use stream::StreamHandle;
