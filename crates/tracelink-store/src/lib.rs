pub mod connection;
pub mod error;
pub mod events;
pub mod row_helpers;
pub mod schema;

pub use connection::ConnectionConfig;
pub use error::StoreError;
pub use events::{Event, EventQuery, EventStore, NewEvent, Payload, SessionSummary, MAX_PAGE};
