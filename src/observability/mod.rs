//! Observability
//!
//! Structured JSON-line logging for the query service. Logging is
//! synchronous, one line per event, and never changes control flow.
//!
//! ```
//! use tenantdb::observability::{Event, Logger};
//!
//! Logger::info(Event::ServerListening, &[("addr", "0.0.0.0:8080")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

