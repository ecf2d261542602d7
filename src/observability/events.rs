//! Observable events
//!
//! Every event the service logs has a fixed name here so log consumers
//! can rely on it.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Configuration file loaded and validated
    ConfigLoaded,
    /// Fixture data loaded into the row store
    DataLoaded,
    /// Filter operator registry frozen
    OperatorRegistryBuilt,
    /// A filter document was rejected
    FilterRejected,
    /// A page was cut short by the response byte budget
    PageTruncated,
    /// The executor failed mid-page; the page was discarded
    PageAborted,
    /// HTTP listener bound
    ServerListening,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::DataLoaded => "DATA_LOADED",
            Event::OperatorRegistryBuilt => "OPERATOR_REGISTRY_BUILT",
            Event::FilterRejected => "FILTER_REJECTED",
            Event::PageTruncated => "PAGE_TRUNCATED",
            Event::PageAborted => "PAGE_ABORTED",
            Event::ServerListening => "SERVER_LISTENING",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
