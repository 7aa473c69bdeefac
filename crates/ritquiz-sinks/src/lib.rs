//! ritquiz-sinks: result sinks and configuration.
//!
//! Implements the `ResultSink` port for an append-only JSON-lines file and
//! an in-memory store, and loads the `ritquiz.toml` configuration that
//! selects between them.

pub mod config;
pub mod error;
pub mod jsonl;
pub mod memory;

pub use config::{create_sink, load_config, load_config_from, RitquizConfig, SinkConfig};
pub use error::SinkError;
pub use jsonl::{find_record, load_records, JsonLinesSink};
pub use memory::MemorySink;
