//! # Cartstream Testing
//!
//! Testing fakes for the cartstream architecture:
//!
//! - [`InMemoryEventLog`]: in-memory [`EventLog`] with positional
//!   assignment and the same per-aggregate uniqueness guarantee as the
//!   Postgres implementation
//! - [`FixedClock`] / [`SequencedClock`]: deterministic time
//! - [`RecordingWriter`]: projection writer that captures applied batches
//!
//! [`EventLog`]: cartstream_core::EventLog

mod clock;
mod log;
mod writer;

pub use clock::{test_clock, FixedClock, SequencedClock};
pub use log::InMemoryEventLog;
pub use writer::RecordingWriter;
