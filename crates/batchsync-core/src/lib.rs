//! Record model and batch partitioning for batchsync.
//!
//! Pure logic only: no I/O, no async. The uploader crate builds on these types.

pub mod error;
pub mod input_format;
pub mod partition;
pub mod record;

pub use error::RecordError;
pub use input_format::{parse_records, sanitize_non_finite, InputFormat};
pub use partition::{batch_count, partition, Batch};
pub use record::{normalize_record, normalize_records, FieldDefaults, Record, Scalar};
