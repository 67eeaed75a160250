//! Resilient batch uploader.
//!
//! Splits a record collection into fixed-size batches and posts them one at a
//! time as JSON arrays to `<endpoint>?reset=<bool>`. Each batch is retried on
//! transient failures with linear backoff; any batch that cannot be delivered
//! abandons the session.
//!
//! ```no_run
//! # async fn run(records: Vec<batchsync_core::Record>) -> Result<(), batchsync_uploader::UploadError> {
//! use batchsync_uploader::{UploadPolicy, Uploader};
//!
//! let policy = UploadPolicy::new("http://localhost:3000/api/sync/vendas")?.with_batch_size(250)?;
//! let report = Uploader::new(policy)?.upload(records).await;
//! if !report.succeeded() {
//!     eprintln!("sync failed after {} requests", report.requests_sent());
//! }
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod error;
pub mod pause;
pub mod policy;
pub mod resolve;
pub mod retry;
pub mod session;
pub mod transport;

pub use classify::{classify, Classification};
pub use error::{ErrorCode, UploadError};
pub use pause::{Pause, TokioPause};
pub use policy::{join_endpoint, UploadPolicy};
pub use resolve::{resolve_base_url, BaseSource, ResolvedBase};
pub use retry::{BatchOutcome, Next, RetryController, RetryState};
pub use session::{BatchReport, UploadReport, Uploader};
pub use transport::{
    BatchTransport, Delivery, DeliveryResult, FailureKind, HttpTransport, TransportFailure,
};
