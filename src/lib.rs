// batchsync - push prepared record collections to a sync endpoint
//
// Thin binary layer over the workspace crates:
// - batchsync-core: records, input formats, partitioning
// - batchsync-config: layered TOML + env configuration
// - batchsync-uploader: paced, retried, sequential batch upload

mod init;
pub mod upload;

pub use init::init_tracing;
pub use upload::{build_policy, load_records, run_upload, Target, UploadRequest};
