pub mod batch;
pub mod pool;
pub mod progress;

pub use batch::{batch_ranges, chunk_seed, run_chunks, ChunkedRun};
pub use pool::WorkerPool;
pub use progress::{CancelToken, Progress, ProgressUpdate};
