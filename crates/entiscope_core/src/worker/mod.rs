//! Worker pool and operation futures behind the async facade.

mod future;
mod pool;

pub use future::OperationFuture;
pub use pool::WorkerPool;
