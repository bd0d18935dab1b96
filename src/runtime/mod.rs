// Container runtime seam: resolve a container and open its raw log/stats streams

mod docker;

pub use docker::{DockerHandle, DockerRuntime};

use crate::error::RuntimeError;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use std::future::Future;

/// Raw chunks produced by a runtime stream. Log streams yield output bytes in whatever
/// chunks the runtime delivers them; stats streams yield one JSON document per chunk.
pub type RawStream = BoxStream<'static, Result<Bytes, RuntimeError>>;

/// Resolves container identifiers to live handles.
pub trait ContainerRuntime: Send + Sync + 'static {
    type Handle: ContainerHandle;

    /// Fails with [`RuntimeError::NotFound`] for unknown containers.
    fn resolve(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Self::Handle, RuntimeError>> + Send;
}

/// A resolved container. Cheap to clone; every stream opened from it is independent.
pub trait ContainerHandle: Clone + Send + Sync + 'static {
    /// Output bytes, starting with up to `tail` existing lines, following new output when `follow`.
    fn log_stream(&self, follow: bool, tail: usize) -> RawStream;

    /// One raw stats document per sampling tick.
    fn stats_stream(&self) -> RawStream;
}
