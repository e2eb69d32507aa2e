// ── Zhenwo Atoms: Trait Seams ──────────────────────────────────────────────
// The transport seam between the engine and the coaching backend.
// `CoachClient` is the production implementation; tests script a fake
// backend to drive the decoder with controlled chunk boundaries.

use crate::atoms::error::EngineResult;
use crate::atoms::types::AskRequest;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Ordered chunks of the response body, already decoded to text.
/// Chunk boundaries carry no meaning — a logical frame may span chunks.
pub type ChunkStream = BoxStream<'static, EngineResult<String>>;

/// Anything that can answer a coaching question with a streamed response.
#[async_trait]
pub trait CoachBackend: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &str;

    /// Submit a question and return the raw response-body chunk stream.
    /// Implementations must have already rejected non-2xx responses.
    async fn ask_stream(&self, request: &AskRequest) -> EngineResult<ChunkStream>;
}
