//! One ordered token stream over streaming and non-streaming backends

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::StreamExt;
use tracing::debug;

use crate::providers::{Capability, DesignModel, DesignStream};

/// Expose one lazy chunk sequence regardless of backend streaming
/// support.
///
/// Streaming backends pass through with empty chunks filtered out.
/// Non-streaming backends make one full call whose result is fragmented
/// into single-character chunks, so consumers never branch on the
/// backend. The stream is forward-only and finite; dropping it abandons
/// the underlying call.
pub fn multiplex(provider: Arc<dyn DesignModel>, payload: String) -> DesignStream {
    if provider.supports(Capability::StreamSystemDesign) {
        debug!(provider = provider.name(), "multiplexing native stream");
        Box::pin(try_stream! {
            let mut inner = provider.stream_system_design(&payload);
            while let Some(chunk) = inner.next().await {
                let chunk = chunk?;
                if !chunk.is_empty() {
                    yield chunk;
                }
            }
        })
    } else {
        debug!(
            provider = provider.name(),
            "fragmenting full response into chunks"
        );
        Box::pin(try_stream! {
            let text = provider.generate_system_design(&payload).await?;
            for ch in text.chars() {
                yield ch.to_string();
            }
        })
    }
}
