//! Output Emission
//!
//! The final answer is fully computed before emission starts. Streaming only
//! paces it out word by word for display.

use std::time::Duration;

use async_stream::stream;
use futures::Stream;

/// Pause between streamed words
pub const DEFAULT_STREAM_DELAY: Duration = Duration::from_millis(50);

/// Emit `text` as one fragment, or word by word when `streaming`.
///
/// Streamed fragments carry one trailing space except the last. Empty text
/// emits nothing.
pub fn emit(text: String, streaming: bool, delay: Duration) -> impl Stream<Item = String> {
    stream! {
        if text.is_empty() {
            return;
        }

        if !streaming {
            yield text;
            return;
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        let last = words.len().saturating_sub(1);
        for (i, word) in words.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(delay).await;
            }
            if i < last {
                yield format!("{word} ");
            } else {
                yield (*word).to_string();
            }
        }
    }
}
