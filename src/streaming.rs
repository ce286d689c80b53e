use crate::assembler::StreamAssembler;
use crate::error::ChatResult;
use async_stream::stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use tracing::debug;

/// Raw body chunks of a completion response
pub type ByteStream = Pin<Box<dyn Stream<Item = ChatResult<Bytes>> + Send>>;

/// Full reply text so far, one item per received fragment
pub type SnapshotStream = Pin<Box<dyn Stream<Item = ChatResult<String>> + Send>>;

/// Lazily assemble a byte stream into reply snapshots.
///
/// Stops reading after `[DONE]`. A read error is yielded once and ends the
/// stream.
pub fn assemble(mut bytes: ByteStream) -> SnapshotStream {
    Box::pin(stream! {
        let mut assembler = StreamAssembler::new();
        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            for snapshot in assembler.feed(&chunk) {
                yield Ok(snapshot);
            }
            if assembler.is_done() {
                break;
            }
        }
        for snapshot in assembler.finish() {
            yield Ok(snapshot);
        }
        debug!(chars = assembler.text().chars().count(), "reply stream complete");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;
    use futures::stream;
    use pretty_assertions::assert_eq;

    fn bytes_of(chunks: Vec<ChatResult<&'static str>>) -> ByteStream {
        Box::pin(stream::iter(
            chunks
                .into_iter()
                .map(|chunk| chunk.map(|text| Bytes::from_static(text.as_bytes()))),
        ))
    }

    #[test]
    fn yields_snapshots_in_order() {
        let input = bytes_of(vec![
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"Na\"}}]}\n\n"),
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"maste\"}}]}\n\ndata: [DONE]\n"),
        ]);
        let snapshots: Vec<String> = tokio_test::block_on(
            assemble(input).map(|item| item.unwrap()).collect::<Vec<_>>(),
        );
        assert_eq!(snapshots, vec!["Na".to_string(), "Namaste".to_string()]);
    }

    #[test]
    fn stops_reading_after_done() {
        let input = bytes_of(vec![
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\ndata: [DONE]\n"),
            Err(ChatError::Stream("should never be polled".to_string())),
        ]);
        let items = tokio_test::block_on(assemble(input).collect::<Vec<_>>());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), "ok");
    }

    #[tokio::test]
    async fn read_error_keeps_earlier_snapshots() {
        let input = bytes_of(vec![
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"Mandi rates \"}}]}\n"),
            Err(ChatError::Stream("connection reset".to_string())),
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"lost\"}}]}\n"),
        ]);
        let items: Vec<_> = assemble(input).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "Mandi rates ");
        assert!(matches!(items[1], Err(ChatError::Stream(_))));
    }

    #[tokio::test]
    async fn flushes_unterminated_final_record() {
        let input = bytes_of(vec![Ok(
            "data: {\"choices\":[{\"delta\":{\"content\":\"last\"}}]}",
        )]);
        let items: Vec<_> = assemble(input).collect().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), "last");
    }
}
