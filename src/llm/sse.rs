//! Server-sent-event stream decoder.
//!
//! Consumes the relay's SSE body chunk by chunk, reassembles complete
//! `data: `-prefixed records (chunk boundaries align with neither lines nor
//! UTF-8 sequences, so partial trailing bytes are carried between reads),
//! and feeds content deltas to a token callback. Decoding ends with a
//! tagged [`StreamOutcome`] — errors are values here, never panics, so the
//! orchestrator can update visible state deterministically.
//!
//! The decoder holds no conversation state; which message the tokens land
//! in is entirely the caller's business.

use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::oneshot;

/// How a decode run ended.
///
/// `Cancelled` is not an error: the caller asked the stream to stop, and
/// whatever tokens were already delivered stay delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// End of stream; carries the full accumulated text.
    Completed(String),
    /// An error event, transport failure, or non-success response.
    Failed(String),
    /// The cancellation signal fired mid-stream.
    Cancelled,
}

const FALLBACK_STREAM_ERROR: &str = "Stream error";
const FALLBACK_REQUEST_ERROR: &str = "Request failed";

/// Event payload shapes the provider emits. Anything else deserializes to
/// `Other` and is skipped, so new upstream event types never break us.
#[derive(Deserialize)]
#[serde(tag = "type")]
enum SsePayload {
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta {
        #[serde(default)]
        delta: Delta,
    },
    #[serde(rename = "message_stop")]
    MessageStop,
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        error: ErrorDetail,
    },
    #[serde(other)]
    Other,
}

#[derive(Default, Deserialize)]
struct Delta {
    #[serde(default)]
    text: String,
}

#[derive(Default, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Error envelope the relay answers with before any streaming begins.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
}

/// Decode a full relay response: a non-2xx status fails immediately with
/// the JSON `{error}` body (never starting the decode loop); otherwise the
/// body is decoded until end-of-stream, error, or cancellation.
pub async fn decode_response(
    response: reqwest::Response,
    mut cancel: oneshot::Receiver<()>,
    mut on_token: impl FnMut(&str),
) -> StreamOutcome {
    if !response.status().is_success() {
        let status = response.status();
        let reason = match response.json::<ErrorBody>().await {
            Ok(body) if !body.error.is_empty() => body.error,
            _ => format!("{FALLBACK_REQUEST_ERROR} ({status})"),
        };
        return StreamOutcome::Failed(reason);
    }

    decode_stream(response.bytes_stream(), &mut cancel, &mut on_token).await
}

/// Decode loop over any chunked byte stream. Each suspension point also
/// waits on the cancellation signal, so a cancel is observed at the next
/// read even when the upstream has gone silent.
pub async fn decode_stream<S, B, E>(
    stream: S,
    cancel: &mut oneshot::Receiver<()>,
    on_token: &mut impl FnMut(&str),
) -> StreamOutcome
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut pending: Vec<u8> = Vec::new();
    let mut transcript = String::new();

    loop {
        let chunk = tokio::select! {
            _ = &mut *cancel => return StreamOutcome::Cancelled,
            chunk = stream.next() => chunk,
        };

        match chunk {
            None => return StreamOutcome::Completed(transcript),
            Some(Err(e)) => return StreamOutcome::Failed(e.to_string()),
            Some(Ok(bytes)) => {
                pending.extend_from_slice(bytes.as_ref());
                // Only complete lines are decoded; the tail stays buffered
                while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = pending.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line);
                    if let Some(failure) =
                        process_line(line.trim_end_matches(['\n', '\r']), &mut transcript, on_token)
                    {
                        return failure;
                    }
                }
            }
        }
    }
}

/// Handle one complete record. Returns Some(outcome) only for a terminal
/// error event; everything else continues the stream.
fn process_line(
    line: &str,
    transcript: &mut String,
    on_token: &mut impl FnMut(&str),
) -> Option<StreamOutcome> {
    let data = line.strip_prefix("data: ")?.trim();
    if data == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<SsePayload>(data) {
        Ok(SsePayload::ContentBlockDelta { delta }) => {
            transcript.push_str(&delta.text);
            on_token(&delta.text);
            None
        }
        Ok(SsePayload::MessageStop) => None,
        Ok(SsePayload::Error { error }) => Some(StreamOutcome::Failed(
            error
                .message
                .unwrap_or_else(|| FALLBACK_STREAM_ERROR.to_string()),
        )),
        // Unknown event types and malformed JSON are skipped, not fatal
        Ok(SsePayload::Other) | Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::convert::Infallible;

    type Chunk = Result<Vec<u8>, Infallible>;

    fn chunks(parts: &[&str]) -> Vec<Chunk> {
        parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect()
    }

    async fn decode(parts: &[&str]) -> (StreamOutcome, Vec<String>) {
        let (_tx, mut cancel) = oneshot::channel();
        let mut tokens = Vec::new();
        let outcome = decode_stream(
            stream::iter(chunks(parts)),
            &mut cancel,
            &mut |t: &str| tokens.push(t.to_string()),
        )
        .await;
        (outcome, tokens)
    }

    fn delta(text: &str) -> String {
        format!("data: {{\"type\":\"content_block_delta\",\"delta\":{{\"text\":\"{text}\"}}}}\n\n")
    }

    #[tokio::test]
    async fn tokens_accumulate_into_completion() {
        let body = format!(
            "{}{}data: {{\"type\":\"message_stop\"}}\n\ndata: [DONE]\n\n",
            delta("Hello"),
            delta(", world")
        );
        let (outcome, tokens) = decode(&[&body]).await;

        assert_eq!(tokens, ["Hello", ", world"]);
        assert_eq!(outcome, StreamOutcome::Completed("Hello, world".into()));
    }

    #[tokio::test]
    async fn token_concat_equals_completed_text() {
        let body = format!("{}{}{}", delta("a"), delta("bc"), delta("def"));
        let (outcome, tokens) = decode(&[&body]).await;

        let concat = tokens.concat();
        assert_eq!(outcome, StreamOutcome::Completed(concat));
    }

    #[tokio::test]
    async fn record_split_across_chunks_decodes_identically() {
        let body = format!("{}{}", delta("Hello"), delta(" there"));
        let (whole, whole_tokens) = decode(&[&body]).await;

        // Split mid-record, nowhere near a line boundary
        let (a, b) = body.split_at(17);
        let (split, split_tokens) = decode(&[a, b]).await;

        assert_eq!(whole, split);
        assert_eq!(whole_tokens.concat(), split_tokens.concat());
    }

    #[tokio::test]
    async fn multibyte_character_split_across_chunks_survives() {
        let body = delta("héllo");
        let bytes = body.as_bytes();
        // Find the é and split in the middle of its two-byte sequence
        let mid = body.find('é').unwrap() + 1;
        let parts: Vec<Chunk> = vec![
            Ok(bytes[..mid].to_vec()),
            Ok(bytes[mid..].to_vec()),
        ];

        let (_tx, mut cancel) = oneshot::channel();
        let mut text = String::new();
        let outcome = decode_stream(stream::iter(parts), &mut cancel, &mut |t: &str| {
            text.push_str(t)
        })
        .await;

        assert_eq!(outcome, StreamOutcome::Completed("héllo".into()));
        assert_eq!(text, "héllo");
    }

    #[tokio::test]
    async fn error_event_terminates_with_its_message() {
        let body = format!(
            "{}data: {{\"type\":\"error\",\"error\":{{\"message\":\"boom\"}}}}\n\n{}",
            delta("partial"),
            delta("never seen")
        );
        let (outcome, tokens) = decode(&[&body]).await;

        assert_eq!(outcome, StreamOutcome::Failed("boom".into()));
        // Records after the error are not processed
        assert_eq!(tokens, ["partial"]);
    }

    #[tokio::test]
    async fn error_without_message_uses_fallback() {
        let (outcome, _) = decode(&["data: {\"type\":\"error\"}\n\n"]).await;
        assert_eq!(outcome, StreamOutcome::Failed("Stream error".into()));
    }

    #[tokio::test]
    async fn malformed_and_unknown_records_are_skipped() {
        let body = format!(
            "data: {{oops not json\n\ndata: {{\"type\":\"message_start\",\"message\":{{}}}}\n\n: comment line\n\n{}",
            delta("ok")
        );
        let (outcome, tokens) = decode(&[&body]).await;

        assert_eq!(tokens, ["ok"]);
        assert_eq!(outcome, StreamOutcome::Completed("ok".into()));
    }

    #[tokio::test]
    async fn delta_without_text_contributes_empty_token() {
        let body = "data: {\"type\":\"content_block_delta\",\"delta\":{}}\n\n";
        let (outcome, tokens) = decode(&[body]).await;

        assert_eq!(tokens, [""]);
        assert_eq!(outcome, StreamOutcome::Completed(String::new()));
    }

    #[tokio::test]
    async fn cancellation_reports_neither_completion_nor_failure() {
        let (tx, mut cancel) = oneshot::channel();
        // One delta, then a stream that never ends
        let first = chunks(&[&delta("frozen")]);
        let body = stream::iter(first).chain(stream::pending());

        let mut tokens = Vec::new();
        tx.send(()).unwrap();
        let outcome = decode_stream(body, &mut cancel, &mut |t: &str| {
            tokens.push(t.to_string())
        })
        .await;

        assert_eq!(outcome, StreamOutcome::Cancelled);
    }

    #[tokio::test]
    async fn cancellation_mid_stream_keeps_delivered_tokens() {
        let (tx, mut cancel) = oneshot::channel();

        // Deliver one chunk, then cancel while the stream pends forever
        let first = delta("partial answer");
        let body = stream::iter(chunks(&[&first])).chain(
            stream::once(async move {
                tx.send(()).ok();
                // Yield a chunk that never resolves after signalling
                futures_util::future::pending::<Chunk>().await
            }),
        );

        let mut text = String::new();
        let outcome = decode_stream(body, &mut cancel, &mut |t: &str| text.push_str(t)).await;

        assert_eq!(outcome, StreamOutcome::Cancelled);
        assert_eq!(text, "partial answer");
    }

    #[tokio::test]
    async fn transport_error_becomes_failure() {
        #[derive(Debug)]
        struct Broken;
        impl std::fmt::Display for Broken {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "connection reset")
            }
        }

        let parts: Vec<Result<Vec<u8>, Broken>> =
            vec![Ok(delta("a").into_bytes()), Err(Broken)];
        let (_tx, mut cancel) = oneshot::channel();
        let mut tokens = Vec::new();
        let outcome = decode_stream(stream::iter(parts), &mut cancel, &mut |t: &str| {
            tokens.push(t.to_string())
        })
        .await;

        assert_eq!(outcome, StreamOutcome::Failed("connection reset".into()));
        assert_eq!(tokens, ["a"]);
    }

    #[tokio::test]
    async fn done_sentinel_is_ignored() {
        let (outcome, tokens) = decode(&["data: [DONE]\n\n"]).await;
        assert_eq!(tokens.len(), 0);
        assert_eq!(outcome, StreamOutcome::Completed(String::new()));
    }
}
