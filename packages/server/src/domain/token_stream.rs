//! Pull-based decoding of the AI backend's streamed answers.
//!
//! The backend frames its output as lines, optionally in SSE style
//! (`data: <payload>`). Each payload is either the `[DONE]` sentinel, an
//! OpenAI-style delta object (`{"choices":[{"delta":{"content":"..."}}]}`), or
//! plain text that is relayed verbatim.
//!
//! [`LineDecoder`] holds the buffering rules and knows nothing about I/O;
//! [`TokenEventStream`] drives it from a [`ByteStream`].

use std::collections::VecDeque;

use futures_util::StreamExt;
use serde_json::Value;

use super::{BackendError, ByteStream};

const SENTINEL: &str = "[DONE]";

/// One decoded step of an upstream stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A non-empty piece of the answer
    Token(String),
    /// The `[DONE]` sentinel: logical end of the answer, not an error
    Sentinel,
    /// The transport failed; [`StreamEvent::End`] follows
    Error(BackendError),
    /// The transport is finished. Returned for every call after the end.
    End,
}

/// Splits raw bytes into lines and decodes each complete line.
///
/// A trailing partial line is kept (as bytes, so a multi-byte character split
/// across chunks survives) until its newline arrives or [`LineDecoder::finish`]
/// is called.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns the events of every line it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        // The retained bytes hold no newline, so only the new chunk is scanned
        let mut search_from = self.buffer.len();
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut line_start = 0;
        while let Some(offset) = self.buffer[search_from..].iter().position(|b| *b == b'\n') {
            let end = search_from + offset;
            let line = String::from_utf8_lossy(&self.buffer[line_start..end]);
            if let Some(event) = decode_line(&line) {
                events.push(event);
            }
            line_start = end + 1;
            search_from = line_start;
        }
        self.buffer.drain(..line_start);
        events
    }

    /// Flush the residual partial line as a final line
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&String::from_utf8_lossy(&rest))
            .into_iter()
            .collect()
    }

    /// Bytes currently waiting for a newline
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Decode one complete line (without its `\n`)
fn decode_line(line: &str) -> Option<StreamEvent> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() || line.starts_with(':') {
        return None;
    }

    let payload = match line.strip_prefix("data:") {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
        None => line,
    };
    if payload.trim() == SENTINEL {
        return Some(StreamEvent::Sentinel);
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(value @ Value::Object(_)) => value
            .pointer("/choices/0/delta/content")
            .and_then(Value::as_str)
            .filter(|content| !content.is_empty())
            .map(|content| StreamEvent::Token(content.to_string())),
        // Not a delta object: the backend is streaming plain text
        _ => Some(StreamEvent::Token(payload.to_string())),
    }
}

/// Pull-based iterator of [`StreamEvent`]s over an upstream byte stream
pub struct TokenEventStream {
    inner: ByteStream,
    decoder: LineDecoder,
    pending: VecDeque<StreamEvent>,
    finished: bool,
}

impl TokenEventStream {
    pub fn new(inner: ByteStream) -> Self {
        Self {
            inner,
            decoder: LineDecoder::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Wait for the next event. After [`StreamEvent::End`] keeps returning `End`.
    pub async fn next(&mut self) -> StreamEvent {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return event;
            }
            if self.finished {
                return StreamEvent::End;
            }

            match self.inner.next().await {
                Some(Ok(chunk)) => self.pending.extend(self.decoder.push(&chunk)),
                Some(Err(e)) => {
                    self.finished = true;
                    self.pending.extend(self.decoder.finish());
                    self.pending.push_back(StreamEvent::Error(e));
                }
                None => {
                    self.finished = true;
                    self.pending.extend(self.decoder.finish());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn byte_stream(chunks: Vec<Result<&'static str, BackendError>>) -> ByteStream {
        stream::iter(
            chunks
                .into_iter()
                .map(|chunk| chunk.map(|s| s.as_bytes().to_vec())),
        )
        .boxed()
    }

    async fn collect(mut events: TokenEventStream) -> Vec<StreamEvent> {
        let mut collected = Vec::new();
        loop {
            let event = events.next().await;
            if event == StreamEvent::End {
                return collected;
            }
            collected.push(event);
        }
    }

    #[test]
    fn test_delta_split_across_chunks_yields_one_token() {
        // テスト項目: 2 回の書き込みに分割された 1 行から、トークンが 1 つだけ得られる
        // given (前提条件):
        let mut decoder = LineDecoder::new();

        // when (操作):
        let first = decoder.push(br#"data: {"cho"#);
        let second = decoder.push(b"ices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n");

        // then (期待する結果):
        assert!(first.is_empty());
        assert_eq!(decoder.pending_len(), 0);
        assert_eq!(second, vec![StreamEvent::Token("Hi".to_string())]);
    }

    #[test]
    fn test_done_sentinel_yields_no_token() {
        // テスト項目: [DONE] 行はトークンを生成せず、番兵イベントになる
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.push(b"data: [DONE]\n"), vec![StreamEvent::Sentinel]);
    }

    #[test]
    fn test_plain_text_line_is_relayed_verbatim() {
        // テスト項目: JSON でない行はそのままトークンとして扱われる
        let mut decoder = LineDecoder::new();
        assert_eq!(
            decoder.push(b"hello\n"),
            vec![StreamEvent::Token("hello".to_string())]
        );
    }

    #[test]
    fn test_partial_line_is_retained_not_processed() {
        // テスト項目: 改行のない末尾の断片は処理されずにバッファに残る
        // given (前提条件):
        let mut decoder = LineDecoder::new();

        // when (操作):
        let events = decoder.push(b"data: one\ndata: tw");

        // then (期待する結果):
        assert_eq!(events, vec![StreamEvent::Token("one".to_string())]);
        assert_eq!(decoder.pending_len(), "data: tw".len());
        assert_eq!(
            decoder.push(b"o\n"),
            vec![StreamEvent::Token("two".to_string())]
        );
    }

    #[test]
    fn test_long_line_fed_byte_by_byte() {
        // テスト項目: 1 バイトずつ届く長い行が、改行の到着時に 1 トークンとして処理される
        // given (前提条件):
        let mut decoder = LineDecoder::new();
        let word = "x".repeat(50_000);
        let line = format!("data: {word}\ndata: tail\n");

        // when (操作):
        let mut events = Vec::new();
        for byte in line.as_bytes() {
            events.extend(decoder.push(std::slice::from_ref(byte)));
        }

        // then (期待する結果):
        assert_eq!(
            events,
            vec![
                StreamEvent::Token(word),
                StreamEvent::Token("tail".to_string())
            ]
        );
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_empty_delta_and_non_delta_json_are_skipped() {
        // テスト項目: content が空、または delta を持たない JSON はトークンにならない
        // given (前提条件):
        let mut decoder = LineDecoder::new();
        let input = concat!(
            r#"data: {"choices":[{"delta":{"content":""}}]}"#,
            "\n",
            r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#,
            "\n",
            r#"{"usage":{"total_tokens":3}}"#,
            "\n",
        );

        // when (操作):
        let events = decoder.push(input.as_bytes());

        // then (期待する結果):
        assert!(events.is_empty());
    }

    #[test]
    fn test_bare_json_scalar_is_plain_text() {
        // テスト項目: オブジェクトでない JSON（数値など）はそのままトークンになる
        let mut decoder = LineDecoder::new();
        assert_eq!(
            decoder.push(b"data: 42\n"),
            vec![StreamEvent::Token("42".to_string())]
        );
    }

    #[test]
    fn test_crlf_blank_and_comment_lines() {
        // テスト項目: CRLF 改行・空行・SSE コメント行が正しく扱われる
        // given (前提条件):
        let mut decoder = LineDecoder::new();

        // when (操作):
        let events = decoder.push(b": keep-alive\r\n\r\ndata:word\r\n\n");

        // then (期待する結果):
        assert_eq!(events, vec![StreamEvent::Token("word".to_string())]);
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        // テスト項目: チャンク境界で分割されたマルチバイト文字が壊れない
        // given (前提条件):
        let mut decoder = LineDecoder::new();
        let bytes = "こんにちは\n".as_bytes();

        // when (操作):
        let first = decoder.push(&bytes[..4]);
        let second = decoder.push(&bytes[4..]);

        // then (期待する結果):
        assert!(first.is_empty());
        assert_eq!(second, vec![StreamEvent::Token("こんにちは".to_string())]);
    }

    #[tokio::test]
    async fn test_residual_line_is_flushed_at_end() {
        // テスト項目: ストリーム終了時、改行のない最終行も処理されてから End になる
        // given (前提条件):
        let events = TokenEventStream::new(byte_stream(vec![
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n"),
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}"),
        ]));

        // when (操作):
        let collected = collect(events).await;

        // then (期待する結果):
        assert_eq!(
            collected,
            vec![
                StreamEvent::Token("a".to_string()),
                StreamEvent::Token("b".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_transport_error_flushes_then_reports_error() {
        // テスト項目: 転送エラー時も残りの行を処理した後に Error、その後 End を返す
        // given (前提条件):
        let mut events = TokenEventStream::new(byte_stream(vec![
            Ok("partial"),
            Err(BackendError::Protocol("connection reset".to_string())),
            Ok("never read\n"),
        ]));

        // when (操作):
        let first = events.next().await;
        let second = events.next().await;
        let third = events.next().await;
        let fourth = events.next().await;

        // then (期待する結果):
        assert_eq!(first, StreamEvent::Token("partial".to_string()));
        assert_eq!(
            second,
            StreamEvent::Error(BackendError::Protocol("connection reset".to_string()))
        );
        assert_eq!(third, StreamEvent::End);
        assert_eq!(fourth, StreamEvent::End);
    }

    #[tokio::test]
    async fn test_sentinel_does_not_end_the_stream() {
        // テスト項目: [DONE] の後も転送が終わるまで読み続ける
        // given (前提条件):
        let events = TokenEventStream::new(byte_stream(vec![
            Ok("data: first\n"),
            Ok("data: [DONE]\n"),
            Ok("data: trailing\n"),
        ]));

        // when (操作):
        let collected = collect(events).await;

        // then (期待する結果):
        assert_eq!(
            collected,
            vec![
                StreamEvent::Token("first".to_string()),
                StreamEvent::Sentinel,
                StreamEvent::Token("trailing".to_string()),
            ]
        );
    }
}
