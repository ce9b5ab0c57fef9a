//! Record framing and event decoding

use super::utf8::Utf8Decoder;
use super::wire::WirePayload;
use super::Event;
use crate::backend::BackendError;
use futures::stream::Stream;
use futures::StreamExt;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Blank line terminating one framed record
const RECORD_DELIMITER: &str = "\n\n";

/// Prefix every meaningful record carries
const DATA_MARKER: &str = "data:";

/// Synchronous core of the decoder.
///
/// Feed fragments with [`StreamDecoder::push`] and signal end of input with
/// [`StreamDecoder::finish`]. Once a finalize or end record has been seen the
/// decoder is finished and ignores everything after it.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: String,
    utf8: Utf8Decoder,
    finished: bool,
    finalized: bool,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one fragment and return the events completed by it
    pub fn push(&mut self, fragment: &[u8]) -> Vec<Event> {
        if self.finished {
            return Vec::new();
        }
        self.utf8.decode_into(fragment, &mut self.buffer);
        self.drain_records()
    }

    /// Signal end of input. Complete records are drained; an unterminated
    /// residue is discarded.
    pub fn finish(&mut self) -> Vec<Event> {
        if self.finished {
            return Vec::new();
        }
        self.utf8.finish(&mut self.buffer);
        let events = self.drain_records();
        if !self.buffer.trim().is_empty() {
            tracing::debug!(
                residue_len = self.buffer.len(),
                "Discarding unterminated record at end of stream"
            );
        }
        self.buffer.clear();
        self.finished = true;
        events
    }

    /// Whether no further events will be produced
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether a `MetricsFinalized` event was produced
    pub fn saw_finalize(&self) -> bool {
        self.finalized
    }

    fn drain_records(&mut self) -> Vec<Event> {
        let mut events = Vec::new();

        while !self.finished {
            let Some(boundary) = self.buffer.find(RECORD_DELIMITER) else {
                break;
            };
            let remaining = self.buffer.split_off(boundary + RECORD_DELIMITER.len());
            let record = std::mem::replace(&mut self.buffer, remaining);

            if let Some(event) = self.decode_record(record.trim()) {
                if event.is_terminal() {
                    self.finished = true;
                    self.buffer.clear();
                }
                if let Event::MetricsFinalized { .. } = event {
                    self.finalized = true;
                }
                events.push(event);
            }
        }

        events
    }

    fn decode_record(&self, record: &str) -> Option<Event> {
        if record.is_empty() {
            return None;
        }
        let Some(data) = record.strip_prefix(DATA_MARKER) else {
            tracing::debug!(record = %record, "Skipping record without data marker");
            return None;
        };

        let payload: WirePayload = match serde_json::from_str(data.trim()) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, record = %record, "Discarding malformed stream record");
                return None;
            }
        };

        match payload {
            WirePayload::Text { content } => content
                .filter(|c| !c.is_empty() && !self.finalized)
                .map(|content| Event::Text { content }),
            WirePayload::NeuroMetricsFinalized { result } => {
                Some(Event::MetricsFinalized { metrics: result })
            }
            WirePayload::Error { detail } => {
                let detail = detail.unwrap_or_else(|| "unspecified backend error".to_string());
                tracing::warn!(detail = %detail, "Backend reported an error in stream");
                Some(Event::Error { detail })
            }
            WirePayload::End => Some(Event::End),
            WirePayload::Unknown => {
                tracing::debug!(record = %record, "Ignoring unrecognized record type");
                None
            }
        }
    }
}

/// Lazy event sequence over a fragment source.
///
/// Fragments are pulled only when no decoded event is waiting, so a finalize
/// record stops reading from the source immediately. A transport error in
/// the middle of the body is treated as end of input.
pub struct EventStream<S> {
    source: S,
    decoder: StreamDecoder,
    pending: VecDeque<Event>,
    source_done: bool,
}

impl<S> EventStream<S>
where
    S: Stream<Item = Result<Vec<u8>, BackendError>> + Unpin,
{
    pub fn new(source: S) -> Self {
        Self {
            source,
            decoder: StreamDecoder::new(),
            pending: VecDeque::new(),
            source_done: false,
        }
    }

    /// Whether a `MetricsFinalized` event occurred
    pub fn saw_finalize(&self) -> bool {
        self.decoder.saw_finalize()
    }
}

impl<S> Stream for EventStream<S>
where
    S: Stream<Item = Result<Vec<u8>, BackendError>> + Unpin,
{
    type Item = Event;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        let this = self.get_mut();

        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(event));
            }
            if this.source_done || this.decoder.is_finished() {
                return Poll::Ready(None);
            }

            match this.source.poll_next_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(fragment))) => {
                    this.pending.extend(this.decoder.push(&fragment));
                }
                Poll::Ready(Some(Err(e))) => {
                    tracing::warn!(error = %e, "Stream interrupted, treating as end of input");
                    this.source_done = true;
                    this.pending.extend(this.decoder.finish());
                }
                Poll::Ready(None) => {
                    this.source_done = true;
                    this.pending.extend(this.decoder.finish());
                }
            }
        }
    }
}
