use crate::model::Endpoint;
use crate::trace::id::SpanId;

/// The parent of a span: another span in the same trace, or the root
/// sentinel for a span with no local parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parent {
    /// No parent within this trace.
    Root,
    /// A parent span in this trace.
    Span(SpanId),
}

/// A timed annotation value.
///
/// The standard Zipkin shorthands stay symbolic until encode time so that
/// consumers of span records can tell them apart from free-form values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnnotationValue {
    /// `cs`
    ClientSend,
    /// `cr`
    ClientRecv,
    /// `ss`
    ServerSend,
    /// `sr`
    ServerRecv,
    /// `ws`
    WireSend,
    /// `wr`
    WireRecv,
    /// `timeout`
    Timeout,
    /// `error`
    Error,
    /// Any free-form annotation value, rendered verbatim.
    Custom(String),
}

impl AnnotationValue {
    /// The wire rendering of this value.
    pub fn as_str(&self) -> &str {
        match self {
            AnnotationValue::ClientSend => "cs",
            AnnotationValue::ClientRecv => "cr",
            AnnotationValue::ServerSend => "ss",
            AnnotationValue::ServerRecv => "sr",
            AnnotationValue::WireSend => "ws",
            AnnotationValue::WireRecv => "wr",
            AnnotationValue::Timeout => "timeout",
            AnnotationValue::Error => "error",
            AnnotationValue::Custom(value) => value,
        }
    }
}

impl From<&str> for AnnotationValue {
    fn from(value: &str) -> Self {
        AnnotationValue::Custom(value.to_owned())
    }
}

impl From<String> for AnnotationValue {
    fn from(value: String) -> Self {
        AnnotationValue::Custom(value)
    }
}

/// A typed binary-annotation value.
#[derive(Clone, Debug, PartialEq)]
pub enum BinaryValue {
    /// A UTF-8 string tag.
    String(String),
    /// A boolean tag.
    Bool(bool),
    /// A 16-bit integer tag.
    I16(i16),
    /// A 32-bit integer tag.
    I32(i32),
    /// A 64-bit integer tag.
    I64(i64),
    /// A double-precision float tag.
    Double(f64),
    /// An opaque byte-string tag, base64-rendered on the wire.
    Bytes(Vec<u8>),
}

impl From<&str> for BinaryValue {
    fn from(value: &str) -> Self {
        BinaryValue::String(value.to_owned())
    }
}

impl From<String> for BinaryValue {
    fn from(value: String) -> Self {
        BinaryValue::String(value)
    }
}

impl From<bool> for BinaryValue {
    fn from(value: bool) -> Self {
        BinaryValue::Bool(value)
    }
}

impl From<i16> for BinaryValue {
    fn from(value: i16) -> Self {
        BinaryValue::I16(value)
    }
}

impl From<i32> for BinaryValue {
    fn from(value: i32) -> Self {
        BinaryValue::I32(value)
    }
}

impl From<i64> for BinaryValue {
    fn from(value: i64) -> Self {
        BinaryValue::I64(value)
    }
}

impl From<f64> for BinaryValue {
    fn from(value: f64) -> Self {
        BinaryValue::Double(value)
    }
}

impl From<Vec<u8>> for BinaryValue {
    fn from(value: Vec<u8>) -> Self {
        BinaryValue::Bytes(value)
    }
}

/// The uniform mutation vocabulary applied to a span by the trace actor.
///
/// Deltas arrive attached to `start_span`/`finish_span` events or through
/// `update_span`, and are applied in order at the event's timestamp.
#[derive(Clone, Debug, PartialEq)]
pub enum Delta {
    /// Replace the span name; the last writer wins.
    Name(String),
    /// Mark the span, and by propagation the trace, as async: after
    /// `finish`, the trace stays alive until its spans close or the idle
    /// TTL expires.
    Async,
    /// Append a timed annotation at the event's timestamp.
    Annotate {
        /// The annotation value.
        value: AnnotationValue,
        /// The endpoint to attach; the trace's local endpoint when `None`.
        endpoint: Option<Endpoint>,
    },
    /// Append or replace a keyed tag on the span. A later write to the same
    /// key supersedes the earlier one.
    BinaryAnnotate {
        /// The tag key.
        key: String,
        /// The typed tag value.
        value: BinaryValue,
        /// The endpoint to attach; the trace's local endpoint when `None`.
        endpoint: Option<Endpoint>,
    },
}

impl Delta {
    /// A timed annotation delta with no explicit endpoint.
    pub fn annotate(value: impl Into<AnnotationValue>) -> Delta {
        Delta::Annotate {
            value: value.into(),
            endpoint: None,
        }
    }

    /// A keyed tag delta with no explicit endpoint.
    pub fn binary_annotate(key: impl Into<String>, value: impl Into<BinaryValue>) -> Delta {
        Delta::BinaryAnnotate {
            key: key.into(),
            value: value.into(),
            endpoint: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TimedAnnotation {
    pub(crate) value: AnnotationValue,
    pub(crate) timestamp: u64,
    pub(crate) endpoint: Option<Endpoint>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct BinaryAnnotationRecord {
    pub(crate) key: String,
    pub(crate) value: BinaryValue,
    pub(crate) endpoint: Option<Endpoint>,
}

/// The mutable in-actor representation of one span. Held only by the trace
/// actor; callers never observe it.
#[derive(Clone, Debug)]
pub(crate) struct SpanRecord {
    pub(crate) id: SpanId,
    pub(crate) parent: Parent,
    pub(crate) name: Option<String>,
    pub(crate) start_timestamp: u64,
    pub(crate) end_timestamp: Option<u64>,
    pub(crate) annotations: Vec<TimedAnnotation>,
    pub(crate) binary_annotations: Vec<BinaryAnnotationRecord>,
    pub(crate) is_async: bool,
}

impl SpanRecord {
    pub(crate) fn new(id: SpanId, parent: Parent, name: Option<String>, timestamp: u64) -> Self {
        SpanRecord {
            id,
            parent,
            name,
            start_timestamp: timestamp,
            end_timestamp: None,
            annotations: Vec::new(),
            binary_annotations: Vec::new(),
            is_async: false,
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.end_timestamp.is_none()
    }

    /// Stamp the end timestamp if the span is still open.
    pub(crate) fn close(&mut self, timestamp: u64) {
        if self.end_timestamp.is_none() {
            self.end_timestamp = Some(timestamp);
        }
    }

    pub(crate) fn annotate(
        &mut self,
        value: AnnotationValue,
        timestamp: u64,
        endpoint: Option<Endpoint>,
    ) {
        self.annotations.push(TimedAnnotation {
            value,
            timestamp,
            endpoint,
        });
    }

    /// Append a keyed tag, replacing any earlier tag with the same key in
    /// place.
    pub(crate) fn binary_annotate(
        &mut self,
        key: String,
        value: BinaryValue,
        endpoint: Option<Endpoint>,
    ) {
        let record = BinaryAnnotationRecord {
            key,
            value,
            endpoint,
        };
        match self
            .binary_annotations
            .iter_mut()
            .find(|existing| existing.key == record.key)
        {
            Some(existing) => *existing = record,
            None => self.binary_annotations.push(record),
        }
    }

    /// Apply one delta at the given timestamp.
    pub(crate) fn apply(&mut self, delta: Delta, timestamp: u64) {
        match delta {
            Delta::Name(name) => self.name = Some(name),
            Delta::Async => self.is_async = true,
            Delta::Annotate { value, endpoint } => self.annotate(value, timestamp, endpoint),
            Delta::BinaryAnnotate {
                key,
                value,
                endpoint,
            } => self.binary_annotate(key, value, endpoint),
        }
    }
}
