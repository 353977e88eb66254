//! The Zipkin v1 wire model and the encoder from the actor's span tree.

pub(crate) mod annotation;
pub(crate) mod endpoint;
pub(crate) mod span;

pub use annotation::Annotation;
pub use endpoint::Endpoint;
pub use span::{AnnotationType, BinaryAnnotation, Span, Value};

use crate::trace::id::TraceId;
use crate::trace::span::{BinaryValue, Parent, SpanRecord};

/// Convert one completed trace's span records into the protocol span list
/// handed to the reporter. Spans are ordered by start time for stable
/// output.
pub(crate) fn encode(
    trace_id: TraceId,
    debug: bool,
    local_endpoint: &Endpoint,
    records: impl IntoIterator<Item = SpanRecord>,
) -> Vec<Span> {
    let mut records: Vec<SpanRecord> = records.into_iter().collect();
    records.sort_by_key(|record| (record.start_timestamp, record.id.to_hex()));
    records
        .into_iter()
        .map(|record| encode_span(trace_id, debug, local_endpoint, record))
        .collect()
}

fn encode_span(
    trace_id: TraceId,
    debug: bool,
    local_endpoint: &Endpoint,
    record: SpanRecord,
) -> Span {
    let annotations = record
        .annotations
        .into_iter()
        .map(|annotation| {
            Annotation::builder()
                .timestamp(annotation.timestamp)
                .value(annotation.value.as_str())
                .endpoint(
                    annotation
                        .endpoint
                        .unwrap_or_else(|| local_endpoint.clone()),
                )
                .build()
        })
        .collect();

    let binary_annotations = record
        .binary_annotations
        .into_iter()
        .map(|binary| {
            let (value, annotation_type) = encode_value(binary.value);
            BinaryAnnotation::builder()
                .key(binary.key)
                .value(value)
                .annotation_type(annotation_type)
                .endpoint(binary.endpoint.unwrap_or_else(|| local_endpoint.clone()))
                .build()
        })
        .collect();

    Span::builder()
        .trace_id(trace_id.to_hex())
        .id(record.id.to_hex())
        .parent_id(match record.parent {
            Parent::Root => None,
            Parent::Span(id) => Some(id.to_hex()),
        })
        .name(record.name.unwrap_or_else(|| "unknown".to_owned()))
        .timestamp(record.start_timestamp)
        .duration(
            record
                .end_timestamp
                .map(|end| end.saturating_sub(record.start_timestamp)),
        )
        .debug(debug)
        .annotations(annotations)
        .binary_annotations(binary_annotations)
        .build()
}

fn encode_value(value: BinaryValue) -> (Value, AnnotationType) {
    match value {
        BinaryValue::String(v) => (Value::String(v), AnnotationType::String),
        BinaryValue::Bool(v) => (Value::Bool(v), AnnotationType::Bool),
        BinaryValue::I16(v) => (Value::Number(v as i64), AnnotationType::I16),
        BinaryValue::I32(v) => (Value::Number(v as i64), AnnotationType::I32),
        BinaryValue::I64(v) => (Value::Number(v), AnnotationType::I64),
        BinaryValue::Double(v) => (Value::Double(v), AnnotationType::Double),
        BinaryValue::Bytes(v) => (Value::String(base64::encode(v)), AnnotationType::Bytes),
    }
}
