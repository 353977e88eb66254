use crate::model::{annotation::Annotation, endpoint::Endpoint};
use serde::Serialize;

/// The wire type of a binary annotation value, rendered uppercase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum AnnotationType {
    Bool,
    Bytes,
    I16,
    I32,
    I64,
    Double,
    String,
}

/// A binary-annotation value in its JSON form. Integer widths collapse to
/// one number representation; the `type` field preserves the original width.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean tags.
    Bool(bool),
    /// Integer tags of any width.
    Number(i64),
    /// Double tags.
    Double(f64),
    /// Strings, and base64-rendered byte tags.
    String(String),
}

/// A keyed tag attached to a span.
#[derive(TypedBuilder, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryAnnotation {
    #[builder(setter(into))]
    key: String,
    value: Value,
    #[serde(rename = "type")]
    annotation_type: AnnotationType,
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<Endpoint>,
}

impl BinaryAnnotation {
    /// The tag key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The tag value in wire form.
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// One span of a completed trace, in the shape the collector ingests.
#[derive(TypedBuilder, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    #[builder(setter(into))]
    trace_id: String,
    #[builder(setter(into))]
    id: String,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<String>,
    #[builder(setter(into))]
    name: String,
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<u64>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<u64>,
    #[builder(default = false)]
    debug: bool,
    #[builder(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    annotations: Vec<Annotation>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    binary_annotations: Vec<BinaryAnnotation>,
}

impl Span {
    /// The hex trace id.
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// The hex span id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The hex parent span id; `None` at the root.
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    /// The span name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start, microseconds since the Unix epoch.
    pub fn timestamp(&self) -> Option<u64> {
        self.timestamp
    }

    /// End minus start, microseconds.
    pub fn duration(&self) -> Option<u64> {
        self.duration
    }

    /// The timed annotations, in recording order.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// The keyed tags, in recording order.
    pub fn binary_annotations(&self) -> &[BinaryAnnotation] {
        &self.binary_annotations
    }
}

#[cfg(test)]
mod span_serialization_tests {
    use super::*;

    #[test]
    fn test_root_span_omits_parent_id() {
        test_json_serialization(
            Span::builder()
                .trace_id("4e441824ec2b6a44ffdc9bb9a6453df3")
                .id("efdc9cd9a1849df3")
                .name("unknown")
                .build(),
            "{\"traceId\":\"4e441824ec2b6a44ffdc9bb9a6453df3\",\"id\":\"efdc9cd9a1849df3\",\"name\":\"unknown\",\"debug\":false}",
        );
    }

    #[test]
    fn test_full_span() {
        test_json_serialization(
            Span::builder()
                .trace_id("ffdc9bb9a6453df3")
                .id("efdc9cd9a1849df3")
                .parent_id(Some("ffdc9bb9a6453df3".to_owned()))
                .name("main")
                .timestamp(1_502_787_600_000_000)
                .duration(Some(150_000))
                .annotations(vec![Annotation::builder()
                    .timestamp(1_502_787_600_000_000)
                    .value("cs")
                    .build()])
                .binary_annotations(vec![BinaryAnnotation::builder()
                    .key("sa")
                    .value(Value::Bool(true))
                    .annotation_type(AnnotationType::Bool)
                    .endpoint(Endpoint::builder().service_name("upstream").build())
                    .build()])
                .build(),
            "{\"traceId\":\"ffdc9bb9a6453df3\",\"id\":\"efdc9cd9a1849df3\",\"parentId\":\"ffdc9bb9a6453df3\",\"name\":\"main\",\"timestamp\":1502787600000000,\"duration\":150000,\"debug\":false,\"annotations\":[{\"timestamp\":1502787600000000,\"value\":\"cs\"}],\"binaryAnnotations\":[{\"key\":\"sa\",\"value\":true,\"type\":\"BOOL\",\"endpoint\":{\"serviceName\":\"upstream\"}}]}",
        );
    }

    #[test]
    fn test_annotation_types_render_uppercase() {
        let cases = vec![
            (AnnotationType::Bool, "\"BOOL\""),
            (AnnotationType::Bytes, "\"BYTES\""),
            (AnnotationType::I16, "\"I16\""),
            (AnnotationType::I32, "\"I32\""),
            (AnnotationType::I64, "\"I64\""),
            (AnnotationType::Double, "\"DOUBLE\""),
            (AnnotationType::String, "\"STRING\""),
        ];
        for (annotation_type, desired) in cases {
            assert_eq!(serde_json::to_string(&annotation_type).unwrap(), desired);
        }
    }

    fn test_json_serialization(span: Span, desired: &str) {
        let result = serde_json::to_string(&span).unwrap();
        assert_eq!(result, desired.to_owned());
    }
}
