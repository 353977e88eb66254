use crate::model::endpoint::Endpoint;
use serde::Serialize;

/// A timestamped event attached to a span.
#[derive(TypedBuilder, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    timestamp: u64,
    #[builder(setter(into))]
    value: String,
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<Endpoint>,
}

impl Annotation {
    /// The annotation value, e.g. `cs` or a free-form string.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Microseconds since the Unix epoch.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use crate::model::annotation::Annotation;
    use crate::model::endpoint::Endpoint;

    #[test]
    fn test_without_endpoint() {
        test_json_serialization(
            Annotation::builder()
                .timestamp(1_502_787_600_000_000)
                .value("cs")
                .build(),
            "{\"timestamp\":1502787600000000,\"value\":\"cs\"}",
        );
    }

    #[test]
    fn test_with_endpoint() {
        test_json_serialization(
            Annotation::builder()
                .timestamp(1_502_787_600_000_000)
                .value("sr")
                .endpoint(Endpoint::builder().service_name("api").build())
                .build(),
            "{\"timestamp\":1502787600000000,\"value\":\"sr\",\"endpoint\":{\"serviceName\":\"api\"}}",
        );
    }

    fn test_json_serialization(annotation: Annotation, desired: &str) {
        let result = serde_json::to_string(&annotation).unwrap();
        assert_eq!(result, desired.to_owned());
    }
}
