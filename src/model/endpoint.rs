use serde::Serialize;
use std::net::{Ipv4Addr, Ipv6Addr};

/// The network context of an annotation: the host that recorded it, or the
/// remote peer of an `sa`/`ca` address annotation.
#[derive(TypedBuilder, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[builder(setter(into))]
    service_name: String,
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    ipv4: Option<Ipv4Addr>,
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    ipv6: Option<Ipv6Addr>,
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
}

impl Endpoint {
    /// The service name this endpoint belongs to.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

#[cfg(test)]
mod endpoint_serialization_tests {
    use crate::model::endpoint::Endpoint;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_service_name_only() {
        test_json_serialization(
            Endpoint::builder().service_name("upstream").build(),
            "{\"serviceName\":\"upstream\"}",
        );
    }

    #[test]
    fn test_ipv4_omits_ipv6() {
        test_json_serialization(
            Endpoint::builder()
                .service_name("zipline-demo")
                .ipv4(Ipv4Addr::new(192, 168, 0, 1))
                .port(8080)
                .build(),
            "{\"serviceName\":\"zipline-demo\",\"ipv4\":\"192.168.0.1\",\"port\":8080}",
        );
    }

    #[test]
    fn test_ipv6_omits_ipv4() {
        test_json_serialization(
            Endpoint::builder()
                .service_name("zipline-demo")
                .ipv6("2001:db8::1".parse::<Ipv6Addr>().unwrap())
                .build(),
            "{\"serviceName\":\"zipline-demo\",\"ipv6\":\"2001:db8::1\"}",
        );
    }

    fn test_json_serialization(endpoint: Endpoint, desired: &str) {
        let result = serde_json::to_string(&endpoint).unwrap();
        assert_eq!(result, desired.to_owned());
    }
}
