use crate::model::Span;
use crate::reporter::Reporter;
use crate::trace::TraceError;
use std::env;

/// Default collector endpoint, overridable with `ZIPLINE_COLLECTOR_ENDPOINT`.
const DEFAULT_COLLECTOR_ENDPOINT: &str = "http://127.0.0.1:9411/api/v1/spans";
const ENV_COLLECTOR_ENDPOINT: &str = "ZIPLINE_COLLECTOR_ENDPOINT";

/// A reporter that posts each batch as JSON to a Zipkin-compatible
/// collector.
///
/// Delivery happens on a spawned task per batch, so `ingest` returns
/// immediately; failures are logged and dropped.
#[derive(Clone, Debug)]
pub struct HttpReporter {
    client: reqwest::Client,
    collector_endpoint: reqwest::Url,
}

impl HttpReporter {
    /// Get a builder to configure an [`HttpReporter`].
    pub fn builder() -> HttpReporterBuilder {
        HttpReporterBuilder::default()
    }
}

/// Builder for the [`HttpReporter`].
#[derive(Clone, Debug)]
pub struct HttpReporterBuilder {
    collector_endpoint: String,
}

impl Default for HttpReporterBuilder {
    fn default() -> Self {
        HttpReporterBuilder {
            collector_endpoint: env::var(ENV_COLLECTOR_ENDPOINT)
                .unwrap_or_else(|_| DEFAULT_COLLECTOR_ENDPOINT.to_owned()),
        }
    }
}

impl HttpReporterBuilder {
    /// Assign the collector endpoint.
    ///
    /// Note: programmatically setting this overrides any value set via the
    /// environment variable `ZIPLINE_COLLECTOR_ENDPOINT`.
    pub fn with_collector_endpoint<T: Into<String>>(mut self, endpoint: T) -> Self {
        self.collector_endpoint = endpoint.into();
        self
    }

    /// Creates a new [`HttpReporter`] from this configuration.
    ///
    /// Returns an error if the endpoint is not a valid URL.
    pub fn build(self) -> Result<HttpReporter, TraceError> {
        let collector_endpoint = reqwest::Url::parse(&self.collector_endpoint)
            .map_err(|err| TraceError::InvalidCollectorEndpoint(err.to_string()))?;
        Ok(HttpReporter {
            client: reqwest::Client::new(),
            collector_endpoint,
        })
    }
}

impl Reporter for HttpReporter {
    fn ingest(&self, batch: Vec<Span>) {
        let body = match serde_json::to_vec(&batch) {
            Ok(body) => body,
            Err(err) => {
                crate::zipline_error!(name: "HttpReporter.Encode.Error", reason = err.to_string());
                return;
            }
        };

        let client = self.client.clone();
        let collector_endpoint = self.collector_endpoint.clone();
        tokio::spawn(async move {
            let result = client
                .post(collector_endpoint)
                .header("content-type", "application/json")
                .body(body)
                .send()
                .await
                .and_then(|response| response.error_for_status());
            if let Err(err) = result {
                crate::zipline_error!(name: "HttpReporter.Upload.Error", reason = err.to_string());
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_of_code_based_config_over_env_for_endpoint() {
        temp_env::with_vars(
            [(ENV_COLLECTOR_ENDPOINT, Some("http://127.0.0.1:1234"))],
            || {
                let builder =
                    HttpReporterBuilder::default().with_collector_endpoint("http://127.0.0.1:2345");
                assert_eq!(builder.collector_endpoint, "http://127.0.0.1:2345");
            },
        );
    }

    #[test]
    fn test_default_endpoint_when_env_missing() {
        temp_env::with_vars([(ENV_COLLECTOR_ENDPOINT, None::<&str>)], || {
            let builder = HttpReporterBuilder::default();
            assert_eq!(builder.collector_endpoint, DEFAULT_COLLECTOR_ENDPOINT);
        });
    }

    #[test]
    fn test_invalid_endpoint_is_a_build_error() {
        assert!(HttpReporterBuilder::default()
            .with_collector_endpoint("not a url")
            .build()
            .is_err());
    }
}
