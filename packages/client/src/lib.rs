#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! HTTP client for the GreenIoT statistics service.
//!
//! One [`Query`] becomes one `POST` of its JSON [`DataRequest`] body to the
//! configured data URL. The reply's `Replies` array is handed back as-is;
//! aggregation is left to the renderer. There is no retry and no timeout:
//! a failed request is reported once and the user resubmits.
//!
//! [`DataRequest`]: giot_vis_query_models::DataRequest

pub mod config;

use async_trait::async_trait;
use giot_vis_query_models::{DataReply, DataReplyContainer, InfoReply, Query, ReplyStatus};
use thiserror::Error;

pub use config::ServiceConfig;

/// Maximum length of the response body kept in [`TransportError::Status`].
const BODY_PREVIEW_LEN: usize = 500;

/// Errors from talking to the statistics service.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, TLS, or body transfer failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Start of the response body.
        body: String,
    },

    /// The response body is not the expected JSON.
    #[error("Malformed reply: {0}")]
    Json(#[from] serde_json::Error),

    /// The response JSON has no `Replies` array.
    #[error("Malformed reply: missing Replies")]
    MissingReplies,

    /// The service understood the request and refused it.
    #[error("Service error {status}: {message}")]
    Service {
        /// Status reported in the reply container.
        status: ReplyStatus,
        /// Message reported alongside it.
        message: String,
    },
}

/// Anything that can answer a [`Query`] with reply entries.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Sends `query` and resolves to its reply entries.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the request or its reply fails.
    async fn send(&self, query: &Query) -> Result<Vec<DataReply>, TransportError>;
}

/// `reqwest`-backed [`QueryService`].
#[derive(Debug, Clone)]
pub struct QueryClient {
    client: reqwest::Client,
    config: ServiceConfig,
}

impl QueryClient {
    /// Builds a client for the given service.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Http`] if the HTTP client cannot be
    /// constructed (e.g. TLS backend initialization fails).
    pub fn new(config: ServiceConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    /// Wraps an existing HTTP client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client, config: ServiceConfig) -> Self {
        Self { client, config }
    }

    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The `POST` that [`QueryService::send`] issues for `query`, with a
    /// JSON body and `Content-Type: application/json`.
    #[must_use]
    pub fn request(&self, query: &Query) -> reqwest::RequestBuilder {
        self.client
            .post(&self.config.data_url)
            .json(&query.to_request())
    }

    /// Fetches the service description.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the request fails, the status is not a
    /// success, or the body is not an `InfoReply`.
    pub async fn info(&self) -> Result<InfoReply, TransportError> {
        let url = self.config.info_url();
        log::debug!("GET {url}");

        let resp = self.client.get(url).send().await?;
        let body = success_body(resp).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl QueryService for QueryClient {
    async fn send(&self, query: &Query) -> Result<Vec<DataReply>, TransportError> {
        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "POST {} {}",
                self.config.data_url,
                serde_json::to_string(&query.to_request()).unwrap_or_default()
            );
        }

        let resp = self.request(query).send().await?;
        let body = success_body(resp).await?;
        let replies = parse_replies(&body)?;

        log::info!(
            "Received {} replies for {} query",
            replies.len(),
            query.mode()
        );
        Ok(replies)
    }
}

async fn success_body(resp: reqwest::Response) -> Result<String, TransportError> {
    let status = resp.status();
    let body = resp.text().await?;

    if status.is_success() {
        Ok(body)
    } else {
        log::warn!("Service answered HTTP {status}");
        Err(TransportError::Status {
            status: status.as_u16(),
            body: body.chars().take(BODY_PREVIEW_LEN).collect(),
        })
    }
}

/// Extracts the reply entries from a response body.
///
/// # Errors
///
/// Returns [`TransportError::Json`] if the body is not valid JSON or the
/// entries do not decode, [`TransportError::MissingReplies`] if there is no
/// `Replies` array, and [`TransportError::Service`] if the reply carries a
/// non-success status.
pub fn parse_replies(body: &str) -> Result<Vec<DataReply>, TransportError> {
    let value: serde_json::Value = serde_json::from_str(body)?;

    if !value.get("Replies").is_some_and(serde_json::Value::is_array) {
        if let Some(failure) = service_failure(&value) {
            return Err(failure);
        }
        return Err(TransportError::MissingReplies);
    }

    let container: DataReplyContainer = serde_json::from_value(value)?;
    let status = container.status();
    if !status.is_success() {
        return Err(TransportError::Service {
            status,
            message: container.message.unwrap_or_default(),
        });
    }

    Ok(container.replies)
}

fn service_failure(value: &serde_json::Value) -> Option<TransportError> {
    let code = i32::try_from(value.get("Status")?.as_i64()?).ok()?;
    let status = ReplyStatus::from_code(code);
    (!status.is_success()).then(|| TransportError::Service {
        status,
        message: value["Message"].as_str().unwrap_or_default().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use giot_vis_query_models::{
        Aggregate, Interval, LatLng, LongLat, PointQuery, RectQuery, Rectangle, TimeInterval,
    };
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    fn point_query() -> Query {
        Query::Point(PointQuery {
            time_range: TimeInterval {
                from: "2017-03-01 00:00:00".to_string(),
                to: "2017-03-02 00:00:00".to_string(),
            },
            points: vec![LongLat {
                longitude: 17.64,
                latitude: 59.86,
            }],
            dataset: "CO2".to_string(),
            operation: Aggregate::Mean,
            interval: Interval::Hour,
        })
    }

    /// Serves exactly one canned HTTP response and hands back the raw
    /// request it received.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/4dialog/", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0_u8; 4096];

            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&received);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if received.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();

            String::from_utf8(received).unwrap()
        });

        (url, handle)
    }

    #[test]
    fn request_posts_json_with_content_type() {
        let client = QueryClient::new(ServiceConfig::default()).unwrap();
        let request = client.request(&point_query()).build().unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().as_str(), config::DEFAULT_DATA_URL);
        assert_eq!(
            request.headers()[reqwest::header::CONTENT_TYPE],
            "application/json"
        );

        let body: serde_json::Value =
            serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(body["Region"]["Type"], "PointRegion");
        assert_eq!(body["Region"]["Points"][0]["Longitude"], 17.64);
        assert_eq!(body["Statistics"]["Operation"], "cNone");
    }

    #[test]
    fn rect_request_body_carries_corners() {
        let client = QueryClient::new(ServiceConfig::default()).unwrap();
        let query = Query::Rect(RectQuery {
            time_range: TimeInterval::default(),
            rectangle: Rectangle::new(LatLng::new(59.865, 17.656), LatLng::new(59.857, 17.620))
                .unwrap(),
            resolution: 100,
            dataset: "NOx".to_string(),
            interval: Interval::Month,
        });
        let request = client.request(&query).build().unwrap();
        let body: serde_json::Value =
            serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();

        assert_eq!(body["Region"]["Type"], "RectRegion");
        assert_eq!(body["Region"]["SouthWest"]["Latitude"], 59.857);
        assert_eq!(body["Region"]["Resolution"], 100);
    }

    #[test]
    fn parses_replies() {
        let replies = parse_replies(
            r#"{"Replies": [{"Position": {"Latitude": 59.86, "Longitude": 17.64}, "Data": [10, 20, 30]}]}"#,
        )
        .unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].data, vec![10.0, 20.0, 30.0]);
        assert!((replies[0].position.latitude - 59.86).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_bodies_are_errors() {
        assert!(matches!(
            parse_replies("<html>oops</html>"),
            Err(TransportError::Json(_))
        ));
        assert!(matches!(
            parse_replies(r#"{"Answers": []}"#),
            Err(TransportError::MissingReplies)
        ));
        assert!(matches!(
            parse_replies(r#"{"Replies": [{"Data": [1]}]}"#),
            Err(TransportError::Json(_))
        ));
    }

    #[test]
    fn service_status_is_reported() {
        let err = parse_replies(r#"{"Status": 3, "Message": "Outside area", "Replies": []}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::Service { status: ReplyStatus::RangeError, ref message } if message == "Outside area"
        ));

        let err = parse_replies(r#"{"Status": 1, "Message": "Bad JSON"}"#).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Service {
                status: ReplyStatus::SyntaxError,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn send_round_trips_over_http() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"Status": 0, "Message": "Success", "Replies": [{"Position": {"Latitude": 59.86, "Longitude": 17.64}, "Data": [2, 4]}]}"#,
        )
        .await;

        let client = QueryClient::new(ServiceConfig::with_data_url(url)).unwrap();
        let replies = client.send(&point_query()).await.unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].data, vec![2.0, 4.0]);

        let raw_request = server.await.unwrap();
        assert!(raw_request.starts_with("POST /4dialog/"));
        assert!(
            raw_request
                .to_ascii_lowercase()
                .contains("content-type: application/json")
        );
        assert!(raw_request.contains(r#""Dataset":"CO2""#));
    }

    #[tokio::test]
    async fn non_success_status_is_a_transport_error() {
        let (url, server) = serve_once("HTTP/1.1 502 Bad Gateway", r#"{"error": "upstream"}"#).await;

        let client = QueryClient::new(ServiceConfig::with_data_url(url)).unwrap();
        let err = client.send(&point_query()).await.unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 502, .. }));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn info_reads_service_description() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"OrganizationInfo": "Uppsala University", "Datasets": ["CO2"], "DataURL": "http://example.invalid/"}"#,
        )
        .await;

        let client = QueryClient::new(ServiceConfig::with_data_url(url)).unwrap();
        let info = client.info().await.unwrap();
        assert_eq!(info.organization_info, "Uppsala University");
        assert_eq!(info.datasets, vec!["CO2".to_string()]);

        let raw_request = server.await.unwrap();
        assert!(raw_request.starts_with("GET /4dialog/"));
    }
}
