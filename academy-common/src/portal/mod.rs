//! Client for the academy's GraphQL API.
//!
//! Every call is a POST of `{"query", "variables"}` to `<base_url>/graphql`.
//! Methods build their request up front and return a future that owns it, so
//! the client can be dropped or mutated while calls are in flight.

use core::time::Duration;
use log::{debug, warn};
use reqwest::{
    Client, ClientBuilder, Method, RequestBuilder, StatusCode,
    header::{AUTHORIZATION, HeaderValue},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

pub mod academy;
pub mod boards;

#[derive(Debug)]
pub struct AcademyPortalClient {
    base_url: String,
    access_token: Option<String>,
    client: Client,
}

impl AcademyPortalClient {
    pub fn new(
        base_url: &str,
        access_token: Option<&str>,
        require_https: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let client = ClientBuilder::new()
            .https_only(require_https)
            .timeout(timeout)
            .build()?;

        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self {
            base_url,
            access_token: access_token.map(|s| s.to_string()),
            client,
        })
    }

    pub fn graphql_url(&self) -> String {
        format!("{}/graphql", self.base_url)
    }

    fn graphql_request(
        &self,
        query: &'static str,
        variables: serde_json::Value,
    ) -> Result<RequestBuilder> {
        let request = authenticated_request(
            &self.client,
            Method::POST,
            &self.graphql_url(),
            &self.access_token,
        )?;
        Ok(request.json(&GraphQlRequest { query, variables }))
    }
}

fn authenticated_request(
    client: &Client,
    method: Method,
    url: &str,
    access_token: &Option<String>,
) -> Result<RequestBuilder> {
    let mut request = client.request(method, url);
    if let Some(token) = access_token {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| PortalError::InvalidToken)?;
        request = request.header(AUTHORIZATION, value);
    }
    Ok(request)
}

/// Sends a prepared GraphQL request and pulls `data` out of the reply
async fn send_graphql<T: DeserializeOwned>(
    request: Result<RequestBuilder>,
    operation: &'static str,
) -> Result<T> {
    let response = request?.send().await?;
    let status = response.status();

    if status != StatusCode::OK {
        warn!("academy portal {operation} failed, response: {response:?}");
        let body = response.text().await?;
        return Err(PortalError::Status { status, body });
    }

    let body = response.text().await?;
    debug!("academy portal {operation} replied with {} bytes", body.len());
    parse_graphql_response(&body, operation)
}

fn parse_graphql_response<T: DeserializeOwned>(body: &str, operation: &'static str) -> Result<T> {
    let parsed: GraphQlResponse<T> = serde_json::from_str(body)?;

    if let Some(errors) = parsed.errors.filter(|e| !e.is_empty()) {
        let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
        warn!("academy portal {operation} returned errors: {messages:?}");
        return Err(PortalError::GraphQl(messages));
    }

    parsed.data.ok_or(PortalError::MissingData(operation))
}

#[derive(Debug, Serialize)]
struct GraphQlRequest {
    query: &'static str,
    variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server replied {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("{}", .0.join("; "))]
    GraphQl(Vec<String>),
    #[error("Couldn't decode the response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("The response to {0} had no data")]
    MissingData(&'static str),
    #[error("{0} not found")]
    NotFound(String),
    #[error("The access token can't be sent as a header")]
    InvalidToken,
}

pub type Result<T> = std::result::Result<T, PortalError>;

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    pub(super) fn test_client(token: Option<&str>) -> AcademyPortalClient {
        AcademyPortalClient::new(
            "https://api.academy.example/",
            token,
            true,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    pub(super) fn request_body(request: Result<RequestBuilder>) -> serde_json::Value {
        let request = request.unwrap().build().unwrap();
        let bytes = request.body().unwrap().as_bytes().unwrap();
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn test_graphql_url_trims_slash() {
        let client = test_client(None);
        assert_eq!(client.graphql_url(), "https://api.academy.example/graphql");
    }

    #[test]
    fn test_bearer_header() {
        let client = test_client(Some("abc.def.ghi"));
        let request = client
            .graphql_request("query { me { id } }", json!({}))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.method(), Method::POST);
        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "Bearer abc.def.ghi"
        );

        let client = test_client(None);
        let request = client
            .graphql_request("query { me { id } }", json!({}))
            .unwrap()
            .build()
            .unwrap();
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_invalid_token_rejected() {
        let client = test_client(Some("bad\ntoken"));
        let request = client.graphql_request("query { me { id } }", json!({}));
        assert!(matches!(request, Err(PortalError::InvalidToken)));
    }

    #[test]
    fn test_request_body() {
        let client = test_client(None);
        let body = request_body(
            client.graphql_request("query Q($id: ID!) { x }", json!({"id": "7"})),
        );
        assert_eq!(
            body,
            json!({"query": "query Q($id: ID!) { x }", "variables": {"id": "7"}})
        );
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Ping {
        ping: String,
    }

    #[test]
    fn test_parse_data() {
        let parsed: Ping = parse_graphql_response(r#"{"data":{"ping":"pong"}}"#, "ping").unwrap();
        assert_eq!(
            parsed,
            Ping {
                ping: "pong".to_string()
            }
        );
    }

    #[test]
    fn test_parse_errors_use_raw_messages() {
        let result: Result<Ping> = parse_graphql_response(
            r#"{"data":null,"errors":[{"message":"Not authorised"},{"message":"Board missing","path":["x"]}]}"#,
            "ping",
        );
        match result {
            Err(e @ PortalError::GraphQl(_)) => {
                assert_eq!(e.to_string(), "Not authorised; Board missing")
            }
            other => panic!("Unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_parse_missing_data() {
        let result: Result<Ping> = parse_graphql_response(r#"{"data":null}"#, "ping");
        assert!(matches!(result, Err(PortalError::MissingData("ping"))));

        let result: Result<Ping> =
            parse_graphql_response(r#"{"data":{"ping":"x"},"errors":[]}"#, "ping");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_garbage() {
        let result: Result<Ping> = parse_graphql_response("<html>", "ping");
        assert!(matches!(result, Err(PortalError::Decode(_))));
    }
}
