use reqwest::header::CONTENT_TYPE;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{DashboardError, GraphQlErrorEntry, Result, EXPIRED_TOKEN_MARKER};

#[derive(Serialize)]
struct QueryBody<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<&'a Value>,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlErrorEntry>>,
}

/// HTTP client for the identity exchange and the GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct GraphQlClient {
    http: reqwest::Client,
    graphql_url: String,
    auth_url: String,
}

impl GraphQlClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.http_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            graphql_url: config.graphql_url.clone(),
            auth_url: config.auth_url.clone(),
        })
    }

    /// Runs one query. `Ok(None)` means the envelope carried no `data`.
    pub async fn query<T: DeserializeOwned>(
        &self,
        token: &str,
        document: &str,
        variables: Option<&Value>,
    ) -> Result<Option<T>> {
        debug!("POST {}", self.graphql_url);
        let response = self
            .http
            .post(&self.graphql_url)
            .bearer_auth(token)
            .json(&QueryBody {
                query: document,
                variables,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        let envelope: Envelope = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(DashboardError::GraphQl(vec![GraphQlErrorEntry {
                    message: format!("HTTP {status}"),
                    extensions: None,
                }]));
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(errors) = envelope.errors.filter(|errors| !errors.is_empty()) {
            if errors
                .iter()
                .any(|e| e.message.contains(EXPIRED_TOKEN_MARKER))
            {
                return Err(DashboardError::SessionExpired);
            }
            warn!(
                "GraphQL endpoint returned {} error(s): {}",
                errors.len(),
                errors[0].message
            );
            return Err(DashboardError::GraphQl(errors));
        }

        if !status.is_success() {
            warn!("GraphQL endpoint answered HTTP {status} without errors");
            return Err(DashboardError::GraphQl(vec![GraphQlErrorEntry {
                message: format!("HTTP {status}"),
                extensions: None,
            }]));
        }

        match envelope.data {
            None | Some(Value::Null) => Ok(None),
            Some(data) => Ok(Some(serde_json::from_value(data)?)),
        }
    }

    /// Exchanges basic credentials for a bearer token.
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let response = self
            .http
            .post(&self.auth_url)
            .basic_auth(username, Some(password))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let parsed = serde_json::from_str::<Value>(&text).ok();

        if !status.is_success() {
            let reason = parsed
                .as_ref()
                .and_then(|body| {
                    body.get("error")
                        .or_else(|| body.get("message"))
                        .and_then(Value::as_str)
                })
                .unwrap_or("Unknown error");
            return Err(DashboardError::AuthFailure(reason.to_string()));
        }

        let token = match parsed {
            Some(Value::String(token)) => token,
            _ => text.trim().trim_matches('"').to_string(),
        };
        if token.is_empty() {
            return Err(DashboardError::AuthFailure(
                "identity provider returned an empty token".to_string(),
            ));
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GraphQlClient {
        let config = Config::for_base_url(&server.uri(), "unused.json".into());
        GraphQlClient::new(&config).expect("client")
    }

    #[tokio::test]
    async fn query_sends_bearer_token_and_decodes_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("authorization", "Bearer token-abc"))
            .and(body_json(json!({ "query": "{ user { id } }" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": { "user": [{ "id": 5 }] } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let data: Option<Value> = client_for(&server)
            .query("token-abc", "{ user { id } }", None)
            .await
            .unwrap();
        assert_eq!(data, Some(json!({ "user": [{ "id": 5 }] })));
    }

    #[tokio::test]
    async fn query_forwards_variables() {
        let server = MockServer::start().await;
        let variables = json!({ "userID": 5 });
        Mock::given(method("POST"))
            .and(body_json(json!({ "query": "q", "variables": { "userID": 5 } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
            .expect(1)
            .mount(&server)
            .await;

        let data: Option<Value> = client_for(&server)
            .query("t", "q", Some(&variables))
            .await
            .unwrap();
        assert_eq!(data, Some(json!({})));
    }

    #[tokio::test]
    async fn expired_token_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [{ "message": "Could not verify JWT: JWTExpired", "extensions": { "code": "invalid-jwt" } }]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .query::<Value>("old", "{ user { id } }", None)
            .await
            .unwrap_err();
        assert!(err.is_session_expired());
    }

    #[tokio::test]
    async fn other_graphql_errors_pass_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [{ "message": "field 'nope' not found in type: 'user'" }]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .query::<Value>("t", "{ user { nope } }", None)
            .await
            .unwrap_err();
        match err {
            DashboardError::GraphQl(errors) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].message.contains("nope"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_failure_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .query::<Value>("t", "q", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn json_failure_without_errors_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(503).set_body_json(json!({ "message": "service unavailable" })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .query::<Value>("t", "q", None)
            .await
            .unwrap_err();
        match err {
            DashboardError::GraphQl(errors) => assert!(errors[0].message.contains("503")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_uses_basic_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/signin"))
            .and(header("authorization", "Basic YW1pbmE6c2VjcmV0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!("eyJhbGciOi.token")))
            .expect(1)
            .mount(&server)
            .await;

        let token = client_for(&server).login("amina", "secret").await.unwrap();
        assert_eq!(token, "eyJhbGciOi.token");
    }

    #[tokio::test]
    async fn login_failure_surfaces_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/signin"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({ "error": "User does not exist or password incorrect" })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).login("amina", "wrong").await.unwrap_err();
        match err {
            DashboardError::AuthFailure(reason) => {
                assert_eq!(reason, "User does not exist or password incorrect")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_failure_without_body_is_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server).login("amina", "secret").await.unwrap_err();
        assert_eq!(err.to_string(), "login failed: Unknown error");
    }
}
