use std::sync::Arc;

use anyhow::Context;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::models::{
    LoginRequest, LoginResponse, MessageResponse, StudentRecord, SubmitProfileRequest,
};
use crate::session::SessionStore;

pub const STUDENTS_PATH: &str = "/students";
pub const LOGIN_PATH: &str = "/students/login";
pub const SUBMIT_PATH: &str = "/students/submit";

/// The one HTTP client of the application.
///
/// Attaches `Authorization: Bearer <token>` whenever the session holds a token and maps
/// every failure to [`ApiError`]. No retries, no timeouts, no cancellation.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<SessionStore>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: Arc<SessionStore>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(config.with_credentials)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let (status, body) = self.execute(self.http.get(self.endpoint(path))).await?;
        decode(status, &body)
    }

    pub async fn post<B, T>(&self, path: &str, payload: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.http.post(self.endpoint(path)).json(payload);
        let (status, body) = self.execute(request).await?;
        decode(status, &body)
    }

    pub async fn list_students(&self) -> Result<Vec<StudentRecord>, ApiError> {
        let students: Vec<StudentRecord> = self.get(STUDENTS_PATH).await?;
        debug!(count = students.len(), "fetched students");
        Ok(students)
    }

    /// Posts credentials without touching the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        self.post(LOGIN_PATH, &LoginRequest { email, password }).await
    }

    /// Logs in and, when the server hands back a token, stores it as the session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let response = self.login(email, password).await?;
        match response.token.as_deref().filter(|token| !token.is_empty()) {
            Some(token) => self.session.login(token, email),
            None => warn!("login succeeded without a token; session unchanged"),
        }
        Ok(response)
    }

    /// The submit endpoint may acknowledge with JSON, plain text, or nothing.
    pub async fn submit_profile(
        &self,
        profile: &SubmitProfileRequest,
    ) -> Result<MessageResponse, ApiError> {
        let request = self.http.post(self.endpoint(SUBMIT_PATH)).json(profile);
        let (_, body) = self.execute(request).await?;

        let ack = serde_json::from_slice::<MessageResponse>(&body).unwrap_or_else(|_| {
            let text = String::from_utf8_lossy(&body).trim().to_string();
            MessageResponse {
                message: (!text.is_empty()).then_some(text),
            }
        });
        Ok(ack)
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn execute(&self, request: RequestBuilder) -> Result<(StatusCode, Vec<u8>), ApiError> {
        let request = match self.session.current_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|err| {
            warn!("request failed before a response arrived: {err}");
            ApiError::network()
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|err| {
            warn!(%status, "response body could not be read: {err}");
            ApiError::network()
        })?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&body);
            debug!(%status, "server rejected request");
            return Err(ApiError::from_response_body(status, &body));
        }

        Ok((status, body.to_vec()))
    }
}

fn decode<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|err| {
        warn!(%status, "could not decode response body: {err}");
        ApiError::malformed_body(status)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NETWORK_ERROR_MESSAGE;
    use crate::models::PlatformEntry;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(base_url: &str, session: Arc<SessionStore>) -> ApiClient {
        let config = ClientConfig::new(base_url).unwrap();
        ApiClient::new(&config, session).unwrap()
    }

    fn students_body() -> serde_json::Value {
        json!([
            {"id": 1, "fullName": "Avery Lee", "rollNumber": "21CS001", "year": 2,
             "department": "CSE-DS", "totalProblems": 10},
            {"id": 2, "fullName": "Jules Moreno", "rollNumber": "21CS002", "year": 3,
             "department": "IT", "platformStats": {"totalScore": 50}}
        ])
    }

    #[tokio::test]
    async fn attaches_bearer_token_when_logged_in() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/students"))
            .and(header("Authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(students_body()))
            .expect(1)
            .mount(&server)
            .await;

        let session = Arc::new(SessionStore::in_memory());
        session.login("abc", "a@b.com");
        let client = client_for(&format!("{}/api", server.uri()), session);

        let students = client.list_students().await.unwrap();
        assert_eq!(students.len(), 2);
        assert_eq!(students[1].total_score(), 50);
    }

    #[tokio::test]
    async fn omits_authorization_without_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/students"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Arc::new(SessionStore::in_memory()));
        let students = client.list_students().await.unwrap();
        assert!(students.is_empty());

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn unauthorized_surfaces_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/students/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let session = Arc::new(SessionStore::in_memory());
        let client = client_for(&server.uri(), Arc::clone(&session));

        let err = client.sign_in("a@b.com", "wrong").await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Http {
                status: StatusCode::UNAUTHORIZED,
                message: "Invalid credentials".to_string(),
            }
        );
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn server_error_without_message_gets_generic_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/students"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Arc::new(SessionStore::in_memory()));
        let err = client.list_students().await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(err.message(), "Request failed with status 500");
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        let client = client_for("http://127.0.0.1:1/api", Arc::new(SessionStore::in_memory()));
        let err = client.list_students().await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Network {
                message: NETWORK_ERROR_MESSAGE.to_string(),
            }
        );
    }

    #[tokio::test]
    async fn sign_in_stores_returned_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/students/login"))
            .and(body_partial_json(json!({"email": "a@b.com", "password": "pw"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"message": "Login successful", "token": "tok123"})),
            )
            .mount(&server)
            .await;

        let session = Arc::new(SessionStore::in_memory());
        let client = client_for(&server.uri(), Arc::clone(&session));

        let response = client.sign_in("a@b.com", "pw").await.unwrap();
        assert_eq!(response.message.as_deref(), Some("Login successful"));
        assert_eq!(session.current_token().as_deref(), Some("tok123"));
        assert_eq!(session.identity().as_deref(), Some("a@b.com"));
    }

    #[tokio::test]
    async fn sign_in_without_token_leaves_session_alone() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/students/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Check your inbox"})))
            .mount(&server)
            .await;

        let session = Arc::new(SessionStore::in_memory());
        let client = client_for(&server.uri(), Arc::clone(&session));

        client.sign_in("a@b.com", "pw").await.unwrap();
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn submit_sends_camel_case_payload_and_accepts_plain_ack() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/students/submit"))
            .and(body_partial_json(json!({
                "fullName": "Kiara Patel",
                "rollNumber": "22IT014",
                "year": 3,
                "profilePic": "",
                "platforms": [{"name": "LeetCode", "profileUrl": "https://leetcode.com/u/kiara"}]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_string("Student saved"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Arc::new(SessionStore::in_memory()));
        let profile = SubmitProfileRequest {
            full_name: "Kiara Patel".to_string(),
            roll_number: "22IT014".to_string(),
            email: "kiara@example.com".to_string(),
            password: "secret".to_string(),
            department: "Information Technology".to_string(),
            year: Some(3),
            profile_pic: String::new(),
            platforms: vec![PlatformEntry {
                name: "LeetCode".to_string(),
                profile_url: "https://leetcode.com/u/kiara".to_string(),
            }],
        };

        let ack = client.submit_profile(&profile).await.unwrap();
        assert_eq!(ack.message.as_deref(), Some("Student saved"));
    }

    #[tokio::test]
    async fn bearer_token_rides_on_post_after_sign_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/students/login"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"message": "ok", "token": "abc"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/students/submit"))
            .and(header("Authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "saved"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Arc::new(SessionStore::in_memory()));
        client.sign_in("a@b.com", "pw").await.unwrap();

        let profile = SubmitProfileRequest {
            full_name: "Avery Lee".to_string(),
            roll_number: "21CS001".to_string(),
            email: "a@b.com".to_string(),
            password: "pw".to_string(),
            department: "CSE-DS".to_string(),
            year: Some(2),
            profile_pic: String::new(),
            platforms: Vec::new(),
        };
        let ack = client.submit_profile(&profile).await.unwrap();
        assert_eq!(ack.message.as_deref(), Some("saved"));

        let requests = server.received_requests().await.unwrap();
        let submit = requests
            .iter()
            .find(|request| request.url.path() == "/students/submit")
            .unwrap();
        assert_eq!(
            submit.headers.get("authorization").and_then(|v| v.to_str().ok()),
            Some("Bearer abc")
        );
    }

    #[tokio::test]
    async fn undecodable_success_body_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/students"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Arc::new(SessionStore::in_memory()));
        let err = client.list_students().await.unwrap_err();
        assert_eq!(err, ApiError::malformed_body(StatusCode::OK));
    }
}
