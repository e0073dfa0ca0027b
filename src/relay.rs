//! # Chat relay
//!
//! Per-session conversation state and the HTTP bridge to the backend agent.
//!
//! The relay owns no reasoning of its own: each user turn is appended to the
//! in-memory [`ChatSession`], forwarded as one blocking request to the
//! backend's `/chat` endpoint, and the returned answer appended as the
//! assistant turn. Trace events come back opaque; they are displayed, never
//! interpreted. Sessions live only for the process lifetime and are never
//! persisted.
//!
//! Failures map onto a small fixed taxonomy ([`RelayError`]) so the
//! interactive loop can show a distinct message per failure class instead of
//! nesting catch blocks:
//!
//! - [`RelayError::ConnectionFailure`] — the backend could not be reached.
//! - [`RelayError::RequestError`] — the request failed or returned non-2xx.
//! - [`RelayError::DecodeError`] — the backend returned invalid JSON.
//! - [`RelayError::Other`] — anything else.
//!
//! A failed turn appends **no** assistant message; the user message stays.

use crossterm::{
    ExecutableCommand,
    style::{Attribute, Color, SetAttribute, SetForegroundColor},
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::io::{Write, stdout};
use std::time::Duration;
use uuid::Uuid;

use tracing::debug;

/// Who authored a message in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One turn in a conversation, kept only in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Conversation state for one interactive session.
///
/// The message list is append-only and reflects chronological turns. Created
/// on session start, dropped when the session ends; never reset automatically.
pub struct ChatSession {
    /// Client-generated identifier sent with every request.
    pub session_id: String,
    /// Ordered user/assistant turns.
    pub messages: Vec<ChatMessage>,
    /// Whether the backend agent should use web search for this session.
    pub web_search_enabled: bool,
}

impl ChatSession {
    /// Start a fresh session with a random id and an empty message list.
    pub fn new(web_search_enabled: bool) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            messages: Vec::new(),
            web_search_enabled,
        }
    }

    fn push(&mut self, role: Role, content: &str) {
        self.messages.push(ChatMessage {
            role,
            content: content.to_string(),
        });
    }
}

/// Failure classes for one relay turn, each with its own user-facing message.
#[derive(Debug)]
pub enum RelayError {
    /// The backend could not be reached at all.
    ConnectionFailure,
    /// The request failed in transit or the backend answered non-2xx.
    RequestError(String),
    /// The backend answered 2xx but the body was not valid JSON.
    DecodeError,
    /// Catch-all for anything outside the classes above.
    Other(String),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::ConnectionFailure => {
                write!(f, "Backend unreachable. Start FastAPI first!")
            }
            RelayError::RequestError(e) => write!(f, "Request error: {e}"),
            RelayError::DecodeError => write!(f, "Backend returned invalid JSON."),
            RelayError::Other(e) => write!(f, "Unexpected Error: {e}"),
        }
    }
}

impl Error for RelayError {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    session_id: &'a str,
    message: &'a str,
    web_search_enabled: bool,
}

/// The backend's answer for one turn.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    /// The assistant's answer text.
    pub answer: String,
    /// Opaque records of the agent's internal reasoning/tool steps.
    #[serde(default)]
    pub trace_events: Vec<serde_json::Value>,
}

/// HTTP client bound to the backend agent's base URL.
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a client for the backend at `base_url`.
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Send one prompt to the backend's chat endpoint.
    ///
    /// # Parameters
    /// - `session`: Supplies the session id and the web-search toggle.
    /// - `message`: The user's prompt for this turn.
    ///
    /// # Returns
    /// The parsed answer plus any trace events.
    ///
    /// # Errors
    /// One [`RelayError`] per failure class; see the module docs.
    pub async fn chat(
        &self,
        session: &ChatSession,
        message: &str,
    ) -> Result<ChatResponse, RelayError> {
        let request = ChatRequest {
            session_id: &session.session_id,
            message,
            web_search_enabled: session.web_search_enabled,
        };
        debug!("Relaying prompt to {}/chat", self.base_url);

        let response = self
            .http
            .post(format!("{}/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    RelayError::ConnectionFailure
                } else {
                    RelayError::RequestError(e.to_string())
                }
            })?;

        let response = response
            .error_for_status()
            .map_err(|e| RelayError::RequestError(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| RelayError::RequestError(e.to_string()))?;

        serde_json::from_str(&body).map_err(|_| RelayError::DecodeError)
    }
}

/// Run one relay turn: append the user message, call the backend, and append
/// the assistant message on success.
///
/// On failure the session keeps the user message but gains no assistant
/// message, so a retry of the next prompt starts from an honest history.
pub async fn send_prompt(
    client: &BackendClient,
    session: &mut ChatSession,
    prompt: &str,
) -> Result<ChatResponse, RelayError> {
    session.push(Role::User, prompt);

    let response = client.chat(session, prompt).await?;

    session.push(Role::Assistant, &response.answer);
    Ok(response)
}

/// Enters interactive conversation mode with the backend agent.
///
/// Reads prompts from stdin until the user types "exit". Each turn blocks on
/// the backend call behind a spinner; the answer is printed in bold blue and
/// trace events, if any, are listed dimmed below it. Relay errors are printed
/// in red with their class-specific message and the loop continues.
///
/// # Parameters
/// - `client: &BackendClient`: Client bound to the backend base URL.
/// - `session: &mut ChatSession`: Conversation state for this run.
///
/// # Returns
/// - `Result<(), Box<dyn Error>>`: Success or a terminal I/O error.
pub async fn interactive_mode(
    client: &BackendClient,
    session: &mut ChatSession,
) -> Result<(), Box<dyn Error>> {
    println!("Chat with the Agent (session {})", session.session_id);
    println!("Type your message, or \"exit\" to quit.\n");

    let mut stdout = stdout();

    loop {
        stdout.execute(SetForegroundColor(Color::Green))?;
        print!("You: ");
        stdout.flush()?;
        stdout.execute(SetForegroundColor(Color::Reset))?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") {
            break;
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
        spinner.set_message("Thinking...");
        spinner.enable_steady_tick(Duration::from_millis(100));

        let result = send_prompt(client, session, input).await;
        spinner.finish_and_clear();

        match result {
            Ok(response) => {
                stdout.execute(SetForegroundColor(Color::Blue))?;
                stdout.execute(SetAttribute(Attribute::Bold))?;
                println!("{}", response.answer);
                stdout.execute(SetAttribute(Attribute::Reset))?;
                stdout.execute(SetForegroundColor(Color::Reset))?;

                if !response.trace_events.is_empty() {
                    stdout.execute(SetAttribute(Attribute::Dim))?;
                    println!("trace:");
                    for event in &response.trace_events {
                        println!("  {event}");
                    }
                    stdout.execute(SetAttribute(Attribute::Reset))?;
                }
                println!();
            }
            Err(e) => {
                stdout.execute(SetForegroundColor(Color::Red))?;
                println!("{e}");
                stdout.execute(SetForegroundColor(Color::Reset))?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;

    #[tokio::test]
    async fn test_send_prompt_appends_user_then_assistant() {
        let server = MockServer::start_async().await;

        let chat_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat")
                    .json_body_partial(r#"{"message": "hello", "webSearchEnabled": false}"#);
                then.status(200)
                    .json_body(serde_json::json!({"answer": "hi", "traceEvents": []}));
            })
            .await;

        let client = BackendClient::new(&server.base_url());
        let mut session = ChatSession::new(false);

        let response = send_prompt(&client, &mut session, "hello").await.unwrap();

        chat_mock.assert_async().await;
        assert_eq!(response.answer, "hi");
        assert!(response.trace_events.is_empty());
        assert_eq!(
            session.messages,
            vec![
                ChatMessage {
                    role: Role::User,
                    content: "hello".to_string()
                },
                ChatMessage {
                    role: Role::Assistant,
                    content: "hi".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_connection_failure() {
        // Nothing listens on this port.
        let client = BackendClient::new("http://127.0.0.1:1");
        let mut session = ChatSession::new(false);

        let result = send_prompt(&client, &mut session, "hello").await;

        let err = result.unwrap_err();
        assert!(matches!(err, RelayError::ConnectionFailure));
        assert_eq!(err.to_string(), "Backend unreachable. Start FastAPI first!");

        // The user message stays; no assistant message is appended.
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat");
                then.status(200).body("not json at all");
            })
            .await;

        let client = BackendClient::new(&server.base_url());
        let mut session = ChatSession::new(false);

        let err = send_prompt(&client, &mut session, "hello").await.unwrap_err();
        assert!(matches!(err, RelayError::DecodeError));
        assert_eq!(err.to_string(), "Backend returned invalid JSON.");
        assert_eq!(session.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_server_error_is_request_error() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat");
                then.status(500);
            })
            .await;

        let client = BackendClient::new(&server.base_url());
        let mut session = ChatSession::new(false);

        let err = send_prompt(&client, &mut session, "hello").await.unwrap_err();
        assert!(matches!(err, RelayError::RequestError(_)));
        assert!(err.to_string().starts_with("Request error: "));
    }

    #[tokio::test]
    async fn test_session_forwards_web_search_toggle() {
        let server = MockServer::start_async().await;

        let chat_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat")
                    .json_body_partial(r#"{"webSearchEnabled": true}"#);
                then.status(200)
                    .json_body(serde_json::json!({"answer": "searched", "traceEvents": [
                        {"step": "web_search", "query": "hello"}
                    ]}));
            })
            .await;

        let client = BackendClient::new(&server.base_url());
        let mut session = ChatSession::new(true);

        let response = send_prompt(&client, &mut session, "hello").await.unwrap();

        chat_mock.assert_async().await;
        assert_eq!(response.trace_events.len(), 1);
    }

    #[test]
    fn test_sessions_get_distinct_ids() {
        let a = ChatSession::new(false);
        let b = ChatSession::new(false);
        assert_ne!(a.session_id, b.session_id);
    }
}
