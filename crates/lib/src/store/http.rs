//! Remote persistence service client.
//!
//! `POST {base}/collections/{collection}/messages` stores one record;
//! `GET {base}/collections/{collection}/messages?channel=..` lists a conversation.

use super::{validate_collection, ConversationStore, MessageRecord, StoreError};
use async_trait::async_trait;
use serde::Serialize;

#[derive(Clone)]
pub struct HttpStore {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct AddMessageRequest<'a> {
    channel: &'a str,
    #[serde(flatten)]
    record: &'a MessageRecord,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            client: reqwest::Client::new(),
        }
    }

    fn messages_url(&self, collection: &str) -> Result<String, StoreError> {
        validate_collection(collection)?;
        Ok(format!("{}/collections/{}/messages", self.base_url, collection))
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token {
            Some(ref t) => req.bearer_auth(t),
            None => req,
        }
    }
}

#[async_trait]
impl ConversationStore for HttpStore {
    async fn add_message(
        &self,
        collection: &str,
        channel: &str,
        sender: &str,
        text: &str,
    ) -> Result<(), StoreError> {
        let url = self.messages_url(collection)?;
        let record = MessageRecord::new(sender, text);
        let body = AddMessageRequest {
            channel,
            record: &record,
        };
        let res = self.authorize(self.client.post(&url)).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(StoreError::Api(format!("{} {}", status, body)));
        }
        Ok(())
    }

    async fn list_messages(
        &self,
        collection: &str,
        channel: &str,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        let url = self.messages_url(collection)?;
        let res = self
            .authorize(self.client.get(&url))
            .query(&[("channel", channel)])
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(StoreError::Api(format!("{} {}", status, body)));
        }
        Ok(res.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, Query, State},
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    type Received = Arc<Mutex<Vec<(String, serde_json::Value, Option<String>)>>>;

    async fn add(
        State(received): State<Received>,
        Path(collection): Path<String>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> StatusCode {
        if collection == "broken" {
            return StatusCode::SERVICE_UNAVAILABLE;
        }
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        received.lock().await.push((collection, body, auth));
        StatusCode::CREATED
    }

    async fn list(
        State(received): State<Received>,
        Path(collection): Path<String>,
        Query(q): Query<HashMap<String, String>>,
    ) -> Json<Vec<serde_json::Value>> {
        let channel = q.get("channel").cloned().unwrap_or_default();
        let items = received
            .lock()
            .await
            .iter()
            .filter(|(c, b, _)| *c == collection && b["channel"] == channel.as_str())
            .map(|(_, b, _)| b.clone())
            .collect();
        Json(items)
    }

    async fn start_fake_service() -> (String, Received) {
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/collections/:collection/messages", post(add).get(list))
            .with_state(received.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{}/", addr), received)
    }

    #[tokio::test]
    async fn posts_records_and_lists_them() {
        let (base, received) = start_fake_service().await;
        let store = HttpStore::new(base, Some("secret".to_string()));
        store
            .add_message("conversations", "C1", "User", "hello")
            .await
            .unwrap();

        {
            let got = received.lock().await;
            assert_eq!(got.len(), 1);
            let (collection, body, auth) = &got[0];
            assert_eq!(collection, "conversations");
            assert_eq!(body["channel"], "C1");
            assert_eq!(body["sender"], "User");
            assert_eq!(body["text"], "hello");
            assert_eq!(auth.as_deref(), Some("Bearer secret"));
        }

        let listed = store.list_messages("conversations", "C1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].text, "hello");
        assert!(store.list_messages("conversations", "C2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_success_status_is_an_api_error() {
        let (base, _received) = start_fake_service().await;
        let store = HttpStore::new(base, None);
        let err = store
            .add_message("broken", "C1", "User", "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Api(ref m) if m.starts_with("503")));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_request_error() {
        let port = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let store = HttpStore::new(format!("http://127.0.0.1:{}", port), None);
        let err = store
            .add_message("conversations", "C1", "User", "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Request(_)));
    }
}
