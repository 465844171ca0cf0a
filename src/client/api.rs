//! REST Fallback Client
//!
//! Used when a socket is unavailable. Every call hits the same server-side
//! pipeline as the gateway events, so sending through here still broadcasts
//! to connected sockets and emits notifications.

use reqwest::Client;
use uuid::Uuid;

use super::ClientError;
use crate::shared::messaging::{
    ChatMessage, Conversation, ConversationSummary, ListConversationsResponse,
    ListMessagesResponse, SendMessageRequest, SendMessageResponse, StartConversationRequest,
    StartConversationResponse,
};

/// REST client for the messaging endpoints
#[derive(Debug, Clone)]
pub struct MessagingApi {
    base_url: String,
    token: String,
    client: Client,
}

impl MessagingApi {
    /// `base_url` is the server root, e.g. `http://localhost:3000`
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    /// List the caller's conversations, most recent activity first
    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, ClientError> {
        let response = self
            .client
            .get(self.url("/api/conversations"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let body: ListConversationsResponse = Self::check(response).await?.json().await?;
        Ok(body.conversations)
    }

    /// Start (or fetch) the conversation for an advertisement
    pub async fn start_conversation(
        &self,
        advertisement_id: Uuid,
    ) -> Result<Conversation, ClientError> {
        let response = self
            .client
            .post(self.url("/api/conversations"))
            .bearer_auth(&self.token)
            .json(&StartConversationRequest { advertisement_id })
            .send()
            .await?;
        let body: StartConversationResponse = Self::check(response).await?.json().await?;
        Ok(body.conversation)
    }

    /// Full message history of a conversation, oldest first
    pub async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<ChatMessage>, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("/api/conversations/{}/messages", conversation_id)))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let body: ListMessagesResponse = Self::check(response).await?.json().await?;
        Ok(body.messages)
    }

    /// Send a message over HTTP
    pub async fn send_message(
        &self,
        conversation_id: Uuid,
        text: impl Into<String>,
    ) -> Result<ChatMessage, ClientError> {
        let response = self
            .client
            .post(self.url(&format!("/api/conversations/{}/messages", conversation_id)))
            .bearer_auth(&self.token)
            .json(&SendMessageRequest { text: text.into() })
            .send()
            .await?;
        let body: SendMessageResponse = Self::check(response).await?.json().await?;
        Ok(body.message)
    }

    /// Mark a conversation's messages read
    pub async fn mark_read(&self, conversation_id: Uuid) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url(&format!("/api/conversations/{}/read", conversation_id)))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let api = MessagingApi::new("http://localhost:3000/", "token");
        assert_eq!(
            api.url("/api/conversations"),
            "http://localhost:3000/api/conversations"
        );
    }
}
