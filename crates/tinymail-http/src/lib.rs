//! HTTPS transport for the tinymail REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tinymail_core::{
    Account, MailApi, MailError, MailboxListing, MessageBody, MessageSummary, OutgoingMessage,
    Result, Session, Uid,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const ACCOUNT_PATH: &str = "/api/account";
const SEND_PATH: &str = "/api/send";

#[derive(Debug, Clone)]
pub struct HttpMailApi {
    client: Client,
    base_url: String,
}

impl HttpMailApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MailError::Transport(format!("HTTP client error: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, session: &Session, path: &str) -> Result<T> {
        let request = self.client.get(self.url(path));
        let bytes = self.execute(session, request, path).await?;
        decode(path, &bytes)
    }

    async fn execute(
        &self,
        session: &Session,
        request: RequestBuilder,
        path: &str,
    ) -> Result<Vec<u8>> {
        log::debug!("request {}", path);
        let resp = request
            .header(AUTHORIZATION, session.auth_header())
            .send()
            .await
            .map_err(|e| MailError::Transport(format!("{}: {}", path, e)))?;
        check_status(path, resp.status())?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| MailError::Transport(format!("{}: {}", path, e)))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl MailApi for HttpMailApi {
    async fn account(&self, session: &Session) -> Result<Account> {
        self.get_json(session, ACCOUNT_PATH).await
    }

    async fn mailbox(&self, session: &Session, name: &str) -> Result<MailboxListing> {
        self.get_json(session, &mailbox_path(name)).await
    }

    async fn messages(
        &self,
        session: &Session,
        mailbox: &str,
        uids: &[Uid],
    ) -> Result<Vec<MessageSummary>> {
        self.get_json(session, &messages_path(mailbox, uids)).await
    }

    async fn message(&self, session: &Session, mailbox: &str, uid: Uid) -> Result<MessageBody> {
        self.get_json(session, &message_path(mailbox, uid)).await
    }

    async fn send(&self, session: &Session, message: &OutgoingMessage) -> Result<()> {
        let request = self.client.post(self.url(SEND_PATH)).json(message);
        self.execute(session, request, SEND_PATH).await?;
        Ok(())
    }
}

fn mailbox_path(name: &str) -> String {
    format!("/api/mailbox/{}", urlencoding::encode(name))
}

fn messages_path(mailbox: &str, uids: &[Uid]) -> String {
    let uids: Vec<String> = uids.iter().map(|uid| uid.to_string()).collect();
    format!("{}/messages/{}", mailbox_path(mailbox), uids.join(","))
}

fn message_path(mailbox: &str, uid: Uid) -> String {
    format!("{}/message/{}", mailbox_path(mailbox), uid)
}

fn check_status(endpoint: &str, status: StatusCode) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    Err(MailError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
    })
}

fn decode<T: DeserializeOwned>(endpoint: &str, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| MailError::Decode {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}
