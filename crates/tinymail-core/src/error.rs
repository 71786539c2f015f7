use crate::Uid;

pub type Result<T, E = MailError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// The request never completed.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("{endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("malformed response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("unknown mailbox: {0}")]
    UnknownMailbox(String),

    #[error("message {uid} is not loaded in {mailbox}")]
    UnknownMessage { mailbox: String, uid: Uid },
}

impl MailError {
    pub fn status(&self) -> Option<u16> {
        match self {
            MailError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
