//! Error classification for FTP operations.

use std::io;

use suppaftp::types::Response;

/// Errors produced while talking to the FTP server.
#[derive(Debug, thiserror::Error)]
pub enum FtpError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("connection timed out")]
    Timeout,

    #[error("connection closed by server")]
    Closed,

    /// 4xx reply: the server asks to try again later.
    #[error("transient server error {code}: {text}")]
    Transient { code: u16, text: String },

    /// 5xx reply: the command was refused.
    #[error("permanent server error {code}: {text}")]
    Permanent { code: u16, text: String },

    #[error("unexpected reply {code}: {text}")]
    UnexpectedReply { code: u16, text: String },

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl FtpError {
    /// Classifies a reply that did not match the expected codes.
    pub fn from_reply(code: u16, text: impl Into<String>) -> Self {
        let text = text.into();
        match code {
            400..=499 => Self::Transient { code, text },
            500..=599 => Self::Permanent { code, text },
            _ => Self::UnexpectedReply { code, text },
        }
    }

    /// Returns true for timeouts and 4xx replies.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transient { .. })
    }
}

impl From<suppaftp::FtpError> for FtpError {
    fn from(e: suppaftp::FtpError) -> Self {
        match e {
            suppaftp::FtpError::ConnectionError(e) => match e.kind() {
                io::ErrorKind::TimedOut => Self::Timeout,
                io::ErrorKind::UnexpectedEof
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe => Self::Closed,
                _ => Self::Io(e),
            },
            suppaftp::FtpError::UnexpectedResponse(response) => {
                let (code, text) = split_response(&response);
                Self::from_reply(code, text)
            }
            other => Self::Protocol(other.to_string()),
        }
    }
}

/// Extracts the numeric code and the text of a reply.
///
/// Codes unknown to `suppaftp` come back as status 0, so the code is read
/// from the reply line in that case.
fn split_response(response: &Response) -> (u16, String) {
    let line = response.as_string().unwrap_or_default();
    let (prefix, rest) = match line.get(..3) {
        Some(prefix) if prefix.bytes().all(|b| b.is_ascii_digit()) => {
            (prefix.parse::<u16>().ok(), line[3..].trim_start_matches([' ', '-']))
        }
        _ => (None, line.as_str()),
    };
    let code = match u16::try_from(response.status.code()) {
        Ok(code) if code != 0 => code,
        _ => prefix.unwrap_or(0),
    };
    (code, rest.to_string())
}
