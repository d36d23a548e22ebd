use std::time::Duration;

use toolgate_common::FromMessage;

/// Failures talking to a provider over a transport.
#[derive(Debug, thiserror::Error)]
pub enum McpTransportError {
    #[error("MCP server requires authorization")]
    Unauthorized { www_authenticate: Option<String> },
    #[error("MCP error on '{method}': code={code} message={message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },
    #[error("MCP server returned HTTP {status} for '{method}': {body}")]
    Http {
        method: String,
        status: u16,
        body: String,
    },
    #[error("MCP transport closed while waiting for '{method}'")]
    Closed { method: String },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    Transport(#[from] McpTransportError),
    #[error(transparent)]
    Catalog(#[from] toolgate_common::Error),
    #[error("Tool not found for agent")]
    ToolNotFound { agent_id: String, tool: String },
    #[error("No execution provider configured for tool")]
    NoExecutionProvider { tool: String },
    #[error("No credential provider available for caller's team")]
    NoDynamicCredential { agent_id: String },
    #[error("No HTTP endpoint URL found")]
    NoHttpEndpoint { provider_id: String },
    #[error("MCP call timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
    #[error("MCP call cancelled")]
    Cancelled,
    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

toolgate_common::impl_context!();

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_messages() {
        assert_eq!(
            Error::NoHttpEndpoint {
                provider_id: "p".into()
            }
            .to_string(),
            "No HTTP endpoint URL found"
        );
        assert_eq!(
            Error::ToolNotFound {
                agent_id: "a".into(),
                tool: "t".into()
            }
            .to_string(),
            "Tool not found for agent"
        );
        assert_eq!(
            Error::Timeout(Duration::from_millis(1500)).to_string(),
            "MCP call timed out after 1.5s"
        );
    }

    #[test]
    fn context_wraps_message() {
        let err = None::<()>.context("no result").unwrap_err();
        assert_eq!(err.to_string(), "no result");
    }
}
