//! Error taxonomy for the chat pipeline

use thiserror::Error;

/// Banner shown when no session could be built at start-up.
pub const INIT_FAILURE_MESSAGE: &str = "Failed to initialize. Please check your API key.";

/// Banner shown when the user submits while no session exists.
pub const NO_SESSION_MESSAGE: &str = "Chat is not initialized. Cannot send message.";

/// Text written into the AI message (and the banner) when a stream fails.
pub const STREAM_FAILURE_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug, Error)]
pub enum ChatError {
    /// No usable session could be constructed.
    #[error("chat initialization failed: {0}")]
    Initialization(String),

    /// A submit arrived while no session exists.
    #[error("{}", NO_SESSION_MESSAGE)]
    NoSession,

    /// A submit arrived while another send/stream cycle is in flight.
    #[error("a response is already streaming")]
    Busy,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("could not decode stream payload: {0}")]
    Decode(String),
}

impl ChatError {
    /// Text the user sees for this error.
    pub fn user_message(&self) -> &'static str {
        match self {
            ChatError::Initialization(_) => INIT_FAILURE_MESSAGE,
            ChatError::NoSession => NO_SESSION_MESSAGE,
            ChatError::Busy => "Please wait for the current response to finish.",
            ChatError::Http(_) | ChatError::Api { .. } | ChatError::Decode(_) => {
                STREAM_FAILURE_MESSAGE
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_failures_map_to_apology() {
        let err = ChatError::Api {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(err.user_message(), STREAM_FAILURE_MESSAGE);
        assert_eq!(err.to_string(), "api error (500): boom");
    }

    #[test]
    fn session_errors_have_their_own_messages() {
        assert_eq!(ChatError::NoSession.user_message(), NO_SESSION_MESSAGE);
        assert_eq!(ChatError::NoSession.to_string(), NO_SESSION_MESSAGE);
        assert_eq!(
            ChatError::Initialization("x".into()).user_message(),
            INIT_FAILURE_MESSAGE
        );
    }
}
