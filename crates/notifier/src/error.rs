use thiserror::Error;

use crate::channel::ChannelState;

/// Failures talking to the browser or driving the channel session.
#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebDriver error ({error}): {message}")]
    WebDriver { error: String, message: String },

    #[error("Unexpected WebDriver response: {0}")]
    Protocol(String),

    #[error("Channel is {found}, expected {expected}")]
    InvalidState {
        expected: ChannelState,
        found: ChannelState,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single recipient could not be reached.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Could not open chat: {0}")]
    Navigation(NotifierError),

    #[error("No send control available (button: {primary}; composer: {fallback})")]
    NoSendControl {
        primary: NotifierError,
        fallback: NotifierError,
    },

    #[error("Channel is {0}, cannot send")]
    InvalidState(ChannelState),
}
