//! Delivery over WhatsApp Web, driven through a WebDriver browser session.
//!
//! The channel has no programmatic send API: every message is delivered by
//! navigating to a deep link and activating a UI control, with fixed waits in
//! between. See [`channel::WhatsAppChannel`] for the session state machine.

pub mod channel;
pub mod error;
pub mod launcher;
pub mod webdriver;

pub use channel::{ChannelLauncher, ChannelSettings, ChannelState, DeliveryChannel, SendAction};
pub use error::{NotifierError, SendError};
