//! Outbound notification delivery.
//!
//! The scheduler talks to an injected [`NotificationGateway`] rather than a
//! process-wide client handle; [`TwilioGateway`] is the shipped adapter.

pub mod twilio;

pub use twilio::TwilioGateway;

use async_trait::async_trait;

use crate::error::GatewayError;

/// Provider-assigned identifier for a delivered call or text.
pub type DeliveryId = String;

/// A channel capable of reaching a caregiver's phone.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Place a voice call reading the given script.
    async fn place_voice_call(&self, to: &str, script: &str) -> Result<DeliveryId, GatewayError>;

    /// Send a text message.
    async fn send_text(&self, to: &str, body: &str) -> Result<DeliveryId, GatewayError>;
}
