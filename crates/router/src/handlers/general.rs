//! Courtesy chat. A fixed lookup table, no model call: greetings and
//! sign-offs must answer instantly and identically every time.

use async_trait::async_trait;
use urbanbot_core::{Envelope, RouterError};

use super::Handler;

const GREETING_REPLY: &str =
    "Hello! I am your Smart City AI assistant. How can I help you today?";
const THANKS_REPLY: &str =
    "You're welcome. I'm here to help with any city-related concerns.";
const FAREWELL_REPLY: &str =
    "Thank you for using Smart City Analytics. Have a great day!";
const IDENTITY_REPLY: &str =
    "I am your Smart City AI assistant, designed to help with traffic, AQI, \
     accidents, reports, and civic emails.";
const FALLBACK_REPLY: &str = "How can I assist you with Smart City operations?";

pub fn respond(utterance: &str) -> &'static str {
    let lowered = utterance.to_lowercase();
    let trimmed = lowered.trim();

    match trimmed {
        "hi" | "hello" | "hey" => GREETING_REPLY,
        "thank you" | "thanks" | "ok thanks" => THANKS_REPLY,
        "bye" | "goodbye" | "ok" => FAREWELL_REPLY,
        _ if trimmed.contains("who are you") || trimmed.contains("your name") => IDENTITY_REPLY,
        _ => FALLBACK_REPLY,
    }
}

#[derive(Default)]
pub struct GeneralHandler;

#[async_trait]
impl Handler for GeneralHandler {
    async fn handle(&self, utterance: &str) -> Result<Envelope, RouterError> {
        Ok(Envelope::text(respond(utterance)))
    }
}
