//! Gmail API `users.messages.send` transport.
use super::{render_message, OutboundMessage, Transport};
use crate::error::TransportError;
use crate::google::{http_agent, AccessToken};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use serde::Deserialize;
use std::time::Duration;

const SEND_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";
const PROFILE_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/profile";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    email_address: String,
}

pub struct GmailTransport {
    agent: ureq::Agent,
    token: AccessToken,
}

impl GmailTransport {
    pub fn new(token: AccessToken, timeout: Duration) -> Self {
        GmailTransport {
            agent: http_agent(timeout),
            token,
        }
    }
}

impl Transport for GmailTransport {
    fn submit(&mut self, message: &OutboundMessage) -> Result<(), TransportError> {
        let raw = URL_SAFE.encode(render_message(message).as_bytes());
        let mut response = self
            .agent
            .post(SEND_URL)
            .header("Authorization", self.token.bearer())
            .send_json(serde_json::json!({ "raw": raw }))
            .map_err(request_failure)?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(status_failure(status, body));
        }
        tracing::debug!(to = %message.to, "gmail accepted message");
        Ok(())
    }

    fn verify(&mut self) -> Result<String, TransportError> {
        let mut response = self
            .agent
            .get(PROFILE_URL)
            .header("Authorization", self.token.bearer())
            .call()
            .map_err(request_failure)?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(status_failure(status, body));
        }
        let profile: Profile = response
            .body_mut()
            .read_json()
            .map_err(|err| TransportError::Unexpected(format!("profile response: {err}")))?;
        Ok(profile.email_address)
    }
}

fn request_failure(err: ureq::Error) -> TransportError {
    match &err {
        ureq::Error::Timeout(_)
        | ureq::Error::Io(_)
        | ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound => TransportError::Protocol(err.to_string()),
        _ => TransportError::Unexpected(err.to_string()),
    }
}

fn status_failure(status: u16, body: String) -> TransportError {
    let detail = format!("status {status}: {}", body.trim());
    match status {
        401 | 403 => TransportError::Authentication(detail),
        _ => TransportError::Protocol(detail),
    }
}
