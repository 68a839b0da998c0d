//! Message bodies for the three campaign actions.
//!
//! Rendering is plain placeholder substitution over the bundled templates;
//! the only branching is the thank-you tone picked from the response value.
use crate::config::CampaignConfig;
use crate::reconcile::{Action, Candidate};
use crate::responses::ResponseRecord;
use crate::roster::Contact;
use crate::templates;
use crate::transport::OutboundMessage;
use anyhow::{Context, Result};
use url::Url;

/// Thank-you wording, keyed off the free-text response value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseTone {
    Support,
    Decline,
    Other,
}

impl ResponseTone {
    pub fn from_value(value: &str) -> Self {
        let value = value.trim().to_lowercase();
        if value.contains("yes") {
            ResponseTone::Support
        } else if value.contains("no") {
            ResponseTone::Decline
        } else {
            ResponseTone::Other
        }
    }

    pub fn subject(self) -> &'static str {
        match self {
            ResponseTone::Support => "Thank You for Your Support",
            ResponseTone::Decline | ResponseTone::Other => "Thank You for Your Feedback",
        }
    }

    fn message(self) -> &'static str {
        match self {
            ResponseTone::Support => {
                "Thank you so much for your support! Your positive response means a great deal \
                 to our grant initiative. We truly appreciate you taking the time to respond."
            }
            ResponseTone::Decline => {
                "Thank you for taking the time to respond. We appreciate your time and consideration, \
                 and we understand that not everyone can participate. Your feedback is valuable to us."
            }
            ResponseTone::Other => {
                "Thank you for your response! We appreciate you taking the time to provide feedback. \
                 Your input helps us understand the community's perspective on this initiative."
            }
        }
    }
}

pub struct MessageRenderer<'a> {
    config: &'a CampaignConfig,
}

impl<'a> MessageRenderer<'a> {
    pub fn new(config: &'a CampaignConfig) -> Self {
        MessageRenderer { config }
    }

    /// Render the message `action` sends to `candidate`.
    pub fn render(&self, action: Action, candidate: &Candidate) -> Result<OutboundMessage> {
        match action {
            Action::Send => self.initial(&candidate.contact),
            Action::Remind => self.reminder(&candidate.contact),
            Action::Thank => Ok(self.thank_you(&candidate.contact, candidate.response.as_ref())),
        }
    }

    /// Form link with the contact's name pre-filled.
    pub fn form_url(&self, name: &str) -> Result<String> {
        let mut url = Url::parse(&self.config.form_base_url)
            .with_context(|| format!("parse form_base_url {}", self.config.form_base_url))?;
        url.query_pairs_mut()
            .append_pair("usp", "pp_url")
            .append_pair(&format!("entry.{}", self.config.name_field_id.trim()), name);
        Ok(url.into())
    }

    pub fn initial(&self, contact: &Contact) -> Result<OutboundMessage> {
        let form_url = self.form_url(&contact.name)?;
        let image = if self.config.image_url.trim().is_empty() {
            String::new()
        } else {
            format!(
                "<img src=\"{}\" alt=\"Grant Information\" width=\"540\" style=\"max-width: 100%; height: auto; border-radius: 4px; display: block; margin: 20px 0;\">",
                escape_html(self.config.image_url.trim())
            )
        };
        let body = templates::INITIAL_HTML
            .replace("{{name}}", &escape_html(&contact.name))
            .replace("{{image}}", &image)
            .replace("{{form_url}}", &escape_html(&form_url))
            .replace("{{deadline}}", &escape_html(&self.config.grant_deadline));
        Ok(self.message(contact, self.config.subject.clone(), body))
    }

    pub fn reminder(&self, contact: &Contact) -> Result<OutboundMessage> {
        let form_url = self.form_url(&contact.name)?;
        let body = templates::REMINDER_HTML
            .replace("{{name}}", &escape_html(&contact.name))
            .replace("{{form_url}}", &escape_html(&form_url))
            .replace("{{deadline}}", &escape_html(&self.config.grant_deadline));
        let subject = format!(
            "Reminder: Grant Support Needed by {}",
            self.config.grant_deadline.trim()
        );
        Ok(self.message(contact, subject, body))
    }

    pub fn thank_you(&self, contact: &Contact, response: Option<&ResponseRecord>) -> OutboundMessage {
        let tone = ResponseTone::from_value(
            response
                .map(|record| record.response_value.as_str())
                .unwrap_or_default(),
        );
        let body = templates::THANK_YOU_HTML
            .replace("{{name}}", &escape_html(&contact.name))
            .replace("{{message}}", tone.message())
            .replace("{{sender_name}}", &escape_html(&self.config.sender_name));
        self.message(contact, tone.subject().to_string(), body)
    }

    fn message(&self, contact: &Contact, subject: String, html_body: String) -> OutboundMessage {
        OutboundMessage {
            from_name: self.config.sender_name.clone(),
            from_address: self.config.sender_email.clone(),
            to: contact.email_text().to_string(),
            subject,
            html_body,
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
