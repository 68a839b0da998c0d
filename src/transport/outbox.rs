//! Directory-backed transport that writes each message as an `.eml` file.
use super::{render_message, OutboundMessage, Transport};
use crate::error::TransportError;
use std::fs;
use std::path::{Path, PathBuf};

pub struct OutboxTransport {
    dir: PathBuf,
}

impl OutboxTransport {
    pub fn new(dir: &Path) -> Self {
        OutboxTransport {
            dir: dir.to_path_buf(),
        }
    }

    fn next_path(&self, to: &str) -> Result<PathBuf, TransportError> {
        let existing = fs::read_dir(&self.dir)
            .map_err(|err| TransportError::Protocol(format!("read outbox: {err}")))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "eml"))
            .count();
        let slug: String = to
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() || ch == '.' { ch } else { '_' })
            .collect();
        Ok(self.dir.join(format!("{:04}-{slug}.eml", existing + 1)))
    }
}

impl Transport for OutboxTransport {
    fn submit(&mut self, message: &OutboundMessage) -> Result<(), TransportError> {
        fs::create_dir_all(&self.dir)
            .map_err(|err| TransportError::Protocol(format!("create outbox: {err}")))?;
        let path = self.next_path(&message.to)?;
        fs::write(&path, render_message(message))
            .map_err(|err| TransportError::Protocol(format!("write {}: {err}", path.display())))?;
        tracing::debug!(path = %path.display(), "message written to outbox");
        Ok(())
    }

    fn verify(&mut self) -> Result<String, TransportError> {
        fs::create_dir_all(&self.dir)
            .map_err(|err| TransportError::Authentication(format!("outbox not writable: {err}")))?;
        Ok(format!("outbox {}", self.dir.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_numbered_in_submission_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let outbox_dir = dir.path().join("outbox");
        let mut outbox = OutboxTransport::new(&outbox_dir);
        for to in ["alice@x.com", "bob@x.com"] {
            outbox
                .submit(&OutboundMessage {
                    from_name: "Team".to_string(),
                    from_address: "team@realcompany.org".to_string(),
                    to: to.to_string(),
                    subject: "Hello".to_string(),
                    html_body: "<p>hi</p>".to_string(),
                })
                .expect("submit");
        }
        assert!(outbox_dir.join("0001-alice_x.com.eml").is_file());
        assert!(outbox_dir.join("0002-bob_x.com.eml").is_file());
    }
}
