//! Minimal SMTP client for a trusted relay.

use crate::message::MailMessage;
use crate::{Notifier, NotifyError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// SMTP relay configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// Relay host.
    pub host: String,
    /// Relay port.
    pub port: u16,
    /// Name announced in EHLO/HELO.
    pub helo_name: String,
    /// `From` header.
    pub from: String,
    /// `Subject` header.
    pub subject: String,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Upper bound for one whole dialog, connect included.
    pub send_timeout: Duration,
}

impl SmtpConfig {
    /// Configuration with defaults for everything but the relay host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 25,
            helo_name: "localhost".to_string(),
            from: "usrwatch".to_string(),
            subject: "usrwatch".to_string(),
            connect_timeout: Duration::from_secs(10),
            send_timeout: Duration::from_secs(30),
        }
    }
}

/// Delivers messages through an SMTP relay, one connection per message.
///
/// No authentication or TLS is negotiated: the relay is expected to be a
/// local or otherwise trusted MTA.
pub struct SmtpNotifier {
    config: SmtpConfig,
}

impl SmtpNotifier {
    /// Create a notifier for the given relay.
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Relay configuration.
    pub fn config(&self) -> &SmtpConfig {
        &self.config
    }

    async fn dialog(&self, recipient: &str, message: &MailMessage) -> Result<(), NotifyError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| NotifyError::Timeout {
                after: self.config.connect_timeout,
            })?
            .map_err(|source| NotifyError::Connect {
                addr: addr.clone(),
                source,
            })?;
        debug!(%addr, "Connected to mail relay");

        let (read, write) = stream.into_split();
        let mut session = Session {
            reader: BufReader::new(read),
            writer: write,
        };

        session.expect("greeting", &[220]).await?;

        let ehlo = format!("EHLO {}", self.config.helo_name);
        if session.command("EHLO", &ehlo, &[250]).await.is_err() {
            let helo = format!("HELO {}", self.config.helo_name);
            session.command("HELO", &helo, &[250]).await?;
        }

        // The recipient doubles as envelope sender.
        session
            .command("MAIL FROM", &format!("MAIL FROM:<{recipient}>"), &[250])
            .await?;
        session
            .command("RCPT TO", &format!("RCPT TO:<{recipient}>"), &[250, 251])
            .await?;
        session.command("DATA", "DATA", &[354]).await?;
        session.write_raw(&message.to_smtp_data()).await?;
        session.expect("end of data", &[250]).await?;

        if let Err(e) = session.command("QUIT", "QUIT", &[221]).await {
            debug!(error = %e, "Relay did not acknowledge QUIT");
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, recipient: &str, body: &str) -> Result<(), NotifyError> {
        let message = MailMessage::new(&self.config.from, recipient, &self.config.subject, body);

        tokio::time::timeout(self.config.send_timeout, self.dialog(recipient, &message))
            .await
            .map_err(|_| NotifyError::Timeout {
                after: self.config.send_timeout,
            })??;

        info!(recipient, relay = %self.config.host, "Mail delivered to relay");
        Ok(())
    }
}

struct Session {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Session {
    async fn command(&mut self, stage: &'static str, line: &str, accept: &[u16]) -> Result<Reply, NotifyError> {
        self.write_raw(&format!("{line}\r\n")).await?;
        self.expect(stage, accept).await
    }

    async fn write_raw(&mut self, data: &str) -> Result<(), NotifyError> {
        self.writer.write_all(data.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn expect(&mut self, stage: &'static str, accept: &[u16]) -> Result<Reply, NotifyError> {
        let reply = self.read_reply().await?;
        if accept.contains(&reply.code) {
            Ok(reply)
        } else {
            Err(NotifyError::Rejected {
                stage,
                code: reply.code,
                message: reply.text,
            })
        }
    }

    /// Read one possibly multi-line reply (`250-...` continuation lines).
    async fn read_reply(&mut self) -> Result<Reply, NotifyError> {
        let mut text = String::new();
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line).await? == 0 {
                return Err(NotifyError::Protocol(
                    "connection closed by relay".to_string(),
                ));
            }

            let line = line.trim_end_matches(['\r', '\n']);
            let (code, last, rest) = parse_reply_line(line)?;
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(rest);

            if last {
                return Ok(Reply { code, text });
            }
        }
    }
}

#[derive(Debug)]
struct Reply {
    code: u16,
    text: String,
}

fn parse_reply_line(line: &str) -> Result<(u16, bool, &str), NotifyError> {
    let malformed = || NotifyError::Protocol(format!("malformed reply: {line:?}"));

    let code = line
        .get(..3)
        .and_then(|c| c.parse::<u16>().ok())
        .ok_or_else(malformed)?;
    let last = match line.as_bytes().get(3) {
        None | Some(b' ') => true,
        Some(b'-') => false,
        Some(_) => return Err(malformed()),
    };
    let rest = line.get(4..).unwrap_or("");
    Ok((code, last, rest))
}
