//! Mail message framing.

use chrono::{DateTime, Local};

/// A plain-text mail message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    /// `From` header.
    pub from: String,
    /// `To` header.
    pub to: String,
    /// `Subject` header.
    pub subject: String,
    /// `Date` header value (RFC 2822).
    pub date: String,
    /// Body, with `\n` line endings.
    pub body: String,
}

impl MailMessage {
    /// Create a message dated now.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::dated(from, to, subject, body, &Local::now())
    }

    /// Create a message with an explicit date.
    pub fn dated(
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        date: &DateTime<Local>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            subject: subject.into(),
            date: date.to_rfc2822(),
            body: body.into(),
        }
    }

    /// Render for the SMTP `DATA` phase.
    ///
    /// Line endings become CRLF, lines starting with `.` are dot-stuffed and
    /// the terminating `.` line is appended.
    pub fn to_smtp_data(&self) -> String {
        let mut out = String::with_capacity(self.body.len() + 256);
        out.push_str(&format!("From: {}\r\n", self.from));
        out.push_str(&format!("To: {}\r\n", self.to));
        out.push_str(&format!("Subject: {}\r\n", self.subject));
        out.push_str(&format!("Date: {}\r\n", self.date));
        out.push_str("\r\n");

        for line in self.body.lines() {
            if line.starts_with('.') {
                out.push('.');
            }
            out.push_str(line);
            out.push_str("\r\n");
        }

        out.push_str(".\r\n");
        out
    }
}
