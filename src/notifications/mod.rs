//! Outgoing mail and the scheduled notification jobs built on it.

pub mod anniversary;
pub mod failed_jobs;

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::error::{HrError, HrResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Mail {
    pub recipients: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_mail(&self, mail: &Mail) -> HrResult<()>;
}

pub type SharedNotifier = Arc<dyn Notifier>;

pub struct EmailNotifier {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailNotifier {
    pub fn new(config: &SmtpConfig) -> HrResult<Self> {
        let from = config
            .from_email
            .parse::<Mailbox>()
            .map_err(|e| HrError::Mail(format!("Invalid from address: {}", e)))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)
            .map_err(|e| HrError::Mail(format!("SMTP relay error: {}", e)))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { from, transport })
    }
}

/// Escapes text for interpolation into a mail body.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Outcome of sending a batch where each mail is tried independently.
#[derive(Debug, Default)]
pub struct Delivery {
    pub sent: usize,
    pub failures: Vec<String>,
}

/// Sends every mail; a failing one does not stop the rest.
pub async fn deliver_all(notifier: &dyn Notifier, mails: &[Mail]) -> Delivery {
    let mut delivery = Delivery::default();
    for mail in mails {
        match notifier.send_mail(mail).await {
            Ok(()) => delivery.sent += 1,
            Err(e) => {
                tracing::error!(error = %e, recipients = ?mail.recipients, "Mail not delivered");
                delivery
                    .failures
                    .push(format!("{}: {}", mail.recipients.join(", "), e));
            }
        }
    }
    delivery
}

fn strip_tags(html: &str) -> String {
    let text = html.replace("<br>", "\n").replace("</p>", "\n").replace("</li>", "\n");
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send_mail(&self, mail: &Mail) -> HrResult<()> {
        if mail.recipients.is_empty() {
            return Err(HrError::Mail("No recipients".to_string()));
        }

        let mut builder = Message::builder().from(self.from.clone()).subject(&mail.subject);
        for recipient in &mail.recipients {
            let to = recipient
                .parse::<Mailbox>()
                .map_err(|e| HrError::Mail(format!("Invalid address {}: {}", recipient, e)))?;
            builder = builder.to(to);
        }

        let message = builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(strip_tags(&mail.html_body)),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(mail.html_body.clone()),
                    ),
            )
            .map_err(|e| HrError::Mail(format!("Failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| HrError::Mail(format!("Failed to send email: {}", e)))?;

        tracing::info!(subject = %mail.subject, recipients = mail.recipients.len(), "Mail sent");
        Ok(())
    }
}

/// Used when no SMTP relay is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_mail(&self, mail: &Mail) -> HrResult<()> {
        tracing::info!(
            subject = %mail.subject,
            recipients = ?mail.recipients,
            "SMTP not configured, mail only logged"
        );
        Ok(())
    }
}

pub fn build_notifier(smtp: Option<&SmtpConfig>) -> HrResult<SharedNotifier> {
    match smtp {
        Some(config) => Ok(Arc::new(EmailNotifier::new(config)?)),
        None => {
            tracing::warn!("SMTP_SERVER not set, outgoing mail is logged instead of sent");
            Ok(Arc::new(LogNotifier))
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Captures mails instead of sending them.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<Mail>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_mail(&self, mail: &Mail) -> HrResult<()> {
            self.sent.lock().unwrap().push(mail.clone());
            Ok(())
        }
    }

    /// Rejects mails addressed to `bad_address`, records the rest.
    pub struct RejectingNotifier {
        pub bad_address: String,
        pub sent: Mutex<Vec<Mail>>,
    }

    impl RejectingNotifier {
        pub fn new(bad_address: &str) -> Self {
            Self {
                bad_address: bad_address.to_string(),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Notifier for RejectingNotifier {
        async fn send_mail(&self, mail: &Mail) -> HrResult<()> {
            if mail.recipients.iter().any(|r| r == &self.bad_address) {
                return Err(HrError::Mail(format!("Invalid address {}", self.bad_address)));
            }
            self.sent.lock().unwrap().push(mail.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{RecordingNotifier, RejectingNotifier};
    use super::*;

    fn mail_to(address: &str) -> Mail {
        Mail {
            recipients: vec![address.to_string()],
            subject: "Hi".into(),
            html_body: "<p>x</p>".into(),
        }
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<script>"O'Neil" & co</script>"#),
            "&lt;script&gt;&quot;O&#39;Neil&quot; &amp; co&lt;/script&gt;"
        );
        assert_eq!(escape_html("Jane Doe"), "Jane Doe");
    }

    #[actix_web::test]
    async fn one_bad_address_does_not_stop_the_batch() {
        let notifier = RejectingNotifier::new("not an address");
        let mails = [
            mail_to("hr@acme.test"),
            mail_to("not an address"),
            mail_to("lead@acme.test"),
        ];
        let delivery = deliver_all(&notifier, &mails).await;

        assert_eq!(delivery.sent, 2);
        assert_eq!(delivery.failures.len(), 1);
        assert!(delivery.failures[0].starts_with("not an address"));
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.as_slice(), &[mails[0].clone(), mails[2].clone()]);
    }

    #[test]
    fn plain_text_drops_markup() {
        assert_eq!(
            strip_tags("<p>Hello</p><ul><li>Jane</li></ul>Bye<br>now"),
            "Hello\nJane\nBye\nnow"
        );
    }

    #[actix_web::test]
    async fn recording_notifier_captures_mail() {
        let notifier = RecordingNotifier::default();
        let mail = Mail {
            recipients: vec!["hr@acme.test".into()],
            subject: "Hi".into(),
            html_body: "<p>x</p>".into(),
        };
        notifier.send_mail(&mail).await.unwrap();
        assert_eq!(notifier.sent.lock().unwrap().as_slice(), &[mail]);
    }

    #[actix_web::test]
    async fn log_notifier_accepts_everything() {
        let mail = Mail {
            recipients: vec![],
            subject: "Hi".into(),
            html_body: String::new(),
        };
        assert!(LogNotifier.send_mail(&mail).await.is_ok());
    }
}
