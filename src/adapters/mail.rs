use crate::config::AppConfig;
use crate::domain::model::JobPosting;
use crate::domain::ports::Notifier;
use crate::utils::error::{Result, WatchError};
use crate::utils::validation::validate_required_field;
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tera::{Context, Tera};

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);
const DIGEST_TEMPLATE: &str = "digest.html";

/// Sends the digest through an SMTP relay using STARTTLS.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    subject: String,
    templates: Tera,
}

impl SmtpNotifier {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let username = validate_required_field("mail.username", &config.mail.username)?;
        let password = validate_required_field("mail.password", &config.mail.password)?;
        let recipient = validate_required_field("mail.recipient", &config.mail.recipient)?;
        let from = config.mail_from().unwrap_or(username);

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(config.smtp_host())
            .map_err(|e| WatchError::InvalidConfigValue {
                field: "mail.smtp_host".to_string(),
                value: config.smtp_host().to_string(),
                reason: e.to_string(),
            })?
            .port(config.smtp_port())
            .credentials(Credentials::new(username.clone(), password.clone()))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self {
            transport,
            from: parse_mailbox("mail.from", from)?,
            to: parse_mailbox("mail.recipient", recipient)?,
            subject: config.mail_subject().to_string(),
            templates: digest_templates()?,
        })
    }

    fn build_message(&self, postings: &[JobPosting]) -> Result<Message> {
        let body = render_digest(&self.templates, postings)?;
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(self.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(body)
            .map_err(|e| WatchError::Notification {
                message: format!("Failed to build message: {}", e),
            })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, postings: &[JobPosting]) -> Result<()> {
        let message = self.build_message(postings)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| WatchError::Notification {
                message: e.to_string(),
            })?;
        Ok(())
    }
}

fn parse_mailbox(field: &str, value: &str) -> Result<Mailbox> {
    value
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| WatchError::InvalidConfigValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Registers the digest template. The `.html` name keeps Tera's autoescaping on.
pub fn digest_templates() -> Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_template(DIGEST_TEMPLATE, include_str!("../../templates/digest.html"))
        .map_err(|e| WatchError::Notification {
            message: format!("Invalid digest template: {}", e),
        })?;
    Ok(tera)
}

/// HTML body listing title, skills and link for each posting.
pub fn render_digest(templates: &Tera, postings: &[JobPosting]) -> Result<String> {
    let mut context = Context::new();
    context.insert("jobs", postings);
    templates
        .render(DIGEST_TEMPLATE, &context)
        .map_err(|e| WatchError::Notification {
            message: format!("Failed to render digest: {}", e),
        })
}
