use async_trait::async_trait;
use eventix_core::identity::Mailer;
use eventix_core::repository::RepoResult;
use eventix_shared::Masked;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

use crate::app_config::MailConfig;

const SUBJECT: &str = "Verify your Eventix account";

/// Delivers verification codes over SMTP with STARTTLS.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: String,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, lettre::transport::smtp::Error> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(Credentials::new(config.username.clone(), config.password.clone()))
            .build();

        Ok(Self { transport, sender: config.sender.clone() })
    }

    fn message(&self, to: &str, code: &str) -> RepoResult<Message> {
        let message = Message::builder()
            .from(self.sender.parse()?)
            .to(to.parse()?)
            .subject(SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(verification_body(code))?;
        Ok(message)
    }
}

fn verification_body(code: &str) -> String {
    format!("Your verification code is: {}\n\nThe code expires shortly; request a new one by registering again.", code)
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification_code(&self, to: &str, code: &str) -> RepoResult<()> {
        let message = self.message(to, code)?;
        match self.transport.send(message).await {
            Ok(_) => {
                info!(to = %Masked(to), "Verification code sent");
                Ok(())
            }
            Err(e) => {
                warn!(to = %Masked(to), "SMTP delivery failed: {}", e);
                Err(e.into())
            }
        }
    }
}

/// Stand-in used when no `[mail]` section is configured: codes go to the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification_code(&self, to: &str, code: &str) -> RepoResult<()> {
        warn!(to = %Masked(to), code, "Mail is not configured; verification code logged instead");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MailConfig {
        MailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            username: "mailer".to_string(),
            password: "pw".to_string(),
            sender: "Eventix <noreply@example.com>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_message_addresses_are_validated() {
        let mailer = SmtpMailer::new(&config()).unwrap();
        assert!(mailer.message("buyer@example.com", "123456").is_ok());
        assert!(mailer.message("not an address", "123456").is_err());
    }

    #[test]
    fn test_body_carries_code() {
        assert!(verification_body("042917").contains("042917"));
    }
}
