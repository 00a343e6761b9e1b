//! Transactional email.
//!
//! Sends multipart (text + HTML) mail over SMTP with lettre. When no SMTP
//! host is configured the message is written to the log instead, which is
//! what local development and tests rely on.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

#[derive(Template)]
#[template(path = "email/otp_code.html")]
struct OtpCodeHtml<'a> {
    code: &'a str,
    minutes: i64,
}

#[derive(Template)]
#[template(path = "email/otp_code.txt")]
struct OtpCodeText<'a> {
    code: &'a str,
    minutes: i64,
}

/// One seller order in a confirmation email.
pub struct OrderSummaryLine {
    pub public_id: String,
    pub seller_name: String,
    pub total: String,
}

#[derive(Template)]
#[template(path = "email/order_placed.html")]
struct OrderPlacedHtml<'a> {
    name: &'a str,
    orders: &'a [OrderSummaryLine],
    grand_total: &'a str,
    orders_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_placed.txt")]
struct OrderPlacedText<'a> {
    name: &'a str,
    orders: &'a [OrderSummaryLine],
    grand_total: &'a str,
    orders_url: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl EmailService {
    /// Create the service. Without SMTP settings, mail is only logged.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::InvalidAddress` for a bad sender address and
    /// `EmailError::Smtp` if the relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|_| EmailError::InvalidAddress(config.from.clone()))?;

        let mailer = match &config.smtp {
            Some(smtp) => {
                let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?
                    .port(smtp.port);
                if let (Some(username), Some(password)) = (&smtp.username, &smtp.password) {
                    builder = builder.credentials(Credentials::new(
                        username.clone(),
                        password.expose_secret().to_owned(),
                    ));
                }
                Some(builder.build())
            }
            None => {
                tracing::warn!("SMTP_HOST not set; outgoing email will be logged, not sent");
                None
            }
        };

        Ok(Self { mailer, from })
    }

    /// Whether mail actually leaves the process.
    #[must_use]
    pub const fn is_delivering(&self) -> bool {
        self.mailer.is_some()
    }

    /// Send a one-time sign-in or verification code.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to send or a template fails to render.
    pub async fn send_otp_code(&self, to: &str, code: &str) -> Result<(), EmailError> {
        let minutes = livestall_core::otp::CODE_TTL_MINUTES;
        let html = OtpCodeHtml { code, minutes }.render()?;
        let text = OtpCodeText { code, minutes }.render()?;

        self.send(to, "Your Livestall sign-in code", &text, Some(&html))
            .await
    }

    /// Send an order confirmation covering every seller order of a checkout.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to send or a template fails to render.
    pub async fn send_order_placed(
        &self,
        to: &str,
        name: &str,
        orders: &[OrderSummaryLine],
        grand_total: &str,
        orders_url: &str,
    ) -> Result<(), EmailError> {
        let html = OrderPlacedHtml {
            name,
            orders,
            grand_total,
            orders_url,
        }
        .render()?;
        let text = OrderPlacedText {
            name,
            orders,
            grand_total,
            orders_url,
        }
        .render()?;

        self.send(to, "Your Livestall order is placed", &text, Some(&html))
            .await
    }

    /// Send an email with a plain text body and an optional HTML alternative.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::InvalidAddress` for a bad recipient and
    /// `EmailError::Smtp` if delivery fails.
    pub async fn send(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> Result<(), EmailError> {
        let recipient = to
            .parse::<Mailbox>()
            .map_err(|_| EmailError::InvalidAddress(to.to_owned()))?;

        let Some(mailer) = &self.mailer else {
            tracing::info!(to = %to, subject = %subject, body = %text_body, "Email (not sent, SMTP disabled)");
            return Ok(());
        };

        let builder = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject);

        let email = match html_body {
            Some(html) => builder.multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_owned()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html.to_owned()),
                    ),
            )?,
            None => builder
                .header(ContentType::TEXT_PLAIN)
                .body(text_body.to_owned())?,
        };

        mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn logging_service() -> EmailService {
        EmailService::new(&EmailConfig::default()).unwrap()
    }

    #[test]
    fn test_without_smtp_mail_is_logged() {
        assert!(!logging_service().is_delivering());
    }

    #[test]
    fn test_bad_sender_is_rejected() {
        let config = EmailConfig {
            smtp: None,
            from: "not an address".to_owned(),
        };
        assert!(matches!(
            EmailService::new(&config),
            Err(EmailError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_send_validates_recipient() {
        let service = logging_service();
        assert!(service.send("buyer@example.com", "Hi", "Hello", None).await.is_ok());
        assert!(matches!(
            service.send("nope", "Hi", "Hello", None).await,
            Err(EmailError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_otp_template_contains_code() {
        let text = OtpCodeText {
            code: "482913",
            minutes: 10,
        }
        .render()
        .unwrap();
        assert!(text.contains("482913"));
        assert!(text.contains("10 minutes"));
    }
}
