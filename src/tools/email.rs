//! Email sending through an authenticated SMTP relay.

use super::{required_str, Tool, ToolOutput};
use crate::config::MailSettings;
use crate::error::Result;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message as MailMessage, Tokio1Executor};
use tracing::info;

/// Sends plain-text mail as the configured account.
pub struct SendEmailTool {
    sender: Option<String>,
    app_password: Option<String>,
    smtp_host: String,
    smtp_port: u16,
}

impl SendEmailTool {
    pub fn new(
        sender: Option<String>,
        app_password: Option<String>,
        mail: &MailSettings,
    ) -> Self {
        Self {
            sender,
            app_password,
            smtp_host: mail.smtp_host.clone(),
            smtp_port: mail.smtp_port,
        }
    }

    async fn send(
        &self,
        sender: &str,
        app_password: &str,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> std::result::Result<(), String> {
        let email = MailMessage::builder()
            .from(
                sender
                    .parse::<Mailbox>()
                    .map_err(|e| format!("invalid sender address: {}", e))?,
            )
            .to(recipient
                .parse::<Mailbox>()
                .map_err(|e| format!("invalid recipient address: {}", e))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| e.to_string())?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.smtp_host)
            .map_err(|e| e.to_string())?
            .port(self.smtp_port)
            .credentials(SmtpCredentials::new(
                sender.to_string(),
                app_password.to_string(),
            ))
            .build();

        mailer.send(email).await.map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[async_trait]
impl Tool for SendEmailTool {
    fn name(&self) -> &str {
        "send_email"
    }

    fn description(&self) -> &str {
        "Send an email: parameters are recipient, subject, and body."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "recipient": {
                    "type": "string",
                    "description": "Recipient email address"
                },
                "subject": {
                    "type": "string",
                    "description": "Subject line"
                },
                "body": {
                    "type": "string",
                    "description": "Plain-text message body"
                }
            },
            "required": ["recipient", "subject", "body"]
        })
    }

    async fn invoke(&self, arguments: serde_json::Value) -> Result<ToolOutput> {
        let recipient = required_str(&arguments, "recipient")?;
        let subject = required_str(&arguments, "subject")?;
        let body = required_str(&arguments, "body")?;

        let (Some(sender), Some(app_password)) =
            (self.sender.as_deref(), self.app_password.as_deref())
        else {
            return Ok(ToolOutput::error(
                "GMAIL_ADDRESS or GMAIL_APP_PASSWORD not set.",
            ));
        };

        match self.send(sender, app_password, recipient, subject, body).await {
            Ok(()) => {
                info!("Email sent to {}", recipient);
                Ok(ToolOutput::text(format!(
                    "Email sent successfully to {}.",
                    recipient
                )))
            }
            Err(e) => Ok(ToolOutput::text(format!("Error sending email: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args() -> serde_json::Value {
        json!({"recipient": "friend@example.com", "subject": "Hi", "body": "Hello!"})
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let tool = SendEmailTool::new(Some("me@example.com".into()), None, &MailSettings::default());
        let output = tool.invoke(args()).await.unwrap();
        assert_eq!(
            output.render(),
            "Error: GMAIL_ADDRESS or GMAIL_APP_PASSWORD not set."
        );
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_reported() {
        let tool = SendEmailTool::new(
            Some("me@example.com".into()),
            Some("secret".into()),
            &MailSettings::default(),
        );
        let output = tool
            .invoke(json!({"recipient": "not an address", "subject": "Hi", "body": "x"}))
            .await
            .unwrap();
        assert!(output
            .render()
            .starts_with("Error sending email: invalid recipient address"));
    }

    #[tokio::test]
    async fn test_missing_body_argument() {
        let tool = SendEmailTool::new(None, None, &MailSettings::default());
        let result = tool
            .invoke(json!({"recipient": "a@b.com", "subject": "Hi"}))
            .await;
        assert!(result.is_err());
    }
}
