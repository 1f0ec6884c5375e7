//! New-tool alerts over email and chat webhooks
//!
//! Every channel is optional and configured from the environment. Delivery
//! problems are logged and reported through the `bool` result; they never
//! abort a run.

use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::env;
use tracing::{info, warn};

use crate::types::ToolRecord;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
const TELEGRAM_API: &str = "https://api.telegram.org";

/// Entries listed in a chat message before it is cut short
const DIGEST_LIMIT: usize = 10;

/// Something that can announce newly discovered tools.
///
/// Returns whether at least one alert went out.
pub trait Notifier {
    fn notify(&self, new_tools: &[ToolRecord]) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailConfig {
    pub smtp_user: String,
    pub smtp_pass: String,
    pub email_to: String,
    pub smtp_host: String,
    pub smtp_port: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyConfig {
    pub email: Option<EmailConfig>,
    pub slack_webhook: Option<String>,
    pub discord_webhook: Option<String>,
    /// Bot token and chat id
    pub telegram: Option<(String, String)>,
}

impl NotifyConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any variable lookup; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let email = match (var("SMTP_USER"), var("SMTP_PASS"), var("EMAIL_TO")) {
            (Some(smtp_user), Some(smtp_pass), Some(email_to)) => {
                let smtp_port = match var("SMTP_PORT") {
                    Some(raw) => raw.parse::<u16>().unwrap_or_else(|_| {
                        warn!("Invalid SMTP_PORT '{}', using {}", raw, DEFAULT_SMTP_PORT);
                        DEFAULT_SMTP_PORT
                    }),
                    None => DEFAULT_SMTP_PORT,
                };
                Some(EmailConfig {
                    smtp_user,
                    smtp_pass,
                    email_to,
                    smtp_host: var("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
                    smtp_port,
                })
            }
            _ => None,
        };

        let telegram = match (var("TELEGRAM_BOT_TOKEN"), var("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat)) => Some((token, chat)),
            _ => None,
        };

        Self {
            email,
            slack_webhook: var("SLACK_WEBHOOK_URL"),
            discord_webhook: var("DISCORD_WEBHOOK_URL"),
            telegram,
        }
    }

    pub fn has_channels(&self) -> bool {
        self.email.is_some()
            || self.slack_webhook.is_some()
            || self.discord_webhook.is_some()
            || self.telegram.is_some()
    }
}

/// Sends to every configured channel
pub struct ChannelNotifier {
    config: NotifyConfig,
    telegram_api: String,
}

impl ChannelNotifier {
    pub fn new(config: NotifyConfig) -> Self {
        Self {
            config,
            telegram_api: TELEGRAM_API.to_string(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(NotifyConfig::from_env())
    }

    #[cfg(test)]
    fn with_telegram_api(mut self, base: &str) -> Self {
        self.telegram_api = base.trim_end_matches('/').to_string();
        self
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, new_tools: &[ToolRecord]) -> bool {
        if new_tools.is_empty() {
            info!("No new tools to alert about.");
            return false;
        }

        if !self.config.has_channels() {
            info!("No notification channels configured. Set SMTP_USER, SMTP_PASS and EMAIL_TO, or a webhook.");
            info!("{}", format_digest(new_tools));
            return false;
        }

        let mut sent = false;

        if let Some(ref email) = self.config.email {
            info!("Sending email to {}...", email.email_to);
            match send_email(email, new_tools) {
                Ok(()) => {
                    info!("Email sent successfully");
                    sent = true;
                }
                Err(e) => warn!("Error sending email: {:#}", e),
            }
        }

        let digest = format_digest(new_tools);

        if let Some((ref token, ref chat_id)) = self.config.telegram {
            match send_telegram(&self.telegram_api, token, chat_id, &digest) {
                Ok(()) => sent = true,
                Err(e) => warn!("Telegram notification failed: {:#}", e),
            }
        }

        if let Some(ref webhook) = self.config.slack_webhook {
            match send_slack(webhook, &digest) {
                Ok(()) => sent = true,
                Err(e) => warn!("Slack notification failed: {:#}", e),
            }
        }

        if let Some(ref webhook) = self.config.discord_webhook {
            match send_discord(webhook, &digest) {
                Ok(()) => sent = true,
                Err(e) => warn!("Discord notification failed: {:#}", e),
            }
        }

        sent
    }
}

pub fn email_subject(count: usize) -> String {
    format!("New AI Tools Discovered ({} new tool(s))", count)
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// HTML email body listing each new tool
pub fn format_email_html(new_tools: &[ToolRecord]) -> String {
    let mut body = String::from("<html>\n<body>\n<h2>New AI Tools Discovered!</h2>\n");
    body.push_str(&format!(
        "<p>We found {} new AI tool(s) today:</p>\n<ul>\n",
        new_tools.len()
    ));

    for tool in new_tools {
        body.push_str(&format!(
            "<li>\n<strong><a href=\"{}\">{}</a></strong><br>\nCategory: {}<br>\nDescription: {}<br>\nLaunched: {}\n</li>\n",
            escape_html(or_placeholder(&tool.url, "#")),
            escape_html(or_placeholder(&tool.name, "Unknown Tool")),
            escape_html(or_placeholder(&tool.category, "general")),
            escape_html(or_placeholder(&tool.description, "No description")),
            escape_html(or_placeholder(&tool.launch_date, "Unknown date")),
        ));
    }

    body.push_str("</ul>\n<p><small>This is an automated message from the AI tools tracker.</small></p>\n</body>\n</html>\n");
    body
}

/// Plain-text summary for chat channels
pub fn format_digest(new_tools: &[ToolRecord]) -> String {
    let mut msg = format!("New AI tools discovered ({}):\n", new_tools.len());
    for tool in new_tools.iter().take(DIGEST_LIMIT) {
        msg.push_str(&format!(
            "- {} [{}] {}\n",
            or_placeholder(&tool.name, "Unknown Tool"),
            or_placeholder(&tool.category, "general"),
            tool.url
        ));
    }
    if new_tools.len() > DIGEST_LIMIT {
        msg.push_str(&format!("...and {} more\n", new_tools.len() - DIGEST_LIMIT));
    }
    msg
}

fn send_email(config: &EmailConfig, new_tools: &[ToolRecord]) -> Result<()> {
    let mut builder = Message::builder()
        .from(config.smtp_user.parse::<Mailbox>().context("Invalid SMTP_USER address")?)
        .subject(email_subject(new_tools.len()))
        .header(ContentType::TEXT_HTML);
    for recipient in config.email_to.split(',').map(str::trim).filter(|r| !r.is_empty()) {
        builder = builder.to(recipient
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid EMAIL_TO address '{}'", recipient))?);
    }
    let message = builder.body(format_email_html(new_tools))?;

    let mailer = SmtpTransport::starttls_relay(&config.smtp_host)?
        .port(config.smtp_port)
        .credentials(Credentials::new(config.smtp_user.clone(), config.smtp_pass.clone()))
        .build();
    mailer.send(&message)?;
    Ok(())
}

fn http_client() -> Result<reqwest::blocking::Client> {
    Ok(crate::scrapers::build_client()?)
}

fn send_telegram(api_base: &str, token: &str, chat_id: &str, text: &str) -> Result<()> {
    let url = format!("{}/bot{}/sendMessage", api_base, token);
    http_client()?
        .post(&url)
        .form(&[("chat_id", chat_id), ("text", text)])
        .send()
        .context("Telegram request failed")?
        .error_for_status()
        .context("Telegram rejected the message")?;
    Ok(())
}

fn send_slack(webhook_url: &str, text: &str) -> Result<()> {
    http_client()?
        .post(webhook_url)
        .json(&serde_json::json!({"text": text}))
        .send()?
        .error_for_status()?;
    Ok(())
}

fn send_discord(webhook_url: &str, text: &str) -> Result<()> {
    http_client()?
        .post(webhook_url)
        .json(&serde_json::json!({"content": text}))
        .send()?
        .error_for_status()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::collections::HashMap;

    fn tool(name: &str, url: &str) -> ToolRecord {
        ToolRecord {
            id: name.to_lowercase(),
            name: name.to_string(),
            description: "Summaries & more".to_string(),
            url: url.to_string(),
            category: "content".to_string(),
            primary_category: "content".to_string(),
            source: "producthunt".to_string(),
            launch_date: "2024-05-01".to_string(),
        }
    }

    fn config_from(pairs: &[(&str, &str)]) -> NotifyConfig {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        NotifyConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_email_requires_all_three_variables() {
        let partial = config_from(&[("SMTP_USER", "bot@example.com"), ("EMAIL_TO", "me@example.com")]);
        assert!(partial.email.is_none());
        assert!(!partial.has_channels());

        let full = config_from(&[
            ("SMTP_USER", "bot@example.com"),
            ("SMTP_PASS", "app-password"),
            ("EMAIL_TO", "me@example.com"),
        ]);
        let email = full.email.unwrap();
        assert_eq!(email.smtp_host, DEFAULT_SMTP_HOST);
        assert_eq!(email.smtp_port, DEFAULT_SMTP_PORT);
    }

    #[test]
    fn test_blank_and_invalid_values() {
        let config = config_from(&[
            ("SMTP_USER", "bot@example.com"),
            ("SMTP_PASS", "x"),
            ("EMAIL_TO", "me@example.com"),
            ("SMTP_PORT", "not-a-port"),
            ("SLACK_WEBHOOK_URL", "   "),
            ("TELEGRAM_BOT_TOKEN", "t"),
        ]);
        assert_eq!(config.email.unwrap().smtp_port, DEFAULT_SMTP_PORT);
        assert!(config.slack_webhook.is_none());
        assert!(config.telegram.is_none());
    }

    #[test]
    fn test_email_body_lists_tools() {
        let html = format_email_html(&[tool("Quill", "https://quill.example"), ToolRecord::default()]);
        assert!(html.contains("We found 2 new AI tool(s) today"));
        assert!(html.contains("<a href=\"https://quill.example\">Quill</a>"));
        assert!(html.contains("Description: Summaries &amp; more"));
        assert_eq!(escape_html(r#"<a href='x'>"q"</a>"#), "&lt;a href=&#x27;x&#x27;&gt;&quot;q&quot;&lt;/a&gt;");
        assert!(html.contains("Launched: 2024-05-01"));
        assert!(html.contains("<a href=\"#\">Unknown Tool</a>"));
        assert!(html.contains("Launched: Unknown date"));
        assert_eq!(email_subject(2), "New AI Tools Discovered (2 new tool(s))");
    }

    #[test]
    fn test_digest_is_capped() {
        let tools: Vec<ToolRecord> = (0..13)
            .map(|i| tool(&format!("T{}", i), &format!("https://t{}.example", i)))
            .collect();
        let digest = format_digest(&tools);
        assert!(digest.starts_with("New AI tools discovered (13):"));
        assert_eq!(digest.lines().filter(|l| l.starts_with("- ")).count(), DIGEST_LIMIT);
        assert!(digest.contains("...and 3 more"));
    }

    #[test]
    fn test_nothing_to_send() {
        let notifier = ChannelNotifier::new(NotifyConfig::default());
        assert!(!notifier.notify(&[]));
        assert!(!notifier.notify(&[tool("Quill", "https://quill.example")]));
    }

    #[test]
    fn test_webhooks_deliver_digest() {
        let server = MockServer::start();
        let slack = server.mock(|when, then| {
            when.method(POST).path("/slack");
            then.status(200);
        });
        let telegram = server.mock(|when, then| {
            when.method(POST).path("/botabc/sendMessage");
            then.status(200).body("{\"ok\":true}");
        });

        let config = NotifyConfig {
            slack_webhook: Some(server.url("/slack")),
            telegram: Some(("abc".to_string(), "42".to_string())),
            ..NotifyConfig::default()
        };
        let notifier = ChannelNotifier::new(config).with_telegram_api(&server.base_url());

        assert!(notifier.notify(&[tool("Quill", "https://quill.example")]));
        slack.assert();
        telegram.assert();
    }

    #[test]
    fn test_failed_channel_reports_false() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/discord");
            then.status(500);
        });

        let config = NotifyConfig {
            discord_webhook: Some(server.url("/discord")),
            ..NotifyConfig::default()
        };
        assert!(!ChannelNotifier::new(config).notify(&[tool("Quill", "https://quill.example")]));
    }
}
