use std::time::Duration;

use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};
use metrics::counter;

pub const DIGEST_SUBJECT: &str = "您的新闻摘要";
pub const DEFAULT_FROM: &str = "News Digest <noreply@example.com>";
pub const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Wrap a rendered digest table in the mail body (heading + unsubscribe footer).
pub fn digest_body(table_html: &str, app_url: &str) -> String {
    format!(
        r#"
      <h2>新闻摘要</h2>
      <p>以下是您订阅的精选新闻：</p>
      {table_html}
      <hr>
      <p><small>您收到此邮件是因为您已订阅。<a href="{app_url}/unsubscribe">退订</a></small></p>
    "#
    )
}

/// Parse a recipient address such as `reader@example.com` or `Name <addr>`.
pub fn parse_recipient(to: &str) -> Result<Mailbox> {
    to.trim()
        .parse()
        .with_context(|| format!("invalid recipient address `{to}`"))
}

/// Build the HTML digest message.
pub fn digest_message(from: &Mailbox, to: &str, html: String) -> Result<Message> {
    let to = parse_recipient(to)?;
    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(DIGEST_SUBJECT)
        .header(header::ContentType::TEXT_HTML)
        .body(html)
        .context("build email")
}

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    app_url: String,
}

impl EmailSender {
    /// SMTP settings from env. `Ok(None)` when `SMTP_HOST` is unset or `skip`.
    ///
    /// - `SMTP_PORT` defaults to 587 (STARTTLS); 465 uses implicit TLS.
    /// - `SMTP_USER`/`SMTP_PASS` are optional; both must be set to authenticate.
    pub fn from_env() -> Result<Option<Self>> {
        let host = match std::env::var("SMTP_HOST") {
            Ok(h) if !h.trim().is_empty() && h.trim() != "skip" => h.trim().to_string(),
            _ => return Ok(None),
        };
        let port: u16 = match std::env::var("SMTP_PORT") {
            Ok(p) => p
                .trim()
                .parse()
                .with_context(|| format!("invalid SMTP_PORT `{p}`"))?,
            Err(_) => 587,
        };

        let mut builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
        }
        .with_context(|| format!("invalid SMTP_HOST `{host}`"))?
        .port(port)
        .timeout(Some(SMTP_TIMEOUT));

        if let (Ok(user), Ok(pass)) = (std::env::var("SMTP_USER"), std::env::var("SMTP_PASS")) {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        let from_addr = std::env::var("SMTP_FROM").unwrap_or_else(|_| DEFAULT_FROM.to_string());
        let from = from_addr
            .parse()
            .with_context(|| format!("invalid SMTP_FROM `{from_addr}`"))?;
        let app_url = std::env::var("APP_URL").unwrap_or_default();

        Ok(Some(Self {
            mailer: builder.build(),
            from,
            app_url,
        }))
    }

    pub async fn send_digest(&self, to: &str, table_html: &str) -> Result<()> {
        let msg = digest_message(&self.from, to, digest_body(table_html, &self.app_url))?;
        self.mailer.send(msg).await.context("send email")?;
        counter!("digest_sent_total").increment(1);
        tracing::info!(target: "digest", "digest email sent");
        Ok(())
    }
}
