use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::info;

use crate::config::{COMMUNITY_URL, DigestConfig};
use crate::error::DeliveryError;
use crate::extract::DigestResult;

/// Sends the digest as one plain-text mail over authenticated STARTTLS SMTP.
pub struct Notifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl Notifier {
    pub fn new(config: &DigestConfig) -> Result<Self, DeliveryError> {
        let credentials = Credentials::new(config.smtp_user.clone(), config.smtp_pass.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from: config.mail_from().parse()?,
            to: config.mail_to.parse()?,
        })
    }

    /// One mail per run, including the explicit "no posts today" case.
    pub async fn send(&self, digest: &DigestResult) -> Result<(), DeliveryError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject(digest))
            .header(ContentType::TEXT_PLAIN)
            .body(render_body(digest))?;

        info!("sending digest to {}", self.to);
        self.transport.send(message).await?;
        Ok(())
    }
}

fn subject(digest: &DigestResult) -> String {
    format!("COOS 커뮤니티 오늘 게시글 ({})", digest.date)
}

fn render_body(digest: &DigestResult) -> String {
    let mut lines = Vec::new();

    if digest.posts.is_empty() {
        lines.push("오늘 올라온 게시글이 없습니다.".to_string());
    } else {
        lines.push("오늘 올라온 게시글:".to_string());
        for (idx, post) in digest.posts.iter().enumerate() {
            lines.push(format!("{}. {} - {}", idx + 1, post.title, post.link));
        }
    }

    lines.push(String::new());
    lines.push(format!("{} / {}", digest.date, COMMUNITY_URL));
    lines.join("\n")
}
