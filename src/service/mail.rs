//! Outgoing email over SMTP. Connection settings come from the `smtp` settings section on every send.

use crate::config::settings::SmtpSettings;
use crate::error::AppError;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

#[derive(Clone, Debug)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, smtp: &SmtpSettings, email: &OutgoingEmail) -> Result<(), AppError>;
}

/// lettre SMTP transport built per send from the current settings.
#[derive(Clone, Debug, Default)]
pub struct SmtpMailer;

fn mailbox(name: Option<&str>, address: &str) -> Result<Mailbox, AppError> {
    let addr: Address = address
        .trim()
        .parse()
        .map_err(|e| AppError::Validation(format!("invalid email address '{}': {}", address, e)))?;
    Ok(Mailbox::new(name.map(str::to_string), addr))
}

pub fn build_message(smtp: &SmtpSettings, email: &OutgoingEmail) -> Result<Message, AppError> {
    Message::builder()
        .from(mailbox(smtp.from_name.as_deref(), &smtp.from_address)?)
        .to(mailbox(None, &email.to)?)
        .subject(email.subject.clone())
        .header(ContentType::TEXT_HTML)
        .body(email.html.clone())
        .map_err(|e| AppError::Mail(format!("build message: {}", e)))
}

/// SMTPS port; everything else negotiates STARTTLS when `secure` is set.
const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TlsMode {
    Implicit,
    StartTls,
    Plain,
}

pub fn tls_mode(smtp: &SmtpSettings) -> TlsMode {
    match (smtp.secure, smtp.port) {
        (false, _) => TlsMode::Plain,
        (true, IMPLICIT_TLS_PORT) => TlsMode::Implicit,
        (true, _) => TlsMode::StartTls,
    }
}

fn transport(smtp: &SmtpSettings) -> Result<AsyncSmtpTransport<Tokio1Executor>, AppError> {
    let host = smtp.host.trim();
    let relay_err = |e: lettre::transport::smtp::Error| AppError::Mail(format!("smtp relay {}: {}", host, e));
    let builder = match tls_mode(smtp) {
        TlsMode::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(host).map_err(relay_err)?,
        TlsMode::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).map_err(relay_err)?,
        TlsMode::Plain => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
    };
    let builder = builder.port(smtp.port);
    let builder = match (&smtp.username, &smtp.password) {
        (Some(user), Some(pass)) if !user.is_empty() => {
            builder.credentials(Credentials::new(user.clone(), pass.clone()))
        }
        _ => builder,
    };
    Ok(builder.build())
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, smtp: &SmtpSettings, email: &OutgoingEmail) -> Result<(), AppError> {
        if !smtp.is_configured() {
            return Err(AppError::Validation("SMTP is not configured".into()));
        }
        let message = build_message(smtp, email)?;
        transport(smtp)?
            .send(message)
            .await
            .map_err(|e| AppError::Mail(e.to_string()))?;
        tracing::debug!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Confirmation sent to the customer after checkout.
pub fn order_confirmation(
    to: &str,
    store_name: &str,
    customer_name: &str,
    order: &crate::models::Order,
    items: &[crate::models::OrderItem],
) -> OutgoingEmail {
    let rows: String = items
        .iter()
        .map(|i| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&i.name),
                i.quantity,
                i.line_total
            )
        })
        .collect();
    let html = format!(
        "<p>Hi {name},</p><p>Thanks for your order <strong>{number}</strong>.</p>\
         <table><tr><th>Item</th><th>Qty</th><th>Total</th></tr>{rows}</table>\
         <p>Subtotal: {subtotal}<br>Shipping: {shipping}<br>Tax: {tax}<br><strong>Total: {total}</strong></p>\
         <p>{store}</p>",
        name = escape_html(customer_name),
        number = order.order_number,
        rows = rows,
        subtotal = order.subtotal,
        shipping = order.shipping_cost,
        tax = order.tax,
        total = order.total,
        store = escape_html(store_name),
    );
    OutgoingEmail {
        to: to.to_string(),
        subject: format!("{}: order {} received", store_name, order.order_number),
        html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp() -> SmtpSettings {
        SmtpSettings {
            host: "smtp.example.com".into(),
            from_address: "shop@example.com".into(),
            from_name: Some("RigStore".into()),
            ..Default::default()
        }
    }

    #[test]
    fn builds_html_message() {
        let email = OutgoingEmail {
            to: "buyer@example.com".into(),
            subject: "Hello".into(),
            html: "<p>hi</p>".into(),
        };
        let msg = build_message(&smtp(), &email).unwrap();
        let raw = String::from_utf8(msg.formatted()).unwrap();
        assert!(raw.contains("Subject: Hello"));
        assert!(raw.contains("text/html"));
        assert!(raw.contains("buyer@example.com"));
    }

    #[test]
    fn default_port_uses_starttls() {
        let mut settings = smtp();
        assert_eq!(settings.port, 587);
        assert_eq!(tls_mode(&settings), TlsMode::StartTls);
        settings.port = 465;
        assert_eq!(tls_mode(&settings), TlsMode::Implicit);
        settings.secure = false;
        assert_eq!(tls_mode(&settings), TlsMode::Plain);
    }

    #[test]
    fn bad_recipient_is_validation_error() {
        let email = OutgoingEmail {
            to: "not an address".into(),
            subject: "x".into(),
            html: String::new(),
        };
        assert!(matches!(build_message(&smtp(), &email), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn unconfigured_smtp_refused() {
        let email = OutgoingEmail {
            to: "buyer@example.com".into(),
            subject: "x".into(),
            html: String::new(),
        };
        let res = SmtpMailer.send(&SmtpSettings::default(), &email).await;
        assert!(matches!(res, Err(AppError::Validation(_))));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<b>\"A&B\"</b>"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
    }
}
