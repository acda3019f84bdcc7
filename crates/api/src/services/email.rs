//! Email delivery for order alerts, event reminders and the newsletter.
//!
//! Uses SMTP via lettre with Askama HTML templates. Every message goes
//! out as multipart text + HTML. Mail is best-effort across the whole
//! API: callers log failures and carry on, they never fail the request
//! that triggered the message.

use askama::Template;
use chrono::{DateTime, Utc};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use thiserror::Error;

use marigold_core::{Email, OrderStatus};

use crate::config::MailConfig;
use crate::models::{Address, Event, Order, OrderItem};

/// One order line as rendered in an email body.
struct ItemLine {
    name: String,
    qty: i32,
    line_total: Decimal,
}

/// HTML template for the ops alert on a new order.
#[derive(Template)]
#[template(path = "email/order_placed.html")]
struct OrderPlacedEmailHtml<'a> {
    customer_name: &'a str,
    customer_email: &'a str,
    address: &'a str,
    payment_method: String,
    total: Decimal,
    items: &'a [ItemLine],
}

/// Plain text template for the ops alert on a new order.
#[derive(Template)]
#[template(path = "email/order_placed.txt")]
struct OrderPlacedEmailText<'a> {
    customer_name: &'a str,
    customer_email: &'a str,
    address: &'a str,
    payment_method: String,
    total: Decimal,
    items: &'a [ItemLine],
}

/// HTML template for the ops alert on a customer cancellation.
#[derive(Template)]
#[template(path = "email/order_cancelled.html")]
struct OrderCancelledEmailHtml<'a> {
    customer_name: &'a str,
    customer_email: &'a str,
    order_id: String,
    address: &'a str,
    items: &'a [ItemLine],
    cancelled_at: String,
}

/// Plain text template for the ops alert on a customer cancellation.
#[derive(Template)]
#[template(path = "email/order_cancelled.txt")]
struct OrderCancelledEmailText<'a> {
    customer_name: &'a str,
    customer_email: &'a str,
    order_id: String,
    address: &'a str,
    items: &'a [ItemLine],
    cancelled_at: String,
}

/// HTML template for the customer status-change notification.
#[derive(Template)]
#[template(path = "email/status_update.html")]
struct StatusUpdateEmailHtml<'a> {
    customer_name: &'a str,
    order_id: String,
    previous: String,
    current: String,
    reason: &'a str,
    orders_url: String,
}

/// Plain text template for the customer status-change notification.
#[derive(Template)]
#[template(path = "email/status_update.txt")]
struct StatusUpdateEmailText<'a> {
    customer_name: &'a str,
    order_id: String,
    previous: String,
    current: String,
    reason: &'a str,
    orders_url: String,
}

/// HTML template for an event reminder.
#[derive(Template)]
#[template(path = "email/event_reminder.html")]
struct EventReminderEmailHtml<'a> {
    title: &'a str,
    location: &'a str,
    starts_at: String,
    time_left: &'a str,
}

/// Plain text template for an event reminder.
#[derive(Template)]
#[template(path = "email/event_reminder.txt")]
struct EventReminderEmailText<'a> {
    title: &'a str,
    location: &'a str,
    starts_at: String,
    time_left: &'a str,
}

/// HTML template for a per-event subscription confirmation.
#[derive(Template)]
#[template(path = "email/subscription_confirmed.html")]
struct SubscriptionConfirmedEmailHtml<'a> {
    title: &'a str,
    location: &'a str,
    starts_at: String,
}

/// Plain text template for a per-event subscription confirmation.
#[derive(Template)]
#[template(path = "email/subscription_confirmed.txt")]
struct SubscriptionConfirmedEmailText<'a> {
    title: &'a str,
    location: &'a str,
    starts_at: String,
}

/// HTML template for a global subscription confirmation.
#[derive(Template)]
#[template(path = "email/subscription_confirmed_all.html")]
struct SubscriptionConfirmedAllEmailHtml;

/// Plain text template for a global subscription confirmation.
#[derive(Template)]
#[template(path = "email/subscription_confirmed_all.txt")]
struct SubscriptionConfirmedAllEmailText;

/// HTML template wrapping admin-authored newsletter content.
#[derive(Template)]
#[template(path = "email/newsletter.html")]
struct NewsletterEmailHtml<'a> {
    content: &'a str,
}

/// Plain text template for the newsletter.
#[derive(Template)]
#[template(path = "email/newsletter.txt")]
struct NewsletterEmailText<'a> {
    content: &'a str,
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

/// Email service for sending transactional mail.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    client_base_url: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay address is invalid.
    pub fn new(config: &MailConfig, client_base_url: &str) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            client_base_url: client_base_url.to_owned(),
        })
    }

    /// Alert the ops address that a new order was placed.
    ///
    /// # Errors
    ///
    /// Returns an error if the message fails to render or send.
    pub async fn send_order_placed(
        &self,
        to: &Email,
        customer_name: &str,
        customer_email: &str,
        order: &Order,
        items: &[OrderItem],
        address: Option<&Address>,
    ) -> Result<(), EmailError> {
        let address = format_address(address);
        let lines = item_lines(items);
        let payment_method = order.payment_method.to_string();

        let html = OrderPlacedEmailHtml {
            customer_name,
            customer_email,
            address: &address,
            payment_method: payment_method.clone(),
            total: order.total_price,
            items: &lines,
        }
        .render()?;
        let text = OrderPlacedEmailText {
            customer_name,
            customer_email,
            address: &address,
            payment_method,
            total: order.total_price,
            items: &lines,
        }
        .render()?;

        self.send_multipart_email(to.as_str(), "New order on Marigold Market", &text, &html)
            .await
    }

    /// Alert the ops address that a customer cancelled their order.
    ///
    /// # Errors
    ///
    /// Returns an error if the message fails to render or send.
    pub async fn send_order_cancelled(
        &self,
        to: &Email,
        customer_name: &str,
        customer_email: &str,
        order: &Order,
        items: &[OrderItem],
        address: Option<&Address>,
    ) -> Result<(), EmailError> {
        let address = format_address(address);
        let lines = item_lines(items);
        let cancelled_at = order.cancelled_at.map_or_else(String::new, format_timestamp);

        let html = OrderCancelledEmailHtml {
            customer_name,
            customer_email,
            order_id: order.id.to_string(),
            address: &address,
            items: &lines,
            cancelled_at: cancelled_at.clone(),
        }
        .render()?;
        let text = OrderCancelledEmailText {
            customer_name,
            customer_email,
            order_id: order.id.to_string(),
            address: &address,
            items: &lines,
            cancelled_at,
        }
        .render()?;

        self.send_multipart_email(to.as_str(), "Order cancelled by customer", &text, &html)
            .await
    }

    /// Tell the customer their order moved to a new status.
    ///
    /// # Errors
    ///
    /// Returns an error if the message fails to render or send.
    pub async fn send_status_update(
        &self,
        to: &Email,
        customer_name: &str,
        order: &Order,
        previous: OrderStatus,
    ) -> Result<(), EmailError> {
        let reason = order.cancellation_reason.as_deref().unwrap_or("");
        let orders_url = format!("{}/orders", self.client_base_url);
        let subject = format!("Order status update [#{}]", order.id);

        let html = StatusUpdateEmailHtml {
            customer_name,
            order_id: order.id.to_string(),
            previous: previous.to_string(),
            current: order.status.to_string(),
            reason,
            orders_url: orders_url.clone(),
        }
        .render()?;
        let text = StatusUpdateEmailText {
            customer_name,
            order_id: order.id.to_string(),
            previous: previous.to_string(),
            current: order.status.to_string(),
            reason,
            orders_url,
        }
        .render()?;

        self.send_multipart_email(to.as_str(), &subject, &text, &html)
            .await
    }

    /// Remind a subscriber that an event starts in `time_left`.
    ///
    /// # Errors
    ///
    /// Returns an error if the message fails to render or send.
    pub async fn send_event_reminder(
        &self,
        to: &Email,
        event: &Event,
        time_left: &str,
    ) -> Result<(), EmailError> {
        let subject = format!("Reminder: {} is coming up!", event.title);

        let html = EventReminderEmailHtml {
            title: &event.title,
            location: &event.location,
            starts_at: format_timestamp(event.start_time),
            time_left,
        }
        .render()?;
        let text = EventReminderEmailText {
            title: &event.title,
            location: &event.location,
            starts_at: format_timestamp(event.start_time),
            time_left,
        }
        .render()?;

        self.send_multipart_email(to.as_str(), &subject, &text, &html)
            .await
    }

    /// Confirm a per-event reminder subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the message fails to render or send.
    pub async fn send_subscription_confirmed(
        &self,
        to: &Email,
        event: &Event,
    ) -> Result<(), EmailError> {
        let subject = format!("Subscribed to {} reminders", event.title);

        let html = SubscriptionConfirmedEmailHtml {
            title: &event.title,
            location: &event.location,
            starts_at: format_timestamp(event.start_time),
        }
        .render()?;
        let text = SubscriptionConfirmedEmailText {
            title: &event.title,
            location: &event.location,
            starts_at: format_timestamp(event.start_time),
        }
        .render()?;

        self.send_multipart_email(to.as_str(), &subject, &text, &html)
            .await
    }

    /// Confirm a subscription to reminders for all future events.
    ///
    /// # Errors
    ///
    /// Returns an error if the message fails to render or send.
    pub async fn send_subscription_confirmed_all(&self, to: &Email) -> Result<(), EmailError> {
        let html = SubscriptionConfirmedAllEmailHtml.render()?;
        let text = SubscriptionConfirmedAllEmailText.render()?;

        self.send_multipart_email(
            to.as_str(),
            "Subscribed to all future event reminders",
            &text,
            &html,
        )
        .await
    }

    /// Send one newsletter message. The content is admin-authored HTML
    /// and is embedded unescaped.
    ///
    /// # Errors
    ///
    /// Returns an error if the message fails to render or send.
    pub async fn send_newsletter(
        &self,
        to: &Email,
        subject: &str,
        content: &str,
    ) -> Result<(), EmailError> {
        let html = NewsletterEmailHtml { content }.render()?;
        let text = NewsletterEmailText { content }.render()?;

        self.send_multipart_email(to.as_str(), subject, &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

fn item_lines(items: &[OrderItem]) -> Vec<ItemLine> {
    items
        .iter()
        .map(|item| ItemLine {
            name: item.product_name.clone(),
            qty: item.qty,
            line_total: item.unit_price * Decimal::from(item.qty),
        })
        .collect()
}

fn format_address(address: Option<&Address>) -> String {
    address.map_or_else(
        || "Address not found".to_owned(),
        |a| {
            format!(
                "{}, {}, {}, {} - {}",
                a.full_name, a.line1, a.city, a.state, a.postal_code
            )
        },
    )
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%d %B %Y, %H:%M UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_items() -> Vec<ItemLine> {
        vec![
            ItemLine {
                name: "Marigold garland".to_owned(),
                qty: 2,
                line_total: Decimal::new(59800, 2),
            },
            ItemLine {
                name: "Brass diya".to_owned(),
                qty: 1,
                line_total: Decimal::new(24900, 2),
            },
        ]
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn order_placed_template_renders_items() {
        let items = sample_items();
        let html = OrderPlacedEmailHtml {
            customer_name: "Asha",
            customer_email: "asha@example.com",
            address: "Asha, 12 Lake Rd, Pune, MH - 411001",
            payment_method: "Cash on Delivery".to_owned(),
            total: Decimal::new(84700, 2),
            items: &items,
        }
        .render()
        .unwrap();

        assert!(html.contains("Marigold garland"));
        assert!(html.contains("847.00"));
        assert!(html.contains("asha@example.com"));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn status_update_hides_empty_reason() {
        let text = StatusUpdateEmailText {
            customer_name: "Asha",
            order_id: "7".to_owned(),
            previous: "Pending".to_owned(),
            current: "Processing".to_owned(),
            reason: "",
            orders_url: "https://shop.example.com/orders".to_owned(),
        }
        .render()
        .unwrap();

        assert!(!text.contains("Reason:"));
        assert!(text.contains("Pending to Processing"));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn status_update_shows_reason_when_present() {
        let text = StatusUpdateEmailText {
            customer_name: "Asha",
            order_id: "7".to_owned(),
            previous: "Pending".to_owned(),
            current: "Cancelled".to_owned(),
            reason: "out of stock",
            orders_url: "https://shop.example.com/orders".to_owned(),
        }
        .render()
        .unwrap();

        assert!(text.contains("Reason: out of stock"));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn html_escapes_customer_input() {
        let html = NewsletterEmailText {
            content: "plain text stays plain",
        }
        .render()
        .unwrap();
        assert!(html.contains("plain text stays plain"));

        let items = sample_items();
        let escaped = OrderPlacedEmailHtml {
            customer_name: "<script>alert(1)</script>",
            customer_email: "x@example.com",
            address: "somewhere",
            payment_method: "Online".to_owned(),
            total: Decimal::ONE,
            items: &items,
        }
        .render()
        .unwrap();
        assert!(!escaped.contains("<script>"));
    }
}
