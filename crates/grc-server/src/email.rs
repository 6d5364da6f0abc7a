// crates/grc-server/src/email.rs
// ============================================================================
// Module: Email Dispatch
// Description: HTML email rendering and fire-and-forget SMTP delivery.
// Purpose: Send review reminders and digests without blocking callers.
// Dependencies: async-trait, grc-config, grc-core, lettre, thiserror, tokio
// ============================================================================

//! ## Overview
//! [`EmailDispatcher`] is either enabled with a [`MailTransport`] or disabled.
//! Disabled dispatchers log and drop every message. Enabled dispatchers spawn
//! delivery onto the current tokio runtime; the caller never waits and
//! delivery failures end in a `warn` log line. Short-lived processes call
//! [`EmailDispatcher::drain`] before exiting so spawned deliveries finish.
//!
//! Every message shares one HTML layout produced by [`render_email`]. Values
//! interpolated into the layout are escaped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use async_trait::async_trait;
use grc_config::EmailConfig;
use grc_config::EmailTls;
use grc_core::ActivatedControlId;
use grc_core::DashboardSummary;
use grc_core::WeeklyStats;
use grc_core::dates::days_past_due;
use lettre::Address;
use lettre::AsyncSmtpTransport;
use lettre::AsyncTransport;
use lettre::Message;
use lettre::Tokio1Executor;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use thiserror::Error;
use time::Date;
use time::OffsetDateTime;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::info;
use tracing::warn;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Product name shown in the layout header and footer.
const PRODUCT_NAME: &str = "GRC Compliance Platform";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Email construction and delivery errors.
#[derive(Debug, Error)]
pub enum EmailError {
    /// Sender or recipient address is malformed.
    #[error("invalid email address: {0}")]
    Address(String),
    /// Message could not be assembled.
    #[error("email build failed: {0}")]
    Build(String),
    /// SMTP relay rejected or failed the send.
    #[error("smtp delivery failed: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Messages
// ============================================================================

/// A rendered email ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Recipient address.
    pub to_email: String,
    /// Recipient display name.
    pub to_name: String,
    /// Subject line.
    pub subject: String,
    /// Complete HTML document.
    pub html_body: String,
}

/// Call-to-action button under the message body.
#[derive(Debug, Clone, Copy)]
pub struct EmailAction<'a> {
    /// Absolute target url; the button is omitted when empty.
    pub url: &'a str,
    /// Button label.
    pub text: &'a str,
}

/// Escapes text for inclusion in HTML element content or attributes.
#[must_use]
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Renders the shared HTML layout.
///
/// `body_html` is inserted verbatim; every other value is escaped.
#[must_use]
pub fn render_email(
    recipient_name: &str,
    subject: &str,
    title: &str,
    body_html: &str,
    action: EmailAction<'_>,
    year: i32,
) -> String {
    let mut html = String::with_capacity(2048 + body_html.len());
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape_html(subject));
    html.push_str(
        "</head>\n<body style=\"font-family: Arial, sans-serif; background-color: #f4f4f4; \
         margin: 0; padding: 20px;\">\n<div style=\"max-width: 600px; margin: 0 auto; \
         background-color: #ffffff; border-radius: 8px; overflow: hidden;\">\n",
    );
    let _ = writeln!(
        html,
        "<div style=\"background-color: #1e40af; color: #ffffff; padding: 24px; text-align: \
         center;\"><h1 style=\"margin: 0; font-size: 22px;\">🛡️ {PRODUCT_NAME}</h1></div>"
    );
    html.push_str("<div style=\"padding: 32px;\">\n");
    let _ = writeln!(html, "<p>Hi {},</p>", escape_html(recipient_name));
    let _ = writeln!(html, "<h2 style=\"color: #1e40af;\">{}</h2>", escape_html(title));
    let _ = writeln!(html, "<p style=\"line-height: 1.6;\">{body_html}</p>");
    if !action.url.is_empty() {
        let _ = writeln!(
            html,
            "<p style=\"text-align: center; margin-top: 32px;\"><a href=\"{}\" \
             style=\"background-color: #1e40af; color: #ffffff; padding: 12px 24px; \
             text-decoration: none; border-radius: 6px;\">{}</a></p>",
            escape_html(action.url),
            escape_html(action.text),
        );
    }
    html.push_str("</div>\n");
    let _ = writeln!(
        html,
        "<div style=\"background-color: #f9fafb; color: #6b7280; padding: 16px; font-size: \
         12px; text-align: center;\"><p>This is an automated message from your \
         {PRODUCT_NAME}.</p><p>© {year} {PRODUCT_NAME}. All rights reserved.</p></div>"
    );
    html.push_str("</div>\n</body>\n</html>\n");
    html
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Delivers rendered emails.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Sends one email.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError`] when the message cannot be built or delivered.
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError>;
}

/// SMTP transport backed by lettre.
pub struct SmtpMailTransport {
    /// Pooled async SMTP client.
    transport: AsyncSmtpTransport<Tokio1Executor>,
    /// Envelope and header sender.
    from: Mailbox,
}

impl SmtpMailTransport {
    /// Builds a transport from validated email settings.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError`] when the sender is unusable or the relay cannot
    /// be configured.
    pub fn from_config(config: &EmailConfig) -> Result<Self, EmailError> {
        let sender = config
            .sender_address()
            .ok_or_else(|| EmailError::Address("no sender address configured".to_string()))?;
        let address: Address =
            sender.parse().map_err(|err| EmailError::Address(format!("{sender}: {err}")))?;
        let from = Mailbox::new(Some(config.from_name.clone()), address);
        let mut builder = match config.tls {
            EmailTls::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|err| EmailError::Transport(err.to_string()))?,
            EmailTls::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
        };
        builder = builder.port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let address: Address = email
            .to_email
            .parse()
            .map_err(|err| EmailError::Address(format!("{}: {err}", email.to_email)))?;
        let to_name = Some(email.to_name.clone()).filter(|name| !name.is_empty());
        let message = Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(to_name, address))
            .subject(email.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(email.html_body.clone())
            .map_err(|err| EmailError::Build(err.to_string()))?;
        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|err| EmailError::Transport(err.to_string()))
    }
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Fire-and-forget email dispatcher.
#[derive(Clone)]
pub struct EmailDispatcher {
    /// Transport used when sending is enabled.
    transport: Option<Arc<dyn MailTransport>>,
    /// Front-end base url used for action links.
    app_base_url: String,
    /// Deliveries spawned by [`EmailDispatcher::send`] and not yet joined.
    pending: Arc<Mutex<JoinSet<()>>>,
}

impl EmailDispatcher {
    /// Builds a dispatcher that logs and drops every message.
    #[must_use]
    pub fn disabled(app_base_url: impl Into<String>) -> Self {
        Self {
            transport: None,
            app_base_url: app_base_url.into(),
            pending: Arc::default(),
        }
    }

    /// Builds a dispatcher that delivers through `transport`.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn MailTransport>, app_base_url: impl Into<String>) -> Self {
        Self {
            transport: Some(transport),
            app_base_url: app_base_url.into(),
            pending: Arc::default(),
        }
    }

    /// Builds the dispatcher described by the email settings.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError`] when an enabled SMTP transport cannot be built.
    pub fn from_config(config: &EmailConfig) -> Result<Self, EmailError> {
        if !config.enabled {
            return Ok(Self::disabled(config.app_base_url.clone()));
        }
        let transport = SmtpMailTransport::from_config(config)?;
        info!(host = %config.host, port = config.port, "smtp email enabled");
        Ok(Self::with_transport(Arc::new(transport), config.app_base_url.clone()))
    }

    /// Returns true when messages are actually delivered.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Spawns delivery of `email` and returns immediately.
    pub fn send(&self, email: OutgoingEmail) {
        let Some(transport) = self.transport.clone() else {
            info!(to = %email.to_email, subject = %email.subject, "email not sent (SMTP disabled)");
            return;
        };
        match Handle::try_current() {
            Ok(handle) => {
                let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
                while pending.try_join_next().is_some() {}
                pending.spawn_on(
                    async move {
                        deliver_with(transport.as_ref(), &email).await;
                    },
                    &handle,
                );
            }
            Err(_) => {
                warn!(to = %email.to_email, "email dropped: no async runtime");
            }
        }
    }

    /// Waits for every delivery spawned by [`Self::send`] so far.
    pub async fn drain(&self) {
        let mut pending =
            std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
        while pending.join_next().await.is_some() {}
    }

    /// Delivers `email` and waits for the outcome.
    pub async fn deliver(&self, email: &OutgoingEmail) {
        match &self.transport {
            Some(transport) => deliver_with(transport.as_ref(), email).await,
            None => {
                info!(to = %email.to_email, subject = %email.subject, "email not sent (SMTP disabled)");
            }
        }
    }

    /// Builds an absolute front-end url.
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.app_base_url.trim_end_matches('/'))
    }

    /// Overdue alert for a control owner.
    #[must_use]
    pub fn overdue_alert(
        &self,
        recipient: Recipient<'_>,
        control_name: &str,
        days_overdue: i64,
        control_id: &ActivatedControlId,
        now: OffsetDateTime,
    ) -> OutgoingEmail {
        let subject = format!("⚠️ Overdue Control Alert: {control_name}");
        let body = format!(
            "Control <strong>{}</strong> is <strong>{days_overdue} days overdue</strong> for \
             review.<br><br>Please complete the control review as soon as possible to maintain \
             compliance.",
            escape_html(control_name)
        );
        let url = self.url(&format!("/controls/activated/{control_id}"));
        let action = EmailAction {
            url: &url,
            text: "Review Control Now",
        };
        recipient.compose(subject, "Control Review Overdue", &body, action, now)
    }

    /// Reminder for a control whose review date has arrived or passed.
    ///
    /// The wording follows `due_date` relative to the day of `now`: a future
    /// date counts down, today says today, and a past date counts days past
    /// due.
    #[must_use]
    pub fn due_reminder(
        &self,
        recipient: Recipient<'_>,
        control_name: &str,
        due_date: Date,
        control_id: &ActivatedControlId,
        now: OffsetDateTime,
    ) -> OutgoingEmail {
        let subject = format!("📅 Control Review Due: {control_name}");
        let today = now.date();
        let timing = if due_date > today {
            format!("is due for review in <strong>{} days</strong>", (due_date - today).whole_days())
        } else if due_date == today {
            "is due for review <strong>today</strong>".to_string()
        } else {
            format!(
                "is <strong>{} days past due</strong> for review",
                days_past_due(due_date, today)
            )
        };
        let body = format!(
            "Control <strong>{}</strong> {timing}.<br><br>Please plan to complete the review \
             before the deadline.",
            escape_html(control_name)
        );
        let url = self.url(&format!("/controls/activated/{control_id}"));
        let action = EmailAction {
            url: &url,
            text: "View Control",
        };
        recipient.compose(subject, "Control Review Reminder", &body, action, now)
    }

    /// Daily compliance digest for an administrator.
    #[must_use]
    pub fn daily_digest(
        &self,
        recipient: Recipient<'_>,
        summary: &DashboardSummary,
        now: OffsetDateTime,
    ) -> OutgoingEmail {
        let body = format!(
            "<strong>Controls Overview:</strong><br>• Total Active: {}<br>• Compliant: {} \
             ({}%)<br>• Overdue: {}<br><br><strong>Open Tickets:</strong> {}<br><br>Stay on top \
             of your compliance posture with regular reviews.",
            summary.controls.activated,
            summary.controls.compliant,
            summary.controls.compliance_rate(),
            summary.controls.overdue,
            summary.tickets.open,
        );
        let url = self.url("/dashboard");
        let action = EmailAction {
            url: &url,
            text: "View Dashboard",
        };
        recipient.compose(
            "📊 Daily Compliance Digest".to_string(),
            "Your Daily Compliance Summary",
            &body,
            action,
            now,
        )
    }

    /// Weekly compliance report for an administrator.
    #[must_use]
    pub fn weekly_digest(
        &self,
        recipient: Recipient<'_>,
        stats: &WeeklyStats,
        now: OffsetDateTime,
    ) -> OutgoingEmail {
        let body = format!(
            "<strong>This Week's Highlights:</strong><br><br><strong>Controls:</strong><br>• \
             Total Active: {}<br>• Compliance Rate: {}%<br>• Require Attention: \
             {}<br><br><strong>Activity:</strong><br>• Evidence Submissions: {}<br>• Tickets \
             Resolved: {}<br><br>Great work maintaining your compliance posture!",
            stats.total_controls,
            stats.compliance_rate,
            stats.overdue_controls,
            stats.evidence_submissions,
            stats.tickets_resolved,
        );
        let url = self.url("/reports");
        let action = EmailAction {
            url: &url,
            text: "View Full Report",
        };
        recipient.compose(
            "📈 Weekly Compliance Report".to_string(),
            "Your Weekly Compliance Summary",
            &body,
            action,
            now,
        )
    }
}

/// Delivers through `transport`, logging failures.
async fn deliver_with(transport: &dyn MailTransport, email: &OutgoingEmail) {
    match transport.send(email).await {
        Ok(()) => info!(to = %email.to_email, subject = %email.subject, "email sent"),
        Err(err) => warn!(to = %email.to_email, error = %err, "email delivery failed"),
    }
}

/// Addressee of a rendered email.
#[derive(Debug, Clone, Copy)]
pub struct Recipient<'a> {
    /// Recipient address.
    pub email: &'a str,
    /// Recipient display name.
    pub name: &'a str,
}

impl Recipient<'_> {
    /// Renders the layout for this recipient.
    fn compose(
        self,
        subject: String,
        title: &str,
        body_html: &str,
        action: EmailAction<'_>,
        now: OffsetDateTime,
    ) -> OutgoingEmail {
        let html_body = render_email(self.name, &subject, title, body_html, action, now.year());
        OutgoingEmail {
            to_email: self.email.to_string(),
            to_name: self.name.to_string(),
            subject,
            html_body,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use grc_core::AssetStats;
    use grc_core::ControlStats;
    use grc_core::TicketStats;
    use time::macros::date;
    use time::macros::datetime;

    use super::*;

    struct RecordingTransport {
        sent: Mutex<Vec<OutgoingEmail>>,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    fn alice() -> Recipient<'static> {
        Recipient {
            email: "alice@company.com",
            name: "Alice <Ops>",
        }
    }

    #[test]
    fn layout_escapes_name_and_omits_empty_button() {
        let action = EmailAction {
            url: "",
            text: "ignored",
        };
        let html = render_email("A & B", "Subject", "Title", "<b>body</b>", action, 2026);
        assert!(html.contains("Hi A &amp; B,"));
        assert!(html.contains("<b>body</b>"));
        assert!(!html.contains("ignored"));
        assert!(html.contains("© 2026 GRC Compliance Platform. All rights reserved."));
    }

    #[test]
    fn overdue_alert_links_to_control() {
        let dispatcher = EmailDispatcher::disabled("http://localhost:3000/");
        let email = dispatcher.overdue_alert(
            alice(),
            "Inventory <assets>",
            9,
            &ActivatedControlId::new("ac-1"),
            datetime!(2026-03-02 10:00 UTC),
        );
        assert_eq!(email.subject, "⚠️ Overdue Control Alert: Inventory <assets>");
        assert!(email.html_body.contains("<strong>9 days overdue</strong>"));
        assert!(email.html_body.contains("Inventory &lt;assets&gt;"));
        assert!(email.html_body.contains("href=\"http://localhost:3000/controls/activated/ac-1\""));
        assert!(email.html_body.contains("Review Control Now"));
        assert!(email.html_body.contains("Hi Alice &lt;Ops&gt;,"));
    }

    #[test]
    fn due_reminder_counts_days_past_due_once_the_date_has_passed() {
        let dispatcher = EmailDispatcher::disabled("http://localhost:3000");
        let now = datetime!(2026-03-02 10:00 UTC);
        let control = ActivatedControlId::new("ac-4");
        let late = dispatcher.due_reminder(alice(), "Backups", date!(2026-01-11), &control, now);
        assert!(late.html_body.contains("is <strong>50 days past due</strong> for review"));
        assert!(!late.html_body.contains("due for review in <strong>0 days</strong>"));

        let today = dispatcher.due_reminder(alice(), "Backups", date!(2026-03-02), &control, now);
        assert!(today.html_body.contains("is due for review <strong>today</strong>"));

        let upcoming = dispatcher.due_reminder(alice(), "Backups", date!(2026-03-09), &control, now);
        assert!(upcoming.html_body.contains("is due for review in <strong>7 days</strong>"));
    }

    #[test]
    fn digests_carry_counts() {
        let dispatcher = EmailDispatcher::disabled("https://grc.example.com");
        let summary = DashboardSummary {
            controls: ControlStats::new(61, 4, 2, 1, 1),
            tickets: TicketStats {
                total: 5,
                open: 3,
                resolved_this_month: 1,
            },
            assets: AssetStats {
                total: 2,
            },
        };
        let now = datetime!(2026-03-02 09:00 UTC);
        let daily = dispatcher.daily_digest(alice(), &summary, now);
        assert_eq!(daily.subject, "📊 Daily Compliance Digest");
        assert!(daily.html_body.contains("• Compliant: 2 (50%)"));
        assert!(daily.html_body.contains("<strong>Open Tickets:</strong> 3"));
        assert!(daily.html_body.contains("https://grc.example.com/dashboard"));

        let stats = WeeklyStats {
            total_controls: 4,
            compliance_rate: 50,
            overdue_controls: 1,
            evidence_submissions: 6,
            tickets_resolved: 2,
        };
        let weekly = dispatcher.weekly_digest(alice(), &stats, now);
        assert_eq!(weekly.subject, "📈 Weekly Compliance Report");
        assert!(weekly.html_body.contains("• Evidence Submissions: 6"));
        assert!(weekly.html_body.contains("https://grc.example.com/reports"));
    }

    #[tokio::test]
    async fn enabled_dispatcher_delivers_through_transport() {
        let transport = Arc::new(RecordingTransport {
            sent: Mutex::new(Vec::new()),
        });
        let dispatcher = EmailDispatcher::with_transport(transport.clone(), "http://localhost:3000");
        assert!(dispatcher.is_enabled());
        let email = dispatcher.due_reminder(
            alice(),
            "Backups",
            date!(2026-03-02),
            &ActivatedControlId::new("ac-2"),
            datetime!(2026-03-02 10:00 UTC),
        );
        dispatcher.deliver(&email).await;
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "📅 Control Review Due: Backups");
    }

    #[tokio::test]
    async fn drain_waits_for_spawned_deliveries() {
        let transport = Arc::new(RecordingTransport {
            sent: Mutex::new(Vec::new()),
        });
        let dispatcher = EmailDispatcher::with_transport(transport.clone(), "http://localhost:3000");
        for name in ["Backups", "Inventory"] {
            let email = dispatcher.due_reminder(
                alice(),
                name,
                date!(2026-03-01),
                &ActivatedControlId::new("ac-3"),
                datetime!(2026-03-02 10:00 UTC),
            );
            dispatcher.send(email);
        }
        dispatcher.drain().await;
        assert_eq!(transport.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn disabled_dispatcher_drops_silently() {
        let dispatcher = EmailDispatcher::disabled("http://localhost:3000");
        assert!(!dispatcher.is_enabled());
        let email = dispatcher.due_reminder(
            alice(),
            "Backups",
            date!(2026-02-28),
            &ActivatedControlId::new("ac-2"),
            datetime!(2026-03-02 10:00 UTC),
        );
        dispatcher.send(email.clone());
        dispatcher.deliver(&email).await;
    }
}
