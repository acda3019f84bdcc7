//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use marigold_core::Email;

use crate::config::ApiConfig;
use crate::services::{EmailService, PaymentError, PaymentsClient};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("smtp transport error: {0}")]
    Mail(#[from] lettre::transport::smtp::Error),
    #[error("payment client error: {0}")]
    Payments(#[from] PaymentError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    mailer: Option<EmailService>,
    payments: Option<PaymentsClient>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The mailer and gateway client come out as `None` when their
    /// config blocks are absent; routes degrade accordingly (mail is
    /// skipped, payment endpoints return 503).
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay address is invalid or the
    /// payment HTTP client fails to build.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let mailer = match &config.mail {
            Some(mail) => Some(EmailService::new(mail, &config.client_base_url)?),
            None => None,
        };

        let payments = match &config.payments {
            Some(payment) => Some(PaymentsClient::new(payment)?),
            None => None,
        };

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                mailer,
                payments,
            }),
        })
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the mail service, if SMTP is configured.
    #[must_use]
    pub fn mailer(&self) -> Option<&EmailService> {
        self.inner.mailer.as_ref()
    }

    /// Get the payment gateway client, if payments are configured.
    #[must_use]
    pub fn payments(&self) -> Option<&PaymentsClient> {
        self.inner.payments.as_ref()
    }

    /// The operational alert recipient.
    #[must_use]
    pub fn ops_email(&self) -> &Email {
        &self.inner.config.ops_alert_email
    }
}
