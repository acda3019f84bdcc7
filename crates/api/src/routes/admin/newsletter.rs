//! Admin newsletter blast.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::error::{ApiError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Request body for a newsletter send.
#[derive(Debug, Deserialize)]
pub struct NewsletterRequest {
    pub subject: String,
    pub message: String,
}

/// Delivery tally for one send.
#[derive(Debug, Serialize)]
pub struct NewsletterResponse {
    pub sent: usize,
    pub failed: usize,
}

/// POST /api/admin/newsletter
///
/// Sends the message to every registered user, one recipient at a
/// time. Individual failures are logged and counted, never fatal.
///
/// # Errors
///
/// Returns 400 for an empty subject or message and 503 when SMTP is
/// not configured.
pub async fn send(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(req): Json<NewsletterRequest>,
) -> Result<Json<NewsletterResponse>> {
    if req.subject.trim().is_empty() || req.message.trim().is_empty() {
        return Err(ApiError::InvalidRequest(
            "Subject and message are required".to_owned(),
        ));
    }

    let mailer = state
        .mailer()
        .ok_or_else(|| ApiError::ServiceUnavailable("Email service is not configured".to_owned()))?;

    let recipients = db::users::all_emails(state.pool()).await?;

    let mut sent = 0;
    let mut failed = 0;
    for recipient in &recipients {
        match mailer
            .send_newsletter(recipient, &req.subject, &req.message)
            .await
        {
            Ok(()) => sent += 1,
            Err(e) => {
                failed += 1;
                tracing::warn!(recipient = %recipient, error = %e, "newsletter send failed");
            }
        }
    }

    tracing::info!(sent, failed, "newsletter dispatched");

    Ok(Json(NewsletterResponse { sent, failed }))
}
