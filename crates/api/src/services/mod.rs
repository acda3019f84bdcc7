//! Business logic services for the storefront API.
//!
//! # Services
//!
//! - `auth` - Registration, login and profile updates (argon2 hashing)
//! - `email` - Transactional mail delivery via SMTP
//! - `orders` - Order placement, cancellation and status transitions
//! - `payments` - Payment gateway client and signature verification
//! - `reminders` - Hourly event reminder sweep

pub mod auth;
pub mod email;
pub mod orders;
pub mod payments;
pub mod reminders;

pub use auth::{AuthError, AuthService};
pub use email::{EmailError, EmailService};
pub use orders::{OrderError, OrderLineInput, OrderService};
pub use payments::{PaymentError, PaymentsClient};
pub use reminders::ReminderScheduler;
