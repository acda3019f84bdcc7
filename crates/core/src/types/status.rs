//! Order status enums and the fulfillment transition table.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// Orders start `Pending` and move forward through fulfillment;
/// `Delivered` and `Cancelled` are terminal. The allowed moves are
/// encoded in [`OrderStatus::can_transition_to`] so every caller
/// (admin updates, customer cancellation) shares one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "lowercase")
)]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Whether an order in this status may move to `next`.
    ///
    /// Self-transitions are rejected, terminal states allow nothing,
    /// and fulfillment never moves backwards:
    ///
    /// | from       | allowed                                  |
    /// |------------|------------------------------------------|
    /// | Pending    | Processing, Ready, Delivered, Cancelled  |
    /// | Processing | Ready, Delivered, Cancelled              |
    /// | Ready      | Delivered, Cancelled                     |
    /// | Delivered  | (terminal)                               |
    /// | Cancelled  | (terminal)                               |
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (
                Self::Pending,
                Self::Processing | Self::Ready | Self::Delivered | Self::Cancelled
            ) | (Self::Processing, Self::Ready | Self::Delivered | Self::Cancelled)
                | (Self::Ready, Self::Delivered | Self::Cancelled)
        )
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Processing => write!(f, "Processing"),
            Self::Ready => write!(f, "Ready"),
            Self::Delivered => write!(f, "Delivered"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Who cancelled an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_actor", rename_all = "lowercase")
)]
pub enum CancelledBy {
    User,
    Admin,
}

impl std::fmt::Display for CancelledBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "customer"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// How an order is paid.
///
/// Cash-on-delivery orders are treated as settled at placement; online
/// orders stay unpaid until the gateway confirms capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_payment_method", rename_all = "lowercase")
)]
pub enum PaymentMethod {
    Cod,
    Online,
}

impl PaymentMethod {
    /// Whether orders with this method are considered paid as soon as
    /// they are placed.
    #[must_use]
    pub const fn settles_at_placement(self) -> bool {
        matches!(self, Self::Cod)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cod => write!(f, "Cash on Delivery"),
            Self::Online => write!(f, "Online"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    #[test]
    fn pending_can_move_anywhere_forward() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Ready));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn fulfillment_never_moves_backwards() {
        assert!(!OrderStatus::Processing.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Ready.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Ready.can_transition_to(OrderStatus::Processing));
    }

    #[test]
    fn terminal_states_allow_nothing() {
        for next in ALL {
            assert!(!OrderStatus::Delivered.can_transition_to(next));
            assert!(!OrderStatus::Cancelled.can_transition_to(next));
        }
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn self_transitions_rejected() {
        for status in ALL {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn cod_settles_at_placement() {
        assert!(PaymentMethod::Cod.settles_at_placement());
        assert!(!PaymentMethod::Online.settles_at_placement());
    }

    #[test]
    fn status_serializes_as_variant_name() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"Processing\"");
        let back: OrderStatus = serde_json::from_str("\"Cancelled\"").unwrap();
        assert_eq!(back, OrderStatus::Cancelled);
    }
}
