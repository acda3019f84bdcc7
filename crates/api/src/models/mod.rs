//! Domain models: database row types and JSON response views.
//!
//! Row structs derive `sqlx::FromRow` and map 1:1 onto tables; view
//! structs serialize in the camelCase shape the storefront client
//! consumes. Views are derived from rows at the edge of each handler so
//! that internal fields (password hashes, soft-delete flags) never leak
//! by accident.

pub mod address;
pub mod cart;
pub mod catalog;
pub mod event;
pub mod order;
pub mod user;

pub use address::{Address, AddressForm};
pub use cart::{CartLine, CartView};
pub use catalog::{Category, Product, ProductForm, ProductPatch, ProductSummary};
pub use event::{Event, EventForm, EventPatch, Subscription};
pub use order::{NewOrder, Order, OrderCustomer, OrderItem, OrderItemView, OrderView, PricedLine};
pub use user::{CurrentUser, User, UserProfile};

/// Session storage keys.
pub mod session_keys {
    /// Key under which the logged-in user is stored in the session.
    pub const CURRENT_USER: &str = "current_user";
}
