//! Domain models for the marketplace.
//!
//! These are the shapes handlers and templates work with. Repositories in
//! [`crate::db`] build them from database rows.

pub mod catalog;
pub mod messaging;
pub mod order;
pub mod platform;
pub mod seller;
pub mod session;
pub mod user;

pub use catalog::{Product, ProductImage, ProductQuery, ProductQuestion, ProductSort};
pub use messaging::{ConversationSummary, Message};
pub use order::{Order, OrderItem, ShippingAddress};
pub use platform::{IdentitySession, PlatformSettings};
pub use seller::{LiveStream, Payout, SellerApplication, SellerDashboard, SellerProfile};
pub use session::{CurrentUser, Impersonator};
pub use user::User;
