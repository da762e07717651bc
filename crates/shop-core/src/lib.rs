//! Storefront behavior independent of the browser: cart state and service,
//! catalog disclosure tree, form validation, modal bookkeeping and cart
//! markup. The WASM crate binds these to the DOM.

pub mod cart;
pub mod catalog;
pub mod config;
pub mod forms;
pub mod modal;
pub mod price;
pub mod render;

pub use cart::{CartService, CartStore, Notifier, ProductSource};
pub use catalog::{Accordion, CatalogTree, CatalogView, NodeKey, NodeKind};
pub use config::StorefrontConfig;
pub use forms::{ContactForm, ContactKind, FormOutcome, LeadForm, OrderForm, ValidationError};
pub use modal::{ModalBackend, ModalController, ModalError};
