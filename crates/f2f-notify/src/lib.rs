//! Transactional email: `{{token}}` templates, the branded HTML layout and
//! delivery through the Resend API.

pub mod client;
pub mod error;
pub mod layout;
pub mod render;
pub mod service;

pub use client::{OutgoingEmail, ResendClient};
pub use error::NotifyError;
pub use layout::{expected_delivery_section, EmailLayout};
pub use render::{render, TemplateVars};
pub use service::{Notifier, Recipient, RenderedEmail, SendOutcome};
