//! Onebox core - email documents and the small helpers every backend shares.

pub mod email;
pub mod env;

pub use email::{Attachment, Classification, DocumentError, EmailDocument};

pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");
