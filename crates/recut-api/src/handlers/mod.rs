//! Request handlers.

pub mod ai_edit;
pub mod edit;
pub mod health;
