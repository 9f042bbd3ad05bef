//! Domain services used by HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the relay logic and prompt construction so route
//! handlers can stay focused on protocol translation.

pub mod chat;
pub mod prompt;
