//! # client
//!
//! UI-agnostic front end for the Apex Forge landing page.
//!
//! This crate contains the chat widget (conversation state plus the relay
//! exchange), the metrics calculator, and the HTTP client for the chat relay.
//! Rendering is left to the host: the widget reports every change through the
//! [`widget::ChatView`] trait.

pub mod net;
pub mod state;
pub mod widget;
