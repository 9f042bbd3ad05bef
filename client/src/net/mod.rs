//! Networking for the chat relay.
//!
//! SYSTEM CONTEXT
//! ==============
//! `relay` posts the conversation to `POST /api/chat` and decodes the
//! streamed reply into wire stream parts. The widget depends only on the
//! [`relay::ChatTransport`] trait so tests can script replies.

pub mod relay;
