//! Shared client-side state modules.
//!
//! DESIGN
//! ======
//! State is split by domain (`chat`, `calculator`) so each front-end surface
//! depends on a small focused model. Fields stay plain data; transitions go
//! through methods so derived values never go stale.

pub mod calculator;
pub mod chat;
