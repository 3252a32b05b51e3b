//! Agora shared types
//!
//! Plain domain structures handed between the forum core (agora-db) and
//! whatever presentation or transport layer sits on top of it. Nothing in
//! here touches the store.

pub mod config;
pub mod models;
pub mod session;
