//! Shared types for the Parley messaging service.
//!
//! `api` holds the wire shapes (requests, responses, JWT claims); `models`
//! holds the sealed payload representation that encrypted messages use at
//! rest.

pub mod api;
pub mod models;
