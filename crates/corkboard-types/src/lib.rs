//! Wire types shared by the persistence layer, the HTTP API and its clients.

pub mod api;
pub mod models;
