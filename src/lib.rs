//! Administration client for a study metadata REST API
//!
//! The crate provides a typed API client, a reusable CRUD layer shared by
//! the terminal dashboard and the CLI, live cache updates from the server's
//! push stream, and bulk package import from Excel workbooks.

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod crud;
pub mod dashboard;
pub mod import;
pub mod live;
pub mod models;
