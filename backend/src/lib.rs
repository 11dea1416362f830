// This file acts as the entry point for the `backend` library.
// The binary and the integration tests both build on these modules.
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod identity;
pub mod token;
pub mod validation;
pub mod web_server;
