//! Shipquote Storefront library.
//!
//! Serves shipping quotes and checkout shipping selection over HTTP. Built
//! as a library so the binary, the CLI and the integration tests share it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
