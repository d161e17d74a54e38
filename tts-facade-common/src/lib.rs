//! TTS Facade Common Library
//!
//! Shared utilities for configuration, upstream authentication, error
//! handling, tracing and HTTP serving used by the synthesis facade.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod args;
pub mod auth;
pub mod config;
pub mod error;
pub mod server;
pub mod tracing;


pub use args::ListenArgs;
pub use auth::AuthProvider;
pub use config::Config;
pub use error::{AuthError, ConfigError, Error};
pub use server::{HttpServerBuilder, ServerError, shutdown_channel};
