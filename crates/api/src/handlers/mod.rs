//! Request handlers.
//!
//! Each submodule provides the async handler functions for one resource.
//! Handlers delegate to `maaslin_core` and map errors via
//! [`AppError`](crate::error::AppError).

pub mod jobs;
