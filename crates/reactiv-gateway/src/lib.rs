// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operational HTTP surface for the fallback system.
//!
//! Exposes status, manual dispatch, manual recovery and on-demand queue
//! processing over a small axum router. Everything except `/health` sits
//! behind bearer token auth.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use server::{GatewayState, ServerConfig, router, start_server};
