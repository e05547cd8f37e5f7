// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions at the two seams of the fallback core.
//!
//! Channels and state stores are both used behind `Arc<dyn ...>` and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod channel;
pub mod store;

pub use channel::{ChannelAdapter, ChannelSet};
pub use store::StateStore;
