// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from health to operating mode and permitted channels.
//!
//! All functions here are pure. The permitted list for a mode is always a
//! subset of the list for the level it was derived from, and both keep
//! channel preference order.

use reactiv_core::{ChannelKind, ChannelSet, HealthLevel, OperatingMode};

use ChannelKind::{Backup, Bridge, Local, Primary};

/// Channels allowed at each health level, in try order.
pub fn level_channels(level: HealthLevel) -> &'static [ChannelKind] {
    match level {
        HealthLevel::Healthy => &[Primary, Backup, Bridge, Local],
        HealthLevel::Degraded => &[Backup, Bridge, Local],
        HealthLevel::Critical => &[Bridge, Local],
        HealthLevel::Fallback => &[Local],
    }
}

/// Channels allowed in each operating mode, in try order.
pub fn mode_channels(mode: OperatingMode) -> &'static [ChannelKind] {
    match mode {
        OperatingMode::Normal => &[Primary, Backup, Bridge, Local],
        OperatingMode::Backup => &[Backup, Bridge, Local],
        OperatingMode::Bridge => &[Bridge, Local],
        OperatingMode::LocalOnly => &[Local],
    }
}

/// Derives the operating mode from the current level and primary state.
pub fn derive_mode(level: HealthLevel, primary_active: bool) -> OperatingMode {
    match level {
        HealthLevel::Healthy if primary_active => OperatingMode::Normal,
        HealthLevel::Healthy | HealthLevel::Degraded => OperatingMode::Backup,
        HealthLevel::Critical => OperatingMode::Bridge,
        HealthLevel::Fallback => OperatingMode::LocalOnly,
    }
}

/// The ordered channels a dispatch may try right now.
///
/// Intersects the mode's list with the level's list and drops channels that
/// are not registered.
pub fn permitted_channels(
    level: HealthLevel,
    mode: OperatingMode,
    registered: &ChannelSet,
) -> Vec<ChannelKind> {
    let allowed = level_channels(level);
    mode_channels(mode)
        .iter()
        .copied()
        .filter(|kind| allowed.contains(kind) && registered.contains(*kind))
        .collect()
}
