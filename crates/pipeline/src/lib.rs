//! Reward pipelines over a tracked profile.
//!
//! Every pipeline is a pure compute step: it mutates a
//! [`TrackedProfile`](guildxp_core::tracked::TrackedProfile) (which mirrors
//! each change into the pending patch) and returns a [`SideEffects`] bundle
//! describing the role changes, messages and audit events it wants. Nothing
//! here performs I/O; [`SideEffectApplier`] applies a bundle against the live
//! chat platform afterwards.
//!
//! [`activity`] composes the individual pipelines in their fixed order for
//! each kind of member activity.

pub mod achievements;
pub mod activity;
pub mod apply;
pub mod context;
pub mod daily;
pub mod effects;
pub mod leveling;
pub mod platform;
pub mod quests;
pub mod rewards;
pub mod shop;
pub mod template;
pub mod temp_roles;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod xp;

pub use apply::{ApplyReport, SideEffectApplier};
pub use context::ActivityContext;
pub use effects::{OutgoingMessage, RoleChange, SideEffects};
pub use platform::{ChatPlatform, Member, PlatformError};
