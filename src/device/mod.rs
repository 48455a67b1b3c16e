//! Devices: per-entity process-step controllers driven by events.
//!
//! A device never calls into another device. It reacts to the
//! [`ProcessTarget`](crate::event::ProcessTarget)s the runtime hands it,
//! and everything it wants to happen later goes back through the
//! scheduler.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`id`] | [`DeviceId`] newtype |
//! | [`behavior`] | [`ProcessBehavior`] trait |
//! | [`machine`] | [`Device`] step state machine |
//! | [`threshold`] | [`ThresholdSet`], [`ClosureKind`] |
//! | [`downtime`] | [`Downtime`], [`DowntimeId`], [`DowntimeKind`], [`DowntimePolicy`] |
//! | [`state`] | [`DeviceState`] label, [`StateTimes`] |
//! | [`trace`] | [`TraceEntry`], [`TraceOp`], [`TraceFlags`] |
//! | [`runtime`] | [`DeviceRuntime`] |
//! | [`builtin`] | [`BatchServer`], [`FlowProcessor`] |

pub mod behavior;
pub mod builtin;
pub mod downtime;
pub mod id;
pub mod machine;
pub mod runtime;
pub mod state;
pub mod threshold;
pub mod trace;

pub use behavior::ProcessBehavior;
pub use builtin::{BatchServer, FlowProcessor};
pub use downtime::{Downtime, DowntimeId, DowntimeKind, DowntimePolicy};
pub use id::DeviceId;
pub use machine::{Device, STEP_COMPLETION_PRIORITY, UNSCHEDULED_UPDATE_PRIORITY};
pub use runtime::DeviceRuntime;
pub use state::{DeviceState, StateTimes};
pub use threshold::{ClosureKind, ThresholdSet};
pub use trace::{TraceEntry, TraceFlags, TraceOp};
