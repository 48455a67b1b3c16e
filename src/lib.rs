//! # procsim: Deterministic Process-Step Kernel
//!
//! A discrete-event kernel for devices that process work one step at a
//! time. Steps are scheduled on an integer tick clock; thresholds and
//! downtimes interrupt them without losing elapsed-time accounting. No
//! async, no threads, no wall-clock time: every run with the same inputs
//! fires the same events in the same order.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │      DeviceRuntime        │ ← dispatches targets to Devices
//! │  ┌────────────────────┐  │
//! │  │     Simulation      │  │ ← execution loop
//! │  │  ┌──────────────┐  │  │
//! │  │  │  Scheduler   │  │  │ ← (tick, priority, lane) min-heap
//! │  │  └──────────────┘  │  │
//! │  │  ┌──────────────┐  │  │
//! │  │  │ EventHandle  │  │  │ ← cancellable entry reference
//! │  │  └──────────────┘  │  │
//! │  │  ┌──────────────┐  │  │
//! │  │  │    Tick      │  │  │ ← integer clock, seconds view
//! │  │  └──────────────┘  │  │
//! │  └────────────────────┘  │
//! └──────────────────────────┘
//! ```

pub mod config;
pub mod device;
pub mod dsl;
pub mod error;
pub mod event;
pub mod eventlog;
pub mod handle;
pub mod integrator;
pub mod scheduler;
pub mod simulation;
pub mod time;

// Re-exports for convenience.
pub use config::SimConfig;
pub use device::{
    BatchServer, ClosureKind, Device, DeviceId, DeviceRuntime, DeviceState, Downtime, DowntimeId,
    DowntimeKind, DowntimePolicy, FlowProcessor, ProcessBehavior,
};
pub use dsl::SimulationBuilder;
pub use error::{SimError, SimResult};
pub use event::{Event, Priority, ProcessTarget, SeqNo};
pub use eventlog::{logs_match, EventLog};
pub use handle::EventHandle;
pub use integrator::Integrator;
pub use scheduler::Scheduler;
pub use simulation::{EventHandler, Simulation, SimulationContext, DEFAULT_PRIORITY};
pub use time::{Tick, TickResolution};
