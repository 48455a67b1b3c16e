//! Built-in behaviors: BatchServer and FlowProcessor.
//!
//! Simple reference behaviors used for testing and demonstration.

pub mod batch;
pub mod flow;

pub use batch::BatchServer;
pub use flow::FlowProcessor;
