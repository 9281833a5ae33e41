//! Utility modules
//!
//! Provides logging setup, the one-shot load gate used by packs, and the
//! sequential background work queue.

pub mod load_gate;
pub mod logging;
pub mod work_queue;

pub use load_gate::LoadGate;
pub use logging::init_logging;
pub use work_queue::WorkQueue;
