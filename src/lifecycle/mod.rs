//! Process lifecycle: startup, serving, and graceful shutdown.
//!
//! ```text
//! SIGINT/SIGTERM ─► SignalListener ─► cancellation
//!                                        │
//!                 ShutdownCoordinator ◄──┘
//!                   1. ServerHandle::shutdown(deadline)   (drain requests)
//!                   2. Store::close                       (database)
//!
//! supervise() runs RestServer::run and the coordinator, and returns once both finish.
//! ```

pub mod coordinator;
pub mod error;
pub mod server;
pub mod signal;
pub mod startup;
pub mod supervisor;
