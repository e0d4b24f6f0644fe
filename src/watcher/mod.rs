//! Directory watch lifecycle for sass compilation.
//!
//! One [`WatchLifecycle`] owns the set of watched directories and every
//! way that set changes, keeping its collaborators in step.
//!
//! # Architecture
//!
//! ```text
//! WatchLifecycle
//!   - WatchRegistry (ordered directory -> handle map)
//!   - Resolves directories against their project root
//!         |
//!    +----------------+--------------------+
//!    |                |                    |
//! WatchService   WatchPersistence   Notifier / LogSink /
//! (notify +      (settings.toml)    StatusReporter
//!  compile loop)
//! ```

mod debouncer;
mod error;
mod lifecycle;
mod persist;
mod registry;
mod service;

pub use debouncer::Debouncer;
pub use error::WatchError;
pub use lifecycle::{WatchLifecycle, WatchLifecycleBuilder};
pub use persist::{SettingsPersistence, WatchPersistence};
pub use registry::{WatchEntry, WatchHandle, WatchRegistry};
pub use service::{NotifyWatchService, WatchService};
