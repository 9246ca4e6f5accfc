//! A capability-scoped functional map: one concurrent in-memory store,
//! accessed through read-only, write-only and read-write façades.
//!
//! # Features
//! - **Capability Segregation**: Each façade hands callbacks its own entry
//!   view type, so a read-only map cannot write, and a write-only map cannot
//!   observe the store.
//! - **Functional Evaluation**: All data access goes through `eval`, which
//!   applies a caller-supplied function to a per-invocation entry view.
//! - **Typed Metadata**: Entries carry `MetaParams` (lifespan, max idle,
//!   version, creation time) merged on every write.
//! - **Listeners**: Synchronous create / modify / remove / write notifications
//!   over a copy-on-write registry.
//! - **Sync & Async**: Each operation returns a `Completion`, which can be
//!   awaited or waited on. `WaitMode::Blocking` computes it on the caller's
//!   thread, `WaitMode::NonBlocking` on an executor.
//! - **Observability**: Structured `tracing` events and atomic metrics.
//!
//! # Example
//! ```
//! use fibre_functional::{FunctionalMap, Lifespan, WaitMode, Writable, WriteEntry};
//!
//! let map = FunctionalMap::<u32, String>::builder()
//!   .wait_mode(WaitMode::Blocking)
//!   .build()
//!   .unwrap();
//!
//! map
//!   .write_only()
//!   .eval(1, |view| view.set("one".to_string(), [Writable::from(Lifespan(1000))]))
//!   .wait();
//!
//! let value = map.read_only().eval(1, |view| view.find()).wait();
//! assert_eq!(value.as_deref().map(String::as_str), Some("one"));
//! ```

// Public modules that form the API
pub mod builder;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod handles;
pub mod listener;
pub mod meta;
pub mod metrics;
pub mod pair;
pub mod params;
pub mod traversable;
pub mod view;

// Internal, crate-only modules
mod entry;
mod map;
mod shared;
mod store;
mod time;

// Re-export the primary user-facing types for convenience
pub use builder::FunctionalMapBuilder;
pub use config::FunctionalMapConfig;
pub use dispatch::Completion;
pub use error::{Error, Result};
pub use executor::{Executor, ThreadExecutor};
pub use handles::{ReadOnlyMap, ReadWriteMap, WriteOnlyMap};
pub use listener::{ListenerHandle, ReadWriteListener, ReadWriteListeners, WriteListener, WriteListeners};
pub use map::{FunctionalMap, Status};
pub use meta::{
  Created, EntryVersion, EntryVersionParam, LastUsed, Lifespan, MaxIdle, MetaParam, MetaParamId,
  MetaParamLookup, MetaParams, MetaValue, Writable, WritableMetaParam,
};
pub use metrics::MetricsSnapshot;
pub use pair::Pair;
pub use params::{AccessMode, DefaultLifespan, Param, ParamId, Params, StreamMode, StreamModes, WaitMode};
pub use traversable::{CloseableIterator, Traversable};
pub use view::{Done, ReadEntry, ReadEntryView, ReadWriteEntryView, WriteEntry, WriteEntryView};

#[cfg(feature = "rayon")]
pub use executor::RayonExecutor;
#[cfg(feature = "tokio")]
pub use executor::TokioExecutor;
