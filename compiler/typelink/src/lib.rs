//! Runtime resolution and deduplication of typelink type metadata.
//!
//! A program is made of independently built modules, each embedding a
//! read-only table of type descriptors whose cross references are 32-bit
//! offsets. A [`Runtime`] loads those modules, resolves offsets to live
//! addresses, registers descriptors created after load, and collapses
//! descriptors that several modules define for the same type.
//!
//! # Flow
//!
//! ```text
//! Module ──add_module──▶ Runtime ──link_types──▶ override maps
//!                           │
//!                           ├─ resolve_{name,type,text}_off ─▶ Name / Type / Addr
//!                           └─ allocate / register_object   ─▶ runtime-created objects
//! ```
//!
//! Corrupt metadata is unrecoverable: the plain entry points log and stop
//! according to [`RuntimeConfig::on_fatal`]. The `try_` variants return a
//! [`ResolveError`] instead.

mod arena;
mod config;
mod equal;
mod error;
mod link;
mod module;
mod objects;
mod resolve;
mod runtime;
mod stack;
#[cfg(test)]
mod test_support;
pub mod types;

use std::sync::Once;

pub use config::{FatalAction, RuntimeConfig, DEFAULT_ARENA_BASE, ENV_FATAL, ENV_SEPARATE_CODE};
pub use equal::{types_equal, EqualityMemo};
pub use error::{LoadError, OffsetKind, ResolveError};
pub use link::LinkStats;
pub use module::{CodeLayout, Module, TextSection, TypeMap};
pub use runtime::{Allocation, Runtime};
pub use types::{Name, Shape, Type};

pub use typelink_abi as abi;

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset, and only ever runs once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            // A subscriber installed by the host application wins.
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init();
        }
    });
}
