// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2026 Pegasus Heavy Industries, LLC

//! # gantry-modules
//!
//! A bridge between an embedding host and a script engine's module system.
//!
//! The engine stays an opaque dependency that parses, compiles, and executes
//! code behind the [`Engine`] trait, while the host supplies the decisions
//! the engine cannot make itself:
//!
//! - **Import resolution**: whenever a module created through this bridge
//!   imports a specifier (statically or dynamically), the import callback of
//!   the module's context is invoked with the specifier, the
//!   import-attributes value, and the referrer's name, and must hand back a
//!   module handle.
//! - **Synthetic module evaluation**: a synthetic module has no source; when
//!   the engine evaluates it, the evaluate callback of its context is
//!   invoked so the host can populate the declared export bindings.
//!
//! Callback pairs are registered as [module contexts](ContextId) with
//! explicit create/destroy lifecycles; modules carry their context id for
//! life, so each import is always resolved by the callbacks of the context
//! the referrer was created under.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use gantry_modules::ModuleHost;
//!
//! let mut host = ModuleHost::new(engine);
//! let context = host.create_context(on_import, on_evaluate)?;
//!
//! let module = host.create_module("main.js", &source, 0, context)?;
//! let completion = host.run_module(module)?;
//!
//! host.destroy_context(context)?;
//! ```
//!
//! Everything is single-threaded and cooperative: callbacks are reentrant
//! call-ins from the engine, and a callback that never returns blocks the
//! thread of control. This layer performs no retries and no local recovery;
//! every failure unwinds the current boundary call with the originating
//! error intact.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod engine;
pub mod error;
pub mod handle;
pub mod host;
mod interceptor;

// Re-exports
pub use context::ContextId;
pub use engine::{Engine, EngineError, EngineResult, ModuleHooks, ModuleId, RefId};
pub use error::{HostError, Result};
pub use handle::ModuleHandle;
pub use host::{MAX_MODULE_NAME_BYTES, ModuleHost};

/// Version of the gantry module bridge
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
