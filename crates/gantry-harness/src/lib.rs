// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2026 Pegasus Heavy Industries, LLC

//! # gantry-harness
//!
//! A deterministic, in-memory implementation of the
//! [`Engine`](gantry_modules::Engine) boundary, built for exercising the
//! gantry module bridge in tests.
//!
//! The harness keeps real module records with the full lifecycle state
//! machine and resolves imports by calling back through whatever hooks the
//! bridge hands it, but replaces script execution with a miniature line
//! format: `import "name"` requests, `export name = literal` bindings,
//! bare literals as completion values, and `throw "msg"` for evaluation
//! failures. That is enough surface to drive every path of the callback
//! protocol, and nothing more.
//!
//! ```rust,ignore
//! use gantry_harness::{HarnessEngine, Value};
//! use gantry_modules::ModuleHost;
//!
//! let mut host = ModuleHost::new(HarnessEngine::new());
//! let context = host.create_context(on_import, on_evaluate)?;
//! let module = host.create_module("a.js", &Value::String("import \"b\"".into()), 0, context)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
mod source;
pub mod value;

// Re-exports
pub use engine::{HarnessEngine, ModuleState};
pub use value::{HostFunction, Value};
