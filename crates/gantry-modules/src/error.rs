// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2026 Pegasus Heavy Industries, LLC

//! Error types for the module bridge

use crate::engine::EngineError;
use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, HostError>;

/// Errors that can occur at the host-facing boundary.
///
/// Argument errors are detected and reported by the bridge itself, before
/// any partial object is constructed. Everything the engine raises,
/// including failures of host callbacks invoked through it, passes through
/// as [`HostError::Engine`] unchanged.
#[derive(Debug, Error)]
pub enum HostError {
    /// Engine failure, propagated unchanged
    #[error("{0}")]
    Engine(#[from] EngineError),

    /// A callback argument was not a callable value
    #[error("{slot} callback is not callable")]
    CallbackNotCallable {
        /// Which callback slot was handed the bad value
        slot: &'static str,
    },

    /// A module or script name exceeded the documented length bound
    #[error("name is {len} bytes, limit is {max} bytes", max = crate::host::MAX_MODULE_NAME_BYTES)]
    NameTooLong {
        /// Byte length of the rejected name
        len: usize,
    },

    /// The context id does not name a live module context
    #[error("unknown or destroyed module context")]
    StaleContext,
}
