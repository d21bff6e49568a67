// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2026 Pegasus Heavy Industries, LLC

//! Opaque module handles.
//!
//! Engine-internal module objects cross the host-facing API as tagged
//! handles rather than raw pointers, so unwrapping a value that came back
//! from a host callback can be validated instead of trusted blindly. A
//! handle is a transient token: it is minted fresh each time a module
//! crosses the boundary and carries no reference count of its own.

use crate::engine::ModuleId;

/// An opaque, tagged handle to an engine-internal module object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleHandle {
    /// A module compiled from source text.
    Source(ModuleId),
    /// A module with no source body whose exports are populated by the host.
    Synthetic(ModuleId),
}

impl ModuleHandle {
    /// The engine-internal module id under the tag.
    pub fn id(self) -> ModuleId {
        match self {
            ModuleHandle::Source(id) | ModuleHandle::Synthetic(id) => id,
        }
    }

    /// Whether this handle names a source-backed module.
    pub fn is_source(self) -> bool {
        matches!(self, ModuleHandle::Source(_))
    }

    /// Whether this handle names a synthetic module.
    pub fn is_synthetic(self) -> bool {
        matches!(self, ModuleHandle::Synthetic(_))
    }
}
