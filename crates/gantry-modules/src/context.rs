// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2026 Pegasus Heavy Industries, LLC

//! Module contexts.
//!
//! A module context pairs the two callback handles that govern one loading
//! session: one callback resolves imports, the other evaluates synthetic
//! modules. A host may run several independent sessions at once (one per
//! isolated realm, say); every module records the id of the context it was
//! created under, and only that context's callbacks are ever consulted for
//! it.
//!
//! Contexts live in a host-owned table keyed by ids that are never reused,
//! so a destroyed context is always detectable: a stale id cannot alias a
//! context created later.

use crate::engine::RefId;
use rustc_hash::FxHashMap;
use std::fmt;

/// Identifies a module context registered with a
/// [`ModuleHost`](crate::host::ModuleHost).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u32);

impl fmt::Debug for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextId({})", self.0)
    }
}

/// The callback pair backing one loading session.
///
/// Both handles are live for the whole lifetime of the context and are
/// released together when it is destroyed; a context is never left
/// partially destroyed.
pub(crate) struct ModuleContext {
    on_import: RefId,
    on_evaluate: RefId,
}

impl ModuleContext {
    pub(crate) fn new(on_import: RefId, on_evaluate: RefId) -> Self {
        Self {
            on_import,
            on_evaluate,
        }
    }

    pub(crate) fn on_import(&self) -> RefId {
        self.on_import
    }

    pub(crate) fn on_evaluate(&self) -> RefId {
        self.on_evaluate
    }

    /// Tears the context apart for destruction, yielding both handles so
    /// the caller can release them together.
    pub(crate) fn into_refs(self) -> (RefId, RefId) {
        (self.on_import, self.on_evaluate)
    }
}

/// Host-owned table of live contexts.
///
/// Ids increase monotonically and are never handed out twice.
pub(crate) struct ContextTable {
    entries: FxHashMap<u32, ModuleContext>,
    next: u32,
}

impl ContextTable {
    pub(crate) fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
            next: 0,
        }
    }

    pub(crate) fn insert(&mut self, context: ModuleContext) -> ContextId {
        let id = self.next;
        self.next += 1;
        self.entries.insert(id, context);
        ContextId(id)
    }

    pub(crate) fn get(&self, id: ContextId) -> Option<&ModuleContext> {
        self.entries.get(&id.0)
    }

    pub(crate) fn remove(&mut self, id: ContextId) -> Option<ModuleContext> {
        self.entries.remove(&id.0)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ModuleContext {
        ModuleContext::new(RefId::new(0), RefId::new(1))
    }

    #[test]
    fn insert_get_remove() {
        let mut table = ContextTable::new();
        let id = table.insert(context());

        assert!(table.get(id).is_some());
        assert_eq!(table.len(), 1);

        let removed = table.remove(id).unwrap();
        assert_eq!(removed.into_refs(), (RefId::new(0), RefId::new(1)));
        assert!(table.get(id).is_none());
        assert!(table.remove(id).is_none());
    }

    #[test]
    fn ids_are_never_reused() {
        let mut table = ContextTable::new();
        let first = table.insert(context());
        table.remove(first);

        let second = table.insert(context());
        assert_ne!(first, second);
        assert!(table.get(first).is_none());
        assert!(table.get(second).is_some());
    }

    #[test]
    fn contexts_keep_their_callback_slots_apart() {
        let context = ModuleContext::new(RefId::new(4), RefId::new(9));
        assert_eq!(context.on_import(), RefId::new(4));
        assert_eq!(context.on_evaluate(), RefId::new(9));
    }
}
