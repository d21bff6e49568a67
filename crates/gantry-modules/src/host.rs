// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2026 Pegasus Heavy Industries, LLC

//! Host-facing entry points.
//!
//! [`ModuleHost`] owns the engine and the table of live module contexts,
//! and exposes the loading-session lifecycle to the embedder: register a
//! callback pair, create source-backed and synthetic modules under it, set
//! exports, and run scripts and modules. Whenever the engine needs a host
//! decision mid-run (an import to resolve, a synthetic module to populate),
//! the call is routed through the interceptors bound to the context the
//! module was created under.

use crate::context::{ContextId, ContextTable, ModuleContext};
use crate::engine::Engine;
use crate::error::{HostError, Result};
use crate::handle::ModuleHandle;
use crate::interceptor::Interceptor;
use tracing::debug;

/// Longest accepted module or script name, in bytes.
///
/// Names longer than this are rejected with [`HostError::NameTooLong`];
/// they are never silently truncated. The bound exists so that embedders
/// marshaling names through fixed-size buffers have an exact, documented
/// contract to size them against.
pub const MAX_MODULE_NAME_BYTES: usize = 1024;

/// The bridge between an embedding host and the engine's module system.
///
/// One `ModuleHost` wraps one engine. Module contexts registered with
/// [`create_context`](ModuleHost::create_context) must outlive every module
/// created under them; destroying a context while its modules can still be
/// instantiated or evaluated causes those operations to fail.
pub struct ModuleHost<E: Engine> {
    engine: E,
    contexts: ContextTable,
}

impl<E: Engine> ModuleHost<E> {
    /// Wraps an engine.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            contexts: ContextTable::new(),
        }
    }

    /// Shared access to the underlying engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Exclusive access to the underlying engine.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Consumes the host, returning the engine.
    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Registers a callback pair as a new module context.
    ///
    /// `on_import` is invoked as `(specifier, attributes, referrer_name)`
    /// and must return a module handle; `on_evaluate` is invoked as
    /// `(module_name)` and is expected to populate the module's declared
    /// exports via [`set_export`](ModuleHost::set_export). Both values must
    /// be callable. A durable reference is taken to each; the pair is
    /// released together by [`destroy_context`](ModuleHost::destroy_context).
    pub fn create_context(
        &mut self,
        on_import: E::Value,
        on_evaluate: E::Value,
    ) -> Result<ContextId> {
        if !self.engine.is_callable(&on_import) {
            return Err(HostError::CallbackNotCallable { slot: "import" });
        }
        if !self.engine.is_callable(&on_evaluate) {
            return Err(HostError::CallbackNotCallable { slot: "evaluate" });
        }

        let import_ref = self.engine.new_ref(&on_import)?;
        let evaluate_ref = match self.engine.new_ref(&on_evaluate) {
            Ok(reference) => reference,
            Err(error) => {
                // No partial context: the first handle must not outlive a
                // failed creation.
                let _ = self.engine.drop_ref(import_ref);
                return Err(error.into());
            }
        };

        let id = self
            .contexts
            .insert(ModuleContext::new(import_ref, evaluate_ref));
        debug!("created module context {:?}", id);
        Ok(id)
    }

    /// Destroys a module context, releasing both callback references.
    ///
    /// The context must not be destroyed while modules created under it can
    /// still be instantiated or evaluated: any later interceptor dispatch
    /// against it fails. Destroying an id twice reports
    /// [`HostError::StaleContext`].
    pub fn destroy_context(&mut self, context: ContextId) -> Result<()> {
        let entry = self.contexts.remove(context).ok_or(HostError::StaleContext)?;
        debug!("destroying module context {:?}", context);

        // Release both together even if the first release reports an engine
        // error; a context is never left half torn down.
        let (on_import, on_evaluate) = entry.into_refs();
        let first = self.engine.drop_ref(on_import);
        let second = self.engine.drop_ref(on_evaluate);
        first.and(second)?;
        Ok(())
    }

    /// Compiles and executes a flat (non-module) script.
    ///
    /// `name` and `line_offset` attribute the source for diagnostics and
    /// stack traces. Returns the script's completion value.
    pub fn run_script(&mut self, name: &str, source: &E::Value, line_offset: i32) -> Result<E::Value> {
        check_name(name)?;
        Ok(self.engine.run_script(name, source, line_offset)?)
    }

    /// Compiles `source` as a source-backed module under `context`.
    ///
    /// Imports performed by the module, static or dynamic, are resolved
    /// through the import callback registered in `context`. Compilation
    /// failure produces no module handle.
    pub fn create_module(
        &mut self,
        name: &str,
        source: &E::Value,
        line_offset: i32,
        context: ContextId,
    ) -> Result<ModuleHandle> {
        check_name(name)?;
        if self.contexts.get(context).is_none() {
            return Err(HostError::StaleContext);
        }

        let id = self.engine.new_module(name, source, line_offset, context)?;
        debug!("created module '{}' under {:?}", name, context);
        Ok(ModuleHandle::Source(id))
    }

    /// Creates a synthetic module under `context` with a fixed set of
    /// export names.
    ///
    /// The names are read element-by-element out of the engine sequence
    /// `export_names` within this call; no engine reference to the sequence
    /// is retained. Duplicates are collapsed, first occurrence winning. The
    /// evaluate callback registered in `context` fires when the module is
    /// evaluated and is expected to assign each declared name.
    pub fn create_synthetic_module(
        &mut self,
        name: &str,
        export_names: &E::Value,
        context: ContextId,
    ) -> Result<ModuleHandle> {
        check_name(name)?;
        if self.contexts.get(context).is_none() {
            return Err(HostError::StaleContext);
        }

        let count = self.engine.sequence_len(export_names)?;
        let mut names = Vec::with_capacity(count);
        for index in 0..count {
            let element = self.engine.sequence_get(export_names, index)?;
            names.push(self.engine.string_of(&element)?);
        }
        let names = dedup_names(names);

        let id = self.engine.new_synthetic_module(name, &names, context)?;
        debug!(
            "created synthetic module '{}' under {:?} with {} export(s)",
            name,
            context,
            names.len()
        );
        Ok(ModuleHandle::Synthetic(id))
    }

    /// Assigns `value` to the export binding `name` on a synthetic module.
    ///
    /// `name` must be one of the names supplied at creation; the engine
    /// reports the violation otherwise.
    pub fn set_export(&mut self, module: ModuleHandle, name: &str, value: E::Value) -> Result<()> {
        Ok(self.engine.set_module_export(module.id(), name, value)?)
    }

    /// Instantiates a module without evaluating it, resolving its
    /// transitive imports through the import callbacks of the contexts the
    /// modules in the graph were created under.
    pub fn instantiate_module(&mut self, module: ModuleHandle) -> Result<()> {
        let mut hooks = Interceptor::new(&self.contexts);
        Ok(self.engine.instantiate_module(module.id(), &mut hooks)?)
    }

    /// Instantiates and evaluates a module to completion.
    ///
    /// Fails if instantiation or evaluation fails anywhere in the
    /// transitive import graph; the failing step's error is returned
    /// unchanged. Running an already-evaluated module returns its recorded
    /// completion value without re-evaluating.
    pub fn run_module(&mut self, module: ModuleHandle) -> Result<E::Value> {
        let mut hooks = Interceptor::new(&self.contexts);
        Ok(self.engine.run_module(module.id(), &mut hooks)?)
    }

    /// The namespace object of an instantiated or evaluated module.
    pub fn module_namespace(&mut self, module: ModuleHandle) -> Result<E::Value> {
        Ok(self.engine.module_namespace(module.id())?)
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.len() > MAX_MODULE_NAME_BYTES {
        return Err(HostError::NameTooLong { len: name.len() });
    }
    Ok(())
}

/// Collapses duplicate export names, keeping the first occurrence.
fn dedup_names(names: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !unique.contains(&name) {
            unique.push(name);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_at_the_bound_pass() {
        assert!(check_name(&"a".repeat(MAX_MODULE_NAME_BYTES)).is_ok());
        assert!(matches!(
            check_name(&"a".repeat(MAX_MODULE_NAME_BYTES + 1)),
            Err(HostError::NameTooLong { len }) if len == MAX_MODULE_NAME_BYTES + 1
        ));
    }

    #[test]
    fn name_length_is_measured_in_bytes() {
        // 512 two-byte characters fit; 513 do not.
        assert!(check_name(&"ß".repeat(512)).is_ok());
        assert!(check_name(&"ß".repeat(513)).is_err());
    }

    #[test]
    fn duplicate_export_names_collapse_in_order() {
        let names = vec![
            "default".to_string(),
            "value".to_string(),
            "default".to_string(),
        ];
        assert_eq!(dedup_names(names), vec!["default", "value"]);
    }
}
