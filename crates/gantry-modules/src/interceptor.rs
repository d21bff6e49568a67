// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2026 Pegasus Heavy Industries, LLC

//! Engine-invoked interceptors.
//!
//! [`Interceptor`] is the [`ModuleHooks`] implementation handed to the
//! engine for the duration of an instantiate or run call. It carries no
//! state of its own beyond a borrow of the live-context table: the engine
//! supplies the referrer, the referrer carries its context id, and the
//! matching host callback is looked up and invoked on the spot.
//!
//! Every fallible step either succeeds and continues or aborts the hook,
//! leaving whatever error state the engine has set for the engine to
//! surface. No partial module object is ever returned.

use crate::context::{ContextTable, ModuleContext};
use crate::engine::{Engine, EngineError, EngineResult, ModuleHooks, ModuleId};
use tracing::trace;

pub(crate) struct Interceptor<'a> {
    contexts: &'a ContextTable,
}

impl<'a> Interceptor<'a> {
    pub(crate) fn new(contexts: &'a ContextTable) -> Self {
        Self { contexts }
    }

    /// Looks up the context `module` was created under.
    ///
    /// The engine stores the context id alongside each module, which is what
    /// guarantees the host is never asked to act for a module through a
    /// context other than its own.
    fn context_of<'s, E: Engine>(
        &'s self,
        engine: &E,
        module: ModuleId,
    ) -> EngineResult<&'s ModuleContext> {
        let id = engine.module_context(module)?;
        self.contexts.get(id).ok_or_else(|| {
            EngineError::Internal(format!(
                "module {:?} was created under {:?}, which has been destroyed",
                module, id
            ))
        })
    }
}

impl<E: Engine> ModuleHooks<E> for Interceptor<'_> {
    fn resolve_import(
        &mut self,
        engine: &mut E,
        specifier: &E::Value,
        attributes: &E::Value,
        referrer: ModuleId,
    ) -> EngineResult<ModuleId> {
        let context = self.context_of(engine, referrer)?;
        let callback = engine.ref_value(context.on_import())?;
        let receiver = engine.global()?;

        let referrer_name = engine.module_name(referrer)?;
        trace!("resolving import {:?} from '{}'", specifier, referrer_name);
        let referrer_name = engine.new_string(&referrer_name)?;

        let args = [specifier.clone(), attributes.clone(), referrer_name];
        let result = engine.call(&receiver, &callback, &args)?;

        let handle = engine.unwrap_handle(&result)?;
        Ok(handle.id())
    }

    fn evaluate_synthetic(&mut self, engine: &mut E, module: ModuleId) -> EngineResult<()> {
        let context = self.context_of(engine, module)?;
        let callback = engine.ref_value(context.on_evaluate())?;
        let receiver = engine.global()?;

        let module_name = engine.module_name(module)?;
        trace!("evaluating synthetic module '{}'", module_name);
        let module_name = engine.new_string(&module_name)?;

        let args = [module_name];
        engine.call(&receiver, &callback, &args)?;

        Ok(())
    }
}
