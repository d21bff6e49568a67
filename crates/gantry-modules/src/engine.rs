// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2026 Pegasus Heavy Industries, LLC

//! The engine boundary.
//!
//! The script engine is an external collaborator: it parses, compiles, and
//! executes code, and owns every module object. This module pins down the
//! exact surface the bridge consumes from it (value plumbing, durable
//! references, sequence access, the script/module operations, and opaque
//! handle marshaling) as the [`Engine`] trait, together with the
//! [`ModuleHooks`] trait the engine invokes back into while instantiating
//! and evaluating modules.
//!
//! Everything here is synchronous. Hook invocations are reentrant call-ins
//! on the engine's single logical thread of control, not concurrency.

use crate::context::ContextId;
use crate::handle::ModuleHandle;
use std::fmt;
use thiserror::Error;

/// Result type for operations crossing the engine boundary.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Errors raised by the engine across the embedding boundary.
///
/// These are propagated upward unchanged; the bridge never rewrites or
/// swallows them. Whatever error state the engine keeps alongside (a pending
/// exception, a diagnostic) stays in the engine for the embedder to inspect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Source text failed to parse or compile
    #[error("SyntaxError: {0}")]
    Syntax(String),

    /// A value had the wrong type for an operation
    #[error("TypeError: {0}")]
    Type(String),

    /// A name or reference could not be resolved
    #[error("ReferenceError: {0}")]
    Reference(String),

    /// A value was out of range
    #[error("RangeError: {0}")]
    Range(String),

    /// Script or callback code threw
    #[error("Uncaught: {0}")]
    Thrown(String),

    /// Internal engine error
    #[error("internal engine error: {0}")]
    Internal(String),
}

/// Identifies a module object inside the engine.
///
/// The id is meaningful only to the engine that issued it. The bridge passes
/// it around opaquely, wrapped in a tagged [`ModuleHandle`] whenever it
/// crosses the host-facing API.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(u32);

impl ModuleId {
    /// Wraps a raw engine module index.
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw engine module index.
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleId({})", self.0)
    }
}

/// Identifies a durable reference slot in the engine's reference table.
///
/// A durable reference keeps a value alive past the stack frame that created
/// it. Each slot is released exactly once via [`Engine::drop_ref`]; the
/// bridge uses one slot per registered callback.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefId(u32);

impl RefId {
    /// Wraps a raw reference slot index.
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw reference slot index.
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefId({})", self.0)
    }
}

/// Host hooks the engine invokes while instantiating and evaluating modules.
///
/// The engine calls [`resolve_import`](ModuleHooks::resolve_import) once per
/// import request it encounters during instantiation, and
/// [`evaluate_synthetic`](ModuleHooks::evaluate_synthetic) when a synthetic
/// module reaches evaluation. Both receive the engine back so they can call
/// into it reentrantly.
pub trait ModuleHooks<E: Engine> {
    /// Resolves the module imported as `specifier` by `referrer`.
    ///
    /// `attributes` is the import-attributes value, forwarded verbatim.
    /// On failure the pending import fails; no module is produced.
    fn resolve_import(
        &mut self,
        engine: &mut E,
        specifier: &E::Value,
        attributes: &E::Value,
        referrer: ModuleId,
    ) -> EngineResult<ModuleId>;

    /// Populates the exports of the synthetic module being evaluated.
    ///
    /// Fires at most once per module, during its evaluation.
    fn evaluate_synthetic(&mut self, engine: &mut E, module: ModuleId) -> EngineResult<()>;
}

/// The operations the bridge consumes from the script engine.
///
/// An implementation owns the actual module objects and drives their
/// lifecycle (`created → instantiating → instantiated → evaluating →
/// evaluated`, with a terminal `failed` state reachable from any
/// non-terminal state). The bridge only ever holds [`ModuleId`]s and the
/// tagged handles built over them.
pub trait Engine: Sized {
    /// The engine-native value representation.
    type Value: Clone + fmt::Debug;

    /// The global object, used as the receiver for callback invocations.
    fn global(&mut self) -> EngineResult<Self::Value>;

    /// Creates an engine string value from UTF-8 text.
    fn new_string(&mut self, text: &str) -> EngineResult<Self::Value>;

    /// Reads an engine string value back out as UTF-8 text.
    fn string_of(&self, value: &Self::Value) -> EngineResult<String>;

    /// Whether `value` can be invoked as a function.
    fn is_callable(&self, value: &Self::Value) -> bool;

    /// Invokes `function` with `receiver` and positional `args`.
    fn call(
        &mut self,
        receiver: &Self::Value,
        function: &Self::Value,
        args: &[Self::Value],
    ) -> EngineResult<Self::Value>;

    /// Allocates a durable reference keeping `value` alive until released.
    fn new_ref(&mut self, value: &Self::Value) -> EngineResult<RefId>;

    /// Reads the value held by a durable reference.
    fn ref_value(&self, reference: RefId) -> EngineResult<Self::Value>;

    /// Releases a durable reference. Each slot is released exactly once.
    fn drop_ref(&mut self, reference: RefId) -> EngineResult<()>;

    /// Length of an engine sequence value.
    fn sequence_len(&self, value: &Self::Value) -> EngineResult<usize>;

    /// Element `index` of an engine sequence value.
    fn sequence_get(&mut self, value: &Self::Value, index: usize) -> EngineResult<Self::Value>;

    /// Compiles and executes a flat script attributed to `name` starting at
    /// `line_offset`, returning its completion value.
    fn run_script(
        &mut self,
        name: &str,
        source: &Self::Value,
        line_offset: i32,
    ) -> EngineResult<Self::Value>;

    /// Compiles `source` as a source-backed module attributed to `name` and
    /// `line_offset`, recording `context` as the user-data consulted when
    /// the module's own imports are resolved.
    fn new_module(
        &mut self,
        name: &str,
        source: &Self::Value,
        line_offset: i32,
        context: ContextId,
    ) -> EngineResult<ModuleId>;

    /// Creates a module with the given fixed export names and no source
    /// body, recording `context` as the user-data consulted when the module
    /// is evaluated.
    fn new_synthetic_module(
        &mut self,
        name: &str,
        export_names: &[String],
        context: ContextId,
    ) -> EngineResult<ModuleId>;

    /// The human-readable name a module was created with.
    fn module_name(&self, module: ModuleId) -> EngineResult<String>;

    /// The context recorded when `module` was created. A module never
    /// changes its context.
    fn module_context(&self, module: ModuleId) -> EngineResult<ContextId>;

    /// Assigns `value` to the export binding `name` on a synthetic module.
    /// The name must be one of the names supplied at creation.
    fn set_module_export(
        &mut self,
        module: ModuleId,
        name: &str,
        value: Self::Value,
    ) -> EngineResult<()>;

    /// Instantiates `module`: resolves its transitive imports through
    /// `hooks` without evaluating anything.
    fn instantiate_module(
        &mut self,
        module: ModuleId,
        hooks: &mut dyn ModuleHooks<Self>,
    ) -> EngineResult<()>;

    /// Instantiates and evaluates `module`, returning its completion value.
    ///
    /// All transitive import resolutions complete, in the engine's own
    /// topological order, before evaluation of any module in the graph
    /// begins. Evaluation happens at most once per module; running an
    /// already-evaluated module returns its recorded completion value. The
    /// completion value may represent a deferred result; this layer neither
    /// awaits nor polls it.
    fn run_module(
        &mut self,
        module: ModuleId,
        hooks: &mut dyn ModuleHooks<Self>,
    ) -> EngineResult<Self::Value>;

    /// The namespace object of an instantiated or evaluated module,
    /// exposing its current export bindings.
    fn module_namespace(&mut self, module: ModuleId) -> EngineResult<Self::Value>;

    /// Wraps a module handle into an engine value so it can travel through
    /// callback returns.
    fn wrap_handle(&mut self, handle: ModuleHandle) -> EngineResult<Self::Value>;

    /// Unwraps an engine value produced by [`wrap_handle`](Engine::wrap_handle),
    /// validating that it names a live module of the tagged kind.
    fn unwrap_handle(&self, value: &Self::Value) -> EngineResult<ModuleHandle>;
}
