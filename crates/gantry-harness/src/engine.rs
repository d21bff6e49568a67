// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2026 Pegasus Heavy Industries, LLC

//! The deterministic harness engine.
//!
//! Implements the [`Engine`] boundary over in-memory module records: enough
//! of a module system to exercise the bridge protocol (the full per-module
//! state machine, resolve-everything-then-evaluate ordering, at-most-once
//! evaluation, declared-export enforcement) without any of a real engine's
//! parsing or execution. Sources use the miniature line format scanned by
//! the `source` module.

use crate::source::{self, ImportRequest, SourceKind};
use crate::value::Value;
use gantry_modules::{
    ContextId, Engine, EngineError, EngineResult, ModuleHandle, ModuleHooks, ModuleId, RefId,
};
use rustc_hash::FxHashMap;
use std::collections::HashMap;
use std::rc::Rc;

/// Lifecycle states of a harness module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Created, imports not yet resolved
    Created,
    /// Import resolution in progress
    Instantiating,
    /// Imports resolved, not yet evaluated
    Instantiated,
    /// Evaluation in progress
    Evaluating,
    /// Evaluated to completion
    Evaluated,
    /// Instantiation or evaluation failed; terminal
    Failed,
}

enum ModuleKind {
    Source,
    Synthetic { export_names: Vec<String> },
}

struct ModuleRecord {
    name: String,
    context: ContextId,
    kind: ModuleKind,
    state: ModuleState,
    requests: Vec<ImportRequest>,
    bindings: Vec<(String, Value)>,
    throws: Option<String>,
    completion_literal: Value,
    resolved: Vec<ModuleId>,
    exports: HashMap<String, Value>,
    completion: Option<Value>,
}

/// An in-memory engine for driving the module bridge in tests.
pub struct HarnessEngine {
    modules: Vec<ModuleRecord>,
    references: FxHashMap<u32, Value>,
    next_reference: u32,
}

impl HarnessEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
            references: FxHashMap::default(),
            next_reference: 0,
        }
    }

    /// The current lifecycle state of a module, if the id is known.
    pub fn module_state(&self, module: ModuleId) -> Option<ModuleState> {
        self.modules
            .get(module.raw() as usize)
            .map(|record| record.state)
    }

    /// How many durable references are currently alive.
    pub fn live_references(&self) -> usize {
        self.references.len()
    }

    fn index(&self, module: ModuleId) -> EngineResult<usize> {
        let index = module.raw() as usize;
        if index >= self.modules.len() {
            return Err(EngineError::Internal(format!(
                "{:?} does not identify a module",
                module
            )));
        }
        Ok(index)
    }

    fn fail(&mut self, index: usize) {
        self.modules[index].state = ModuleState::Failed;
    }

    fn push_module(&mut self, record: ModuleRecord) -> ModuleId {
        let id = ModuleId::new(self.modules.len() as u32);
        self.modules.push(record);
        id
    }

    fn evaluate(
        &mut self,
        module: ModuleId,
        hooks: &mut dyn ModuleHooks<Self>,
    ) -> EngineResult<Value> {
        let index = self.index(module)?;
        match self.modules[index].state {
            ModuleState::Evaluated => {
                let completion = self.modules[index].completion.clone();
                return Ok(completion.unwrap_or(Value::Undefined));
            }
            // A cycle back into a module mid-evaluation observes no
            // completion value.
            ModuleState::Evaluating => return Ok(Value::Undefined),
            ModuleState::Failed => {
                return Err(EngineError::Internal(format!(
                    "module '{}' previously failed",
                    self.modules[index].name
                )));
            }
            ModuleState::Created | ModuleState::Instantiating => {
                return Err(EngineError::Internal(format!(
                    "module '{}' is not instantiated",
                    self.modules[index].name
                )));
            }
            ModuleState::Instantiated => {}
        }

        self.modules[index].state = ModuleState::Evaluating;

        // Dependencies evaluate before their importer.
        let resolved = self.modules[index].resolved.clone();
        for child in resolved {
            if let Err(error) = self.evaluate(child, hooks) {
                self.fail(index);
                return Err(error);
            }
        }

        let is_synthetic = matches!(self.modules[index].kind, ModuleKind::Synthetic { .. });
        let completion = if is_synthetic {
            if let Err(error) = hooks.evaluate_synthetic(self, module) {
                self.fail(index);
                return Err(error);
            }
            Value::Undefined
        } else {
            let bindings = self.modules[index].bindings.clone();
            for (name, value) in bindings {
                self.modules[index].exports.insert(name, value);
            }
            if let Some(message) = self.modules[index].throws.clone() {
                self.fail(index);
                return Err(EngineError::Thrown(message));
            }
            self.modules[index].completion_literal.clone()
        };

        let record = &mut self.modules[index];
        record.completion = Some(completion.clone());
        record.state = ModuleState::Evaluated;
        Ok(completion)
    }
}

impl Default for HarnessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for HarnessEngine {
    type Value = Value;

    fn global(&mut self) -> EngineResult<Value> {
        Ok(Value::Object(HashMap::new()))
    }

    fn new_string(&mut self, text: &str) -> EngineResult<Value> {
        Ok(Value::String(text.to_string()))
    }

    fn string_of(&self, value: &Value) -> EngineResult<String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(EngineError::Type(format!("{:?} is not a string", other))),
        }
    }

    fn is_callable(&self, value: &Value) -> bool {
        value.is_callable()
    }

    fn call(&mut self, receiver: &Value, function: &Value, args: &[Value]) -> EngineResult<Value> {
        let Value::Function(function) = function else {
            return Err(EngineError::Type(format!(
                "{:?} is not callable",
                function
            )));
        };
        let function = Rc::clone(function);
        (*function)(self, receiver, args)
    }

    fn new_ref(&mut self, value: &Value) -> EngineResult<RefId> {
        let id = self.next_reference;
        self.next_reference += 1;
        self.references.insert(id, value.clone());
        Ok(RefId::new(id))
    }

    fn ref_value(&self, reference: RefId) -> EngineResult<Value> {
        self.references
            .get(&reference.raw())
            .cloned()
            .ok_or_else(|| {
                EngineError::Reference(format!("{:?} has been released", reference))
            })
    }

    fn drop_ref(&mut self, reference: RefId) -> EngineResult<()> {
        match self.references.remove(&reference.raw()) {
            Some(_) => Ok(()),
            None => Err(EngineError::Reference(format!(
                "{:?} has already been released",
                reference
            ))),
        }
    }

    fn sequence_len(&self, value: &Value) -> EngineResult<usize> {
        match value {
            Value::Array(items) => Ok(items.len()),
            other => Err(EngineError::Type(format!("{:?} is not an array", other))),
        }
    }

    fn sequence_get(&mut self, value: &Value, index: usize) -> EngineResult<Value> {
        let Value::Array(items) = value else {
            return Err(EngineError::Type(format!("{:?} is not an array", value)));
        };
        items.get(index).cloned().ok_or_else(|| {
            EngineError::Range(format!("index {} is out of bounds", index))
        })
    }

    fn run_script(&mut self, _name: &str, source: &Value, line_offset: i32) -> EngineResult<Value> {
        let text = self.string_of(source)?;
        let compiled = source::compile(SourceKind::Script, &text, line_offset)?;
        if let Some(message) = compiled.throws {
            return Err(EngineError::Thrown(message));
        }
        Ok(compiled.completion)
    }

    fn new_module(
        &mut self,
        name: &str,
        source: &Value,
        line_offset: i32,
        context: ContextId,
    ) -> EngineResult<ModuleId> {
        let text = self.string_of(source)?;
        let compiled = source::compile(SourceKind::Module, &text, line_offset)?;
        Ok(self.push_module(ModuleRecord {
            name: name.to_string(),
            context,
            kind: ModuleKind::Source,
            state: ModuleState::Created,
            requests: compiled.requests,
            bindings: compiled.bindings,
            throws: compiled.throws,
            completion_literal: compiled.completion,
            resolved: Vec::new(),
            exports: HashMap::new(),
            completion: None,
        }))
    }

    fn new_synthetic_module(
        &mut self,
        name: &str,
        export_names: &[String],
        context: ContextId,
    ) -> EngineResult<ModuleId> {
        Ok(self.push_module(ModuleRecord {
            name: name.to_string(),
            context,
            kind: ModuleKind::Synthetic {
                export_names: export_names.to_vec(),
            },
            state: ModuleState::Created,
            requests: Vec::new(),
            bindings: Vec::new(),
            throws: None,
            completion_literal: Value::Undefined,
            resolved: Vec::new(),
            exports: HashMap::new(),
            completion: None,
        }))
    }

    fn module_name(&self, module: ModuleId) -> EngineResult<String> {
        Ok(self.modules[self.index(module)?].name.clone())
    }

    fn module_context(&self, module: ModuleId) -> EngineResult<ContextId> {
        Ok(self.modules[self.index(module)?].context)
    }

    fn set_module_export(&mut self, module: ModuleId, name: &str, value: Value) -> EngineResult<()> {
        let index = self.index(module)?;
        let record = &mut self.modules[index];
        let ModuleKind::Synthetic { export_names } = &record.kind else {
            return Err(EngineError::Type(format!(
                "module '{}' is not a synthetic module",
                record.name
            )));
        };
        if !export_names.iter().any(|declared| declared == name) {
            return Err(EngineError::Reference(format!(
                "export '{}' is not declared by module '{}'",
                name, record.name
            )));
        }
        record.exports.insert(name.to_string(), value);
        Ok(())
    }

    fn instantiate_module(
        &mut self,
        module: ModuleId,
        hooks: &mut dyn ModuleHooks<Self>,
    ) -> EngineResult<()> {
        let index = self.index(module)?;
        match self.modules[index].state {
            // Already linked, or a cycle back into a module mid-link.
            ModuleState::Instantiating
            | ModuleState::Instantiated
            | ModuleState::Evaluating
            | ModuleState::Evaluated => return Ok(()),
            ModuleState::Failed => {
                return Err(EngineError::Internal(format!(
                    "module '{}' previously failed",
                    self.modules[index].name
                )));
            }
            ModuleState::Created => {}
        }

        self.modules[index].state = ModuleState::Instantiating;

        let requests = self.modules[index].requests.clone();
        let mut resolved = Vec::with_capacity(requests.len());
        for request in requests {
            let specifier = Value::String(request.specifier.clone());
            let child = match hooks.resolve_import(self, &specifier, &request.attributes, module) {
                Ok(child) => child,
                Err(error) => {
                    self.fail(index);
                    return Err(error);
                }
            };
            if self.index(child).is_err() {
                self.fail(index);
                return Err(EngineError::Internal(format!(
                    "import callback returned unknown {:?} for '{}'",
                    child, request.specifier
                )));
            }
            if let Err(error) = self.instantiate_module(child, hooks) {
                self.fail(index);
                return Err(error);
            }
            resolved.push(child);
        }

        let record = &mut self.modules[index];
        record.resolved = resolved;
        record.state = ModuleState::Instantiated;
        Ok(())
    }

    fn run_module(
        &mut self,
        module: ModuleId,
        hooks: &mut dyn ModuleHooks<Self>,
    ) -> EngineResult<Value> {
        self.instantiate_module(module, hooks)?;
        self.evaluate(module, hooks)
    }

    fn module_namespace(&mut self, module: ModuleId) -> EngineResult<Value> {
        let index = self.index(module)?;
        let record = &self.modules[index];
        match record.state {
            ModuleState::Created | ModuleState::Instantiating => Err(EngineError::Internal(
                format!("namespace of '{}' is not available before instantiation", record.name),
            )),
            ModuleState::Failed => Err(EngineError::Internal(format!(
                "module '{}' previously failed",
                record.name
            ))),
            _ => Ok(Value::Object(record.exports.clone())),
        }
    }

    fn wrap_handle(&mut self, handle: ModuleHandle) -> EngineResult<Value> {
        self.check_handle(handle)?;
        Ok(Value::External(handle))
    }

    fn unwrap_handle(&self, value: &Value) -> EngineResult<ModuleHandle> {
        let Value::External(handle) = value else {
            return Err(EngineError::Type(format!(
                "{:?} is not a module handle",
                value
            )));
        };
        self.check_handle(*handle)?;
        Ok(*handle)
    }
}

impl HarnessEngine {
    /// Validates that a tagged handle names a live module of that kind.
    fn check_handle(&self, handle: ModuleHandle) -> EngineResult<()> {
        let index = self.index(handle.id())?;
        let synthetic = matches!(self.modules[index].kind, ModuleKind::Synthetic { .. });
        if synthetic != handle.is_synthetic() {
            return Err(EngineError::Type(format!(
                "{:?} does not match the module it names",
                handle
            )));
        }
        Ok(())
    }
}
