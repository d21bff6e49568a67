// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2026 Pegasus Heavy Industries, LLC

//! Scripts, source modules, synthetic modules, and the interceptor
//! protocol driven end to end against the harness engine.

use gantry_harness::{HarnessEngine, ModuleState, Value};
use gantry_modules::{
    Engine, EngineError, HostError, ModuleHandle, ModuleHost, MAX_MODULE_NAME_BYTES,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

fn host() -> ModuleHost<HarnessEngine> {
    ModuleHost::new(HarnessEngine::new())
}

fn noop_callback() -> Value {
    Value::function(|_, _, _| Ok(Value::Undefined))
}

fn string(text: &str) -> Value {
    Value::String(text.into())
}

type Registry = Rc<RefCell<HashMap<String, ModuleHandle>>>;
type ImportLog = Rc<RefCell<Vec<(String, Value, String)>>>;

fn resolving_callback(registry: &Registry, log: &ImportLog) -> Value {
    let registry = Rc::clone(registry);
    let log = Rc::clone(log);
    Value::function(move |_engine, _receiver, args| {
        let specifier = args[0].as_str().expect("specifier is a string").to_string();
        let referrer = args[2].as_str().expect("referrer is a string").to_string();
        log.borrow_mut()
            .push((specifier.clone(), args[1].clone(), referrer));
        let handle = registry
            .borrow()
            .get(&specifier)
            .copied()
            .ok_or_else(|| EngineError::Thrown(format!("cannot resolve '{}'", specifier)))?;
        Ok(Value::External(handle))
    })
}

fn namespace_of(host: &mut ModuleHost<HarnessEngine>, module: ModuleHandle) -> HashMap<String, Value> {
    match host.module_namespace(module).unwrap() {
        Value::Object(map) => map,
        other => panic!("expected a namespace object, got {:?}", other),
    }
}

// --- scripts ---------------------------------------------------------------

#[test]
fn scripts_return_their_completion_value() {
    let mut host = host();
    assert_eq!(
        host.run_script("main.js", &string("42"), 0).unwrap(),
        Value::Number(42.0)
    );
    assert_eq!(
        host.run_script("empty.js", &string(""), 0).unwrap(),
        Value::Undefined
    );
}

#[test]
fn scripts_reject_module_syntax() {
    let mut host = host();
    let err = host
        .run_script("main.js", &string("import \"b\""), 0)
        .unwrap_err();
    assert!(matches!(err, HostError::Engine(EngineError::Syntax(_))));
}

#[test]
fn script_errors_respect_the_line_offset() {
    let mut host = host();
    let err = host.run_script("main.js", &string("%%%"), 40).unwrap_err();
    let HostError::Engine(EngineError::Syntax(message)) = err else {
        panic!("expected a syntax error");
    };
    assert!(message.contains("line 41"), "{}", message);
}

#[test]
fn names_over_the_bound_are_rejected_not_truncated() {
    let mut host = host();
    let long_name = "a".repeat(MAX_MODULE_NAME_BYTES + 1);

    assert!(matches!(
        host.run_script(&long_name, &string("1"), 0),
        Err(HostError::NameTooLong { .. })
    ));

    let context = host
        .create_context(noop_callback(), noop_callback())
        .unwrap();
    assert!(matches!(
        host.create_module(&long_name, &string("1"), 0, context),
        Err(HostError::NameTooLong { .. })
    ));
    assert!(matches!(
        host.create_synthetic_module(&long_name, &Value::Array(vec![]), context),
        Err(HostError::NameTooLong { .. })
    ));
}

// --- import interception ---------------------------------------------------

#[test]
fn imports_invoke_the_callback_with_marshaled_arguments() {
    let mut host = host();
    let registry: Registry = Rc::new(RefCell::new(HashMap::new()));
    let log: ImportLog = Rc::new(RefCell::new(Vec::new()));
    let context = host
        .create_context(resolving_callback(&registry, &log), noop_callback())
        .unwrap();

    let leaf = host
        .create_module("b.js", &string("1"), 0, context)
        .unwrap();
    registry.borrow_mut().insert("b".into(), leaf);

    let root = host
        .create_module("a.js", &string("import \"b\"\n\"ok\""), 0, context)
        .unwrap();
    let completion = host.run_module(root).unwrap();

    assert_eq!(completion, string("ok"));
    assert_eq!(
        *log.borrow(),
        vec![("b".to_string(), Value::Undefined, "a.js".to_string())]
    );
    assert_eq!(
        host.engine().module_state(root.id()),
        Some(ModuleState::Evaluated)
    );
}

#[test]
fn import_attributes_are_forwarded_verbatim() {
    let mut host = host();
    let registry: Registry = Rc::new(RefCell::new(HashMap::new()));
    let log: ImportLog = Rc::new(RefCell::new(Vec::new()));
    let context = host
        .create_context(resolving_callback(&registry, &log), noop_callback())
        .unwrap();

    let leaf = host
        .create_module("data.js", &string("1"), 0, context)
        .unwrap();
    registry.borrow_mut().insert("data".into(), leaf);

    let root = host
        .create_module("a.js", &string("import \"data\" with \"json\""), 0, context)
        .unwrap();
    host.run_module(root).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![("data".to_string(), string("json"), "a.js".to_string())]
    );
}

#[test]
fn transitive_imports_resolve_in_graph_order() {
    let mut host = host();
    let registry: Registry = Rc::new(RefCell::new(HashMap::new()));
    let log: ImportLog = Rc::new(RefCell::new(Vec::new()));
    let context = host
        .create_context(resolving_callback(&registry, &log), noop_callback())
        .unwrap();

    let c = host
        .create_module("c.js", &string("1"), 0, context)
        .unwrap();
    let b = host
        .create_module("b.js", &string("import \"c\""), 0, context)
        .unwrap();
    registry.borrow_mut().insert("b".into(), b);
    registry.borrow_mut().insert("c".into(), c);

    let a = host
        .create_module("a.js", &string("import \"b\""), 0, context)
        .unwrap();
    host.run_module(a).unwrap();

    let log = log.borrow();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].0, "b");
    assert_eq!(log[0].2, "a.js");
    assert_eq!(log[1].0, "c");
    assert_eq!(log[1].2, "b.js");

    for module in [a, b, c] {
        assert_eq!(
            host.engine().module_state(module.id()),
            Some(ModuleState::Evaluated)
        );
    }
}

#[test]
fn one_invocation_per_specifier_referrer_pair() {
    let mut host = host();
    let registry: Registry = Rc::new(RefCell::new(HashMap::new()));
    let log: ImportLog = Rc::new(RefCell::new(Vec::new()));
    let context = host
        .create_context(resolving_callback(&registry, &log), noop_callback())
        .unwrap();

    let b = host
        .create_module("b.js", &string("1"), 0, context)
        .unwrap();
    let c = host
        .create_module("c.js", &string("import \"b\""), 0, context)
        .unwrap();
    registry.borrow_mut().insert("b".into(), b);
    registry.borrow_mut().insert("c".into(), c);

    // `b` is imported by two referrers: once from a, once from c.
    let a = host
        .create_module("a.js", &string("import \"b\"\nimport \"c\""), 0, context)
        .unwrap();
    host.run_module(a).unwrap();

    let pairs: Vec<(String, String)> = log
        .borrow()
        .iter()
        .map(|(specifier, _, referrer)| (specifier.clone(), referrer.clone()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("b".to_string(), "a.js".to_string()),
            ("c".to_string(), "a.js".to_string()),
            ("b".to_string(), "c.js".to_string()),
        ]
    );
}

#[test]
fn rerunning_an_evaluated_module_calls_no_hooks() {
    let mut host = host();
    let registry: Registry = Rc::new(RefCell::new(HashMap::new()));
    let log: ImportLog = Rc::new(RefCell::new(Vec::new()));
    let context = host
        .create_context(resolving_callback(&registry, &log), noop_callback())
        .unwrap();

    let leaf = host
        .create_module("b.js", &string("1"), 0, context)
        .unwrap();
    registry.borrow_mut().insert("b".into(), leaf);

    let root = host
        .create_module("a.js", &string("import \"b\"\n7"), 0, context)
        .unwrap();
    let first = host.run_module(root).unwrap();
    let second = host.run_module(root).unwrap();

    assert_eq!(first, second);
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn callback_failure_fails_the_pending_import() {
    let mut host = host();
    let failing = Value::function(|_, _, _| Err(EngineError::Thrown("no such module".into())));
    let context = host.create_context(failing, noop_callback()).unwrap();

    let root = host
        .create_module("a.js", &string("import \"missing\""), 0, context)
        .unwrap();
    let err = host.run_module(root).unwrap_err();

    assert!(matches!(
        err,
        HostError::Engine(EngineError::Thrown(ref message)) if message == "no such module"
    ));
    assert_eq!(
        host.engine().module_state(root.id()),
        Some(ModuleState::Failed)
    );
}

#[test]
fn callback_returning_a_non_handle_fails_the_import() {
    let mut host = host();
    let bogus = Value::function(|_, _, _| Ok(Value::Number(7.0)));
    let context = host.create_context(bogus, noop_callback()).unwrap();

    let root = host
        .create_module("a.js", &string("import \"b\""), 0, context)
        .unwrap();
    let err = host.run_module(root).unwrap_err();

    assert!(matches!(err, HostError::Engine(EngineError::Type(_))));
    assert_eq!(
        host.engine().module_state(root.id()),
        Some(ModuleState::Failed)
    );
}

#[test]
fn evaluation_failure_anywhere_in_the_graph_fails_the_run() {
    let mut host = host();
    let registry: Registry = Rc::new(RefCell::new(HashMap::new()));
    let log: ImportLog = Rc::new(RefCell::new(Vec::new()));
    let context = host
        .create_context(resolving_callback(&registry, &log), noop_callback())
        .unwrap();

    let leaf = host
        .create_module("b.js", &string("throw \"boom\""), 0, context)
        .unwrap();
    registry.borrow_mut().insert("b".into(), leaf);

    let root = host
        .create_module("a.js", &string("import \"b\""), 0, context)
        .unwrap();
    let err = host.run_module(root).unwrap_err();

    assert!(matches!(
        err,
        HostError::Engine(EngineError::Thrown(ref message)) if message == "boom"
    ));
    assert_eq!(
        host.engine().module_state(leaf.id()),
        Some(ModuleState::Failed)
    );
    assert_eq!(
        host.engine().module_state(root.id()),
        Some(ModuleState::Failed)
    );
}

#[test]
fn compile_errors_produce_no_module() {
    let mut host = host();
    let context = host
        .create_context(noop_callback(), noop_callback())
        .unwrap();

    let err = host
        .create_module("bad.js", &string("%%%"), 0, context)
        .unwrap_err();
    assert!(matches!(err, HostError::Engine(EngineError::Syntax(_))));

    let err = host
        .create_module("bad.js", &string("import b"), 0, context)
        .unwrap_err();
    assert!(matches!(err, HostError::Engine(EngineError::Syntax(_))));
}

// --- source module exports -------------------------------------------------

#[test]
fn source_module_exports_are_observable_after_evaluation() {
    let mut host = host();
    let context = host
        .create_context(noop_callback(), noop_callback())
        .unwrap();

    let module = host
        .create_module(
            "answers.js",
            &string("export answer = 42\nexport label = \"forty-two\""),
            0,
            context,
        )
        .unwrap();
    host.run_module(module).unwrap();

    let namespace = namespace_of(&mut host, module);
    assert_eq!(namespace.get("answer"), Some(&Value::Number(42.0)));
    assert_eq!(namespace.get("label"), Some(&string("forty-two")));
}

// --- synthetic modules -----------------------------------------------------

#[test]
fn synthetic_module_evaluation_populates_declared_exports() {
    let mut host = host();

    let slot: Rc<RefCell<Option<ModuleHandle>>> = Rc::new(RefCell::new(None));
    let names_seen: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

    let on_evaluate = Value::function({
        let slot = Rc::clone(&slot);
        let names_seen = Rc::clone(&names_seen);
        move |engine, _receiver, args| {
            names_seen
                .borrow_mut()
                .push(args[0].as_str().expect("module name is a string").to_string());
            let handle = slot.borrow().expect("module handle registered");
            engine.set_module_export(handle.id(), "value", Value::Number(42.0))?;
            Ok(Value::Undefined)
        }
    });

    let context = host.create_context(noop_callback(), on_evaluate).unwrap();
    let module = host
        .create_synthetic_module("synth.js", &Value::Array(vec![string("value")]), context)
        .unwrap();
    *slot.borrow_mut() = Some(module);

    let completion = host.run_module(module).unwrap();
    assert_eq!(completion, Value::Undefined);

    // The evaluate callback saw the module's own name, exactly once.
    assert_eq!(names_seen.borrow().as_slice(), ["synth.js"]);

    let namespace = namespace_of(&mut host, module);
    assert_eq!(namespace.get("value"), Some(&Value::Number(42.0)));

    // Re-running does not fire the evaluation interceptor again.
    host.run_module(module).unwrap();
    assert_eq!(names_seen.borrow().len(), 1);
}

#[test]
fn set_export_outside_the_declared_set_is_rejected() {
    let mut host = host();
    let context = host
        .create_context(noop_callback(), noop_callback())
        .unwrap();

    let names = Value::Array(vec![string("a"), string("b"), string("c")]);
    let module = host
        .create_synthetic_module("synth.js", &names, context)
        .unwrap();

    host.set_export(module, "a", Value::Number(1.0)).unwrap();
    let err = host.set_export(module, "d", Value::Number(4.0)).unwrap_err();
    assert!(matches!(err, HostError::Engine(EngineError::Reference(_))));
}

#[test]
fn last_write_per_export_name_wins() {
    let mut host = host();

    let slot: Rc<RefCell<Option<ModuleHandle>>> = Rc::new(RefCell::new(None));
    let on_evaluate = Value::function({
        let slot = Rc::clone(&slot);
        move |engine, _receiver, _args| {
            let handle = slot.borrow().expect("module handle registered");
            engine.set_module_export(handle.id(), "value", Value::Number(1.0))?;
            engine.set_module_export(handle.id(), "value", Value::Number(2.0))?;
            Ok(Value::Undefined)
        }
    });

    let context = host.create_context(noop_callback(), on_evaluate).unwrap();
    let module = host
        .create_synthetic_module("synth.js", &Value::Array(vec![string("value")]), context)
        .unwrap();
    *slot.borrow_mut() = Some(module);

    // Written before evaluation, then twice during it: the final write is
    // the observable binding.
    host.set_export(module, "value", Value::Number(0.0)).unwrap();
    host.run_module(module).unwrap();

    let namespace = namespace_of(&mut host, module);
    assert_eq!(namespace.get("value"), Some(&Value::Number(2.0)));
}

#[test]
fn duplicate_export_names_collapse() {
    let mut host = host();
    let context = host
        .create_context(noop_callback(), noop_callback())
        .unwrap();

    let names = Value::Array(vec![string("value"), string("value")]);
    let module = host
        .create_synthetic_module("synth.js", &names, context)
        .unwrap();

    host.set_export(module, "value", Value::Number(1.0)).unwrap();
    host.run_module(module).unwrap();
    assert_eq!(namespace_of(&mut host, module).len(), 1);
}

#[test]
fn export_lists_must_be_sequences_of_text() {
    let mut host = host();
    let context = host
        .create_context(noop_callback(), noop_callback())
        .unwrap();

    let err = host
        .create_synthetic_module("synth.js", &Value::Number(3.0), context)
        .unwrap_err();
    assert!(matches!(err, HostError::Engine(EngineError::Type(_))));

    let err = host
        .create_synthetic_module(
            "synth.js",
            &Value::Array(vec![string("ok"), Value::Number(1.0)]),
            context,
        )
        .unwrap_err();
    assert!(matches!(err, HostError::Engine(EngineError::Type(_))));
}

// --- handles and phased loading --------------------------------------------

#[test]
fn handles_round_trip_through_engine_values() {
    let mut host = host();
    let context = host
        .create_context(noop_callback(), noop_callback())
        .unwrap();

    let module = host
        .create_module("a.js", &string("1"), 0, context)
        .unwrap();

    let wrapped = host.engine_mut().wrap_handle(module).unwrap();
    assert_eq!(host.engine().unwrap_handle(&wrapped).unwrap(), module);

    // Values that never came from wrap_handle are rejected.
    assert!(host.engine().unwrap_handle(&Value::Number(1.0)).is_err());
    assert!(host.engine().unwrap_handle(&string("a.js")).is_err());
}

#[test]
fn instantiation_resolves_imports_without_evaluating() {
    let mut host = host();

    let registry: Registry = Rc::new(RefCell::new(HashMap::new()));
    let log: ImportLog = Rc::new(RefCell::new(Vec::new()));
    let evaluations = Rc::new(RefCell::new(0u32));

    let on_evaluate = Value::function({
        let evaluations = Rc::clone(&evaluations);
        move |_engine, _receiver, _args| {
            *evaluations.borrow_mut() += 1;
            Ok(Value::Undefined)
        }
    });

    let context = host
        .create_context(resolving_callback(&registry, &log), on_evaluate)
        .unwrap();

    let env = host
        .create_synthetic_module("env", &Value::Array(vec![]), context)
        .unwrap();
    registry.borrow_mut().insert("env".into(), env);

    let root = host
        .create_module("a.js", &string("import \"env\""), 0, context)
        .unwrap();

    host.instantiate_module(root).unwrap();
    assert_eq!(log.borrow().len(), 1);
    assert_eq!(*evaluations.borrow(), 0);
    assert_eq!(
        host.engine().module_state(root.id()),
        Some(ModuleState::Instantiated)
    );

    host.run_module(root).unwrap();
    assert_eq!(log.borrow().len(), 1);
    assert_eq!(*evaluations.borrow(), 1);
}
