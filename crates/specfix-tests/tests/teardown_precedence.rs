//! Teardown ordering, failure aggregation and error precedence.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p specfix-tests --test teardown_precedence
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pretty_assertions::assert_eq;

use specfix_provide::{provide, Function, Kwargs, ProvideError, Signature};
use specfix_spec::{BoxError, Object, ResolveError, Spec, Teardown, Value};
use specfix_tests::{init_tracing, test_resolver};

/// Records the global order of teardown attempts.
#[derive(Default)]
struct Attempts {
    next: Cell<u32>,
}

struct Tearable {
    name: &'static str,
    raises: bool,
    attempts: Rc<Attempts>,
    attempt: Option<u32>,
    torn_down: bool,
}

impl Tearable {
    fn new(name: &'static str, raises: bool, attempts: &Rc<Attempts>) -> Object {
        Object::tearable(Tearable {
            name,
            raises,
            attempts: attempts.clone(),
            attempt: None,
            torn_down: false,
        })
    }
}

impl Teardown for Tearable {
    fn teardown(&mut self) -> Result<(), BoxError> {
        let n = self.attempts.next.get() + 1;
        self.attempts.next.set(n);
        self.attempt = Some(n);
        if self.raises {
            return Err(format!("{} failed", self.name).into());
        }
        self.torn_down = true;
        Ok(())
    }
}

fn state(obj: &Object) -> (Option<u32>, bool) {
    let t = obj.borrow::<Tearable>().unwrap();
    (t.attempt, t.torn_down)
}

#[test]
fn failing_teardowns_are_all_attempted_and_reported() {
    init_tracing();
    let attempts = Rc::new(Attempts::default());
    let bad1 = Tearable::new("bad tearable 1", true, &attempts);
    let bad2 = Tearable::new("bad tearable 2", true, &attempts);
    let good = Tearable::new("good tearable", false, &attempts);

    let received = Rc::new(RefCell::new(None));
    let sink = received.clone();
    let f = provide()
        .with("arg1", bad1.clone())
        .with("arg2", "to override later when called")
        .with("arg3", good.clone())
        .apply(Function::new(Signature::variadic(), move |_, kw| {
            *sink.borrow_mut() = Some(kw.clone());
            Ok(())
        }));

    let err = f
        .call_with(
            &test_resolver(1),
            &[],
            Kwargs::new().with("arg2", bad2.clone()),
        )
        .unwrap_err();

    assert_eq!(
        received.borrow().clone(),
        Some(
            Kwargs::new()
                .with("arg1", bad1.clone())
                .with("arg2", bad2.clone())
                .with("arg3", good.clone())
        )
    );

    match &err {
        ProvideError::Teardown { layer, failures } => {
            assert_eq!(*layer, 0);
            assert_eq!(failures.paths(), vec!["arg1", "arg2"]);
            let messages: Vec<String> = failures.iter().map(|f| f.source.to_string()).collect();
            assert_eq!(messages, vec!["bad tearable 1 failed", "bad tearable 2 failed"]);
        }
        other => panic!("expected a teardown failure, got {:?}", other),
    }
    assert_eq!(
        err.to_string(),
        "layer 0: 2 teardown(s) failed: arg1: bad tearable 1 failed; arg2: bad tearable 2 failed"
    );

    assert_eq!(state(&bad1), (Some(1), false));
    assert_eq!(state(&bad2), (Some(2), false));
    assert_eq!(state(&good), (Some(3), true));
}

#[test]
fn tearable_collections_are_walked() {
    let attempts = Rc::new(Attempts::default());
    let spec_attempts = attempts.clone();
    let tearables = Spec::list([Spec::thunk(move |_| {
        Ok(Value::Object(Tearable::new("in list", false, &spec_attempts)).into())
    })]);

    let f = provide().with("tearables", tearables).apply(Function::new(
        Signature::named(["tearables"]),
        |_, kw| Ok(kw.items("tearables")?.to_vec()),
    ));

    let items = f.call_with(&test_resolver(2), &[], Kwargs::new()).unwrap();
    let obj = items[0].as_object().unwrap();
    assert_eq!(state(obj), (Some(1), true));
}

#[test]
fn body_failure_takes_precedence_and_keeps_teardown_failures() {
    let attempts = Rc::new(Attempts::default());
    let bad = Tearable::new("bad", true, &attempts);
    let good = Tearable::new("good", false, &attempts);

    let f = provide()
        .with("bad", bad.clone())
        .with("good", good.clone())
        .apply(Function::new(Signature::variadic(), |_, _| -> Result<(), BoxError> {
            Err("assertion failed".into())
        }));

    let err = f.call_with(&test_resolver(3), &[], Kwargs::new()).unwrap_err();

    assert!(matches!(err, ProvideError::Body { layer: 0, .. }));
    assert_eq!(err.to_string(), "layer 0: function failed: assertion failed");
    assert_eq!(err.teardown_failures().paths(), vec!["bad"]);
    assert_eq!(state(&good), (Some(2), true));
}

#[test]
fn resolution_failure_tears_down_what_was_resolved() {
    let attempts = Rc::new(Attempts::default());
    let early = Tearable::new("early", true, &attempts);
    let called = Rc::new(Cell::new(false));
    let flag = called.clone();

    let f = provide()
        .with("early", early.clone())
        .with("db", Spec::thunk(|_| Err(ResolveError::thunk("connection refused"))))
        .apply(Function::new(Signature::variadic(), move |_, _| {
            flag.set(true);
            Ok(())
        }));

    let err = f.call_with(&test_resolver(4), &[], Kwargs::new()).unwrap_err();

    assert!(!called.get());
    assert_eq!(state(&early), (Some(1), false));
    assert_eq!(
        err.to_string(),
        "layer 0: resolving `db` failed: thunk failed: connection refused"
    );
    assert_eq!(err.teardown_failures().paths(), vec!["early"]);
}

#[test]
fn failing_layer_stops_later_layers_after_its_own_teardown() {
    let attempts = Rc::new(Attempts::default());
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let make = {
        let attempts = attempts.clone();
        move |raises: bool| {
            let attempts = attempts.clone();
            Spec::thunk(move |_| {
                Ok(Value::Object(Tearable::new("layer", raises, &attempts)).into())
            })
        }
    };

    let f = provide().with("res", make(false)).apply(Function::new(
        Signature::named(["res"]),
        move |_, _| {
            counter.set(counter.get() + 1);
            Ok(())
        },
    ));
    let f = provide().with("res", make(true)).apply(f);
    let f = provide().with("res", make(false)).apply(f);

    let err = f.call_with(&test_resolver(5), &[], Kwargs::new()).unwrap_err();

    assert_eq!(err.layer(), 1);
    assert_eq!(calls.get(), 2);
    assert_eq!(attempts.next.get(), 2);
}

#[test]
fn shared_handle_gets_one_attempt_per_layer() {
    let attempts = Rc::new(Attempts::default());
    let shared = Tearable::new("shared", false, &attempts);

    let f = provide()
        .with("one", shared.clone())
        .with("many", Spec::list([shared.clone(), shared.clone()]))
        .apply(Function::new(Signature::variadic(), |_, _| Ok(())));
    let f = provide().apply(f);

    f.call_with(&test_resolver(6), &[], Kwargs::new()).unwrap();
    assert_eq!(attempts.next.get(), 2);
}
