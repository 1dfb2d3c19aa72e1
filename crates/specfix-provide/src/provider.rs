//! Fixture provider: resolve named specs into arguments, call, tear down.
//!
//! [`provide`] starts a [`FixtureSet`]. Applying it to a [`Function`] creates a
//! [`Provided`] wrapper with that set as layer 0; applying further sets to the
//! wrapper appends layers to the same wrapper. Calling the wrapper runs the
//! function once per layer, in order, and returns the last layer's result.
//!
//! ```
//! use specfix_provide::{provide, Function, Kwargs, Signature};
//! use specfix_spec::combinators::between;
//!
//! let square = provide()
//!     .with("n", between(1, 9))
//!     .apply(Function::new(Signature::named(["n"]), |_, kw| {
//!         let n = kw.int("n")?;
//!         Ok(n * n)
//!     }));
//!
//! let result = square.run().unwrap();
//! assert!((1..=81).contains(&result));
//!
//! // Per-call overrides replace a fixture for that call.
//! let result = square.call(&[], Kwargs::new().with("n", 12)).unwrap();
//! assert_eq!(result, 144);
//! ```

use std::fmt;
use std::rc::Rc;

use specfix_spec::{default_resolver, BoxError, ResolveError, Resolver, Spec, Value};
use tracing::debug;

use crate::error::ProvideError;
use crate::kwargs::Kwargs;
use crate::teardown::{teardown_all, TeardownFailures};

/// Starts an empty fixture set.
pub fn provide() -> FixtureSet {
    FixtureSet::default()
}

/// One layer of fixtures: positional specs plus named specs.
///
/// Positional fixtures are resolved and torn down but never delivered; they
/// exist for their side effects (a service that must be running).
#[derive(Debug, Clone, Default)]
pub struct FixtureSet {
    positional: Vec<Spec>,
    named: Vec<(String, Spec)>,
}

impl FixtureSet {
    /// Adds a positional fixture.
    pub fn arg(mut self, spec: impl Into<Spec>) -> Self {
        self.positional.push(spec.into());
        self
    }

    /// Adds a named fixture, replacing an earlier one with the same name.
    pub fn with(mut self, name: impl Into<String>, spec: impl Into<Spec>) -> Self {
        merge(&mut self.named, name.into(), spec.into());
        self
    }

    /// Looks up a named fixture.
    pub fn get(&self, name: &str) -> Option<&Spec> {
        self.named.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    /// Returns true if a named fixture of that name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names of the named fixtures, in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.named.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Returns true if the set declares no fixtures at all.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// Applies this set to a function or to an already provided function.
    pub fn apply<R, T: Decorate<R>>(self, target: T) -> Provided<R> {
        target.decorate(self)
    }
}

fn merge(entries: &mut Vec<(String, Spec)>, name: String, spec: Spec) {
    match entries.iter_mut().find(|(n, _)| *n == name) {
        Some((_, slot)) => *slot = spec,
        None => entries.push((name, spec)),
    }
}

/// Which keyword arguments a function accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    /// Only these names are delivered.
    Named(Vec<String>),
    /// Every resolved name is delivered.
    Variadic,
}

impl Signature {
    /// A signature declaring exactly these parameter names.
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Signature::Named(names.into_iter().map(Into::into).collect())
    }

    /// A signature accepting any keyword.
    pub fn variadic() -> Self {
        Signature::Variadic
    }

    /// Returns true if `name` is delivered to the function.
    pub fn accepts(&self, name: &str) -> bool {
        match self {
            Signature::Named(names) => names.iter().any(|n| n == name),
            Signature::Variadic => true,
        }
    }
}

type Body<R> = dyn Fn(&[Value], &Kwargs) -> Result<R, BoxError>;

/// A function body together with its declared parameters.
pub struct Function<R> {
    signature: Signature,
    body: Rc<Body<R>>,
}

impl<R> Function<R> {
    /// Wraps a body that receives positional and keyword arguments.
    ///
    /// # Arguments
    ///
    /// * `signature` - Names the body accepts; other fixtures are not delivered
    /// * `body` - The function itself; its error becomes [`ProvideError::Body`]
    pub fn new<F>(signature: Signature, body: F) -> Self
    where
        F: Fn(&[Value], &Kwargs) -> Result<R, BoxError> + 'static,
    {
        Self {
            signature,
            body: Rc::new(body),
        }
    }

    /// The declared parameters.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Calls the body directly, without fixtures.
    pub fn call(&self, args: &[Value], kwargs: &Kwargs) -> Result<R, BoxError> {
        (self.body)(args, kwargs)
    }
}

impl<R> Clone for Function<R> {
    fn clone(&self) -> Self {
        Self {
            signature: self.signature.clone(),
            body: self.body.clone(),
        }
    }
}

impl<R> fmt::Debug for Function<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Something a [`FixtureSet`] can be applied to.
pub trait Decorate<R> {
    /// Attaches `layer`, returning the wrapper.
    fn decorate(self, layer: FixtureSet) -> Provided<R>;
}

impl<R> Decorate<R> for Function<R> {
    fn decorate(self, layer: FixtureSet) -> Provided<R> {
        Provided {
            base: layer,
            extra: Vec::new(),
            function: self,
        }
    }
}

impl<R> Decorate<R> for Provided<R> {
    fn decorate(mut self, layer: FixtureSet) -> Provided<R> {
        self.extra.push(layer);
        self
    }
}

/// A function wrapped with one or more fixture layers.
pub struct Provided<R> {
    base: FixtureSet,
    extra: Vec<FixtureSet>,
    function: Function<R>,
}

impl<R> Clone for Provided<R> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            extra: self.extra.clone(),
            function: self.function.clone(),
        }
    }
}

impl<R> fmt::Debug for Provided<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provided")
            .field("base", &self.base)
            .field("extra", &self.extra)
            .field("function", &self.function)
            .finish()
    }
}

impl<R> Provided<R> {
    /// Number of fixture layers.
    pub fn layers(&self) -> usize {
        1 + self.extra.len()
    }

    /// The fixture set of one layer; layer 0 is the first one applied.
    pub fn layer(&self, index: usize) -> Option<&FixtureSet> {
        match index {
            0 => Some(&self.base),
            n => self.extra.get(n - 1),
        }
    }

    /// The declared parameters of the wrapped function.
    pub fn signature(&self) -> &Signature {
        self.function.signature()
    }

    /// Calls with no arguments on the thread's default resolver.
    pub fn run(&self) -> Result<R, ProvideError> {
        self.call(&[], Kwargs::new())
    }

    /// Calls on the thread's default resolver.
    pub fn call(&self, args: &[Value], kwargs: Kwargs) -> Result<R, ProvideError> {
        self.call_with(&default_resolver(), args, kwargs)
    }

    /// Calls once per layer, resolving fixtures with `resolver`.
    ///
    /// Keyword arguments named in layer 0 override that fixture on every
    /// layer; the rest pass through to the function untouched. The result of
    /// the last layer is returned.
    pub fn call_with(
        &self,
        resolver: &Resolver,
        args: &[Value],
        kwargs: Kwargs,
    ) -> Result<R, ProvideError> {
        self.call_overriding(resolver, args, Vec::<(String, Spec)>::new(), kwargs)
    }

    /// Calls once per layer with fixtures replaced by specs.
    ///
    /// Each override joins every layer's fixtures under its name and is
    /// resolved, delivered and torn down on each layer like any other
    /// fixture, so `between(1, 5)` draws afresh per layer and a thunk runs
    /// once per layer. The name need not be a fixture of layer 0. An override
    /// wins over a keyword argument of the same name.
    ///
    /// # Arguments
    ///
    /// * `resolver` - Resolver for fixtures and overrides
    /// * `args` - Positional arguments handed to the function as-is
    /// * `overrides` - Name and spec pairs; a repeated name keeps the last spec
    /// * `kwargs` - Keyword values, split as in [`Provided::call_with`]
    pub fn call_overriding<I, N, S>(
        &self,
        resolver: &Resolver,
        args: &[Value],
        overrides: I,
        kwargs: Kwargs,
    ) -> Result<R, ProvideError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<Spec>,
    {
        let base = &self.base;

        let mut specs = Vec::new();
        for (name, spec) in overrides {
            merge(&mut specs, name.into(), spec.into());
        }

        let mut merged = Vec::new();
        let mut passthrough = Kwargs::new();
        for (name, value) in kwargs.iter() {
            if specs.iter().any(|(n, _)| n == name) {
                continue;
            }
            if base.contains(name) {
                merged.push((name.to_string(), Spec::Literal(value.clone())));
            } else {
                passthrough.insert(name, value.clone());
            }
        }
        merged.extend(specs);

        let mut result = self.run_layer(resolver, 0, base, &merged, args, &passthrough)?;
        for (i, layer) in self.extra.iter().enumerate() {
            result = self.run_layer(resolver, i + 1, layer, &merged, args, &passthrough)?;
        }
        Ok(result)
    }

    fn run_layer(
        &self,
        resolver: &Resolver,
        layer: usize,
        fixtures: &FixtureSet,
        overrides: &[(String, Spec)],
        args: &[Value],
        passthrough: &Kwargs,
    ) -> Result<R, ProvideError> {
        let mut named = self.base.named.clone();
        for (name, spec) in fixtures.named.iter().chain(overrides) {
            merge(&mut named, name.clone(), spec.clone());
        }
        debug!(
            layer,
            positional = fixtures.positional.len(),
            named = named.len(),
            "running fixture layer"
        );

        let labelled = fixtures
            .positional
            .iter()
            .enumerate()
            .map(|(i, spec)| (format!("#{}", i), spec, false))
            .chain(named.iter().map(|(name, spec)| (name.clone(), spec, true)));

        let mut resolved: Vec<(String, Value, bool)> = Vec::new();
        for (name, spec, deliver) in labelled {
            match resolver.resolve(spec) {
                Ok(value) => resolved.push((name, value, deliver)),
                Err(source) => {
                    let teardown = teardown_resolved(&resolved);
                    return Err(ProvideError::Resolve {
                        layer,
                        name,
                        source,
                        teardown,
                    });
                }
            }
        }

        let signature = self.function.signature();
        let mut delivered = Kwargs::new();
        for (name, value, deliver) in &resolved {
            if *deliver && signature.accepts(name) {
                delivered.insert(name.as_str(), value.clone());
            }
        }
        for (name, value) in passthrough.iter() {
            delivered.insert(name, value.clone());
        }

        let outcome = self.function.call(args, &delivered);
        drop(delivered);

        let failures = teardown_resolved(&resolved);
        debug!(layer, failed = failures.len(), "tore down fixture layer");

        match outcome {
            Err(source) => Err(ProvideError::Body {
                layer,
                source,
                teardown: failures,
            }),
            Ok(_) if !failures.is_empty() => Err(ProvideError::Teardown { layer, failures }),
            Ok(value) => Ok(value),
        }
    }
}

fn teardown_resolved(resolved: &[(String, Value, bool)]) -> TeardownFailures {
    teardown_all(
        resolved
            .iter()
            .map(|(name, value, _)| (name.as_str(), value)),
    )
}

impl<R: Into<Value> + 'static> Provided<R> {
    /// Turns the provided function into a spec.
    ///
    /// Resolving the spec calls the function with no arguments on the
    /// resolving resolver, so provided factories compose:
    /// `Spec::repeat(user.into_spec(), 3)` resolves three fresh users.
    pub fn into_spec(self) -> Spec {
        let provided = Rc::new(self);
        Spec::thunk(move |resolver| {
            provided
                .call_with(resolver, &[], Kwargs::new())
                .map(|result| Spec::Literal(result.into()))
                .map_err(ResolveError::thunk)
        })
    }
}

impl<R: Into<Value> + 'static> From<Provided<R>> for Spec {
    fn from(provided: Provided<R>) -> Self {
        provided.into_spec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use specfix_spec::combinators::between;
    use specfix_spec::{Kind, Object, Teardown};
    use std::cell::{Cell, RefCell};

    fn resolver() -> Resolver {
        Resolver::seeded(1)
    }

    fn echo() -> Function<Kwargs> {
        Function::new(Signature::variadic(), |_, kw| Ok(kw.clone()))
    }

    #[test]
    fn test_resolves_named_fixtures() {
        let f = provide()
            .with("n", between(1, 3))
            .with("name", Kind::Text)
            .apply(echo());

        let kw = f.call_with(&resolver(), &[], Kwargs::new()).unwrap();
        assert_eq!(kw.names(), vec!["n", "name"]);
        assert!((1..=3).contains(&kw.int("n").unwrap()));
        assert!(!kw.text("name").unwrap().is_empty());
    }

    #[test]
    fn test_positional_args_reach_the_body() {
        let f = provide().with("x", 1).apply(Function::new(
            Signature::named(["x"]),
            |args, kw| Ok((args.to_vec(), kw.int("x")?)),
        ));

        let (args, x) = f
            .call_with(&resolver(), &[Value::from("self")], Kwargs::new())
            .unwrap();
        assert_eq!(args, vec![Value::from("self")]);
        assert_eq!(x, 1);
    }

    #[test]
    fn test_only_declared_names_are_delivered() {
        let f = provide()
            .with("wanted", 1)
            .with("extra", 2)
            .apply(Function::new(Signature::named(["wanted"]), |_, kw| {
                Ok(kw.names().iter().map(|n| n.to_string()).collect::<Vec<_>>())
            }));

        assert_eq!(f.run().unwrap(), vec!["wanted".to_string()]);
    }

    #[test]
    fn test_override_and_passthrough() {
        let f = provide()
            .with("provided_kwd", "provided")
            .with("orig_func_kwd", "modified")
            .apply(echo());

        let kw = f
            .call_with(
                &resolver(),
                &[],
                Kwargs::new()
                    .with("orig_func_kwd", "orig")
                    .with("other", 7),
            )
            .unwrap();

        assert_eq!(kw.names(), vec!["provided_kwd", "orig_func_kwd", "other"]);
        assert_eq!(kw.text("orig_func_kwd").unwrap(), "orig");
        assert_eq!(kw.int("other").unwrap(), 7);
    }

    #[test]
    fn test_spec_override_is_resolved_once_per_layer() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let token = Spec::thunk(move |_| {
            counter.set(counter.get() + 1);
            Ok(Spec::from(counter.get() * 10))
        });

        let f = provide().with("x", 0).apply(Function::new(
            Signature::named(["x"]),
            |_, kw| Ok(kw.int("x")?),
        ));
        let f = provide().with("x", 1).apply(f);
        let f = provide().with("x", 2).apply(f);

        let result = f
            .call_overriding(&resolver(), &[], [("x", token)], Kwargs::new())
            .unwrap();
        assert_eq!(calls.get(), 3);
        assert_eq!(result, 30);
    }

    #[test]
    fn test_spec_override_draws_per_layer_and_adds_names() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let f = provide().with("n", 100).apply(Function::new(
            Signature::variadic(),
            move |_, kw| {
                log.borrow_mut().push(kw.clone());
                Ok(())
            },
        ));
        let f = provide().apply(f);

        f.call_overriding(
            &resolver(),
            &[],
            [("n", between(1, 5)), ("extra", Spec::from(Kind::Boolean))],
            Kwargs::new().with("n", 7).with("other", "kept"),
        )
        .unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        for kw in seen.iter() {
            assert_eq!(kw.names(), vec!["n", "extra", "other"]);
            assert!((1..=5).contains(&kw.int("n").unwrap()));
            assert!(kw.bool("extra").is_ok());
            assert_eq!(kw.text("other").unwrap(), "kept");
        }
    }

    #[test]
    fn test_layers_stack_on_the_same_wrapper() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let log = calls.clone();
        let f = provide().with("x", 0).apply(Function::new(
            Signature::named(["x"]),
            move |_, kw| {
                let x = kw.int("x")?;
                log.borrow_mut().push(x);
                Ok(x)
            },
        ));
        let f = provide().with("x", 1).apply(f);
        let f = provide().with("x", 2).apply(f);

        assert_eq!(f.layers(), 3);
        assert_eq!(f.run().unwrap(), 2);
        assert_eq!(*calls.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_later_layers_inherit_layer_zero_and_add_names() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let f = provide().with("a", 1).apply(Function::new(
            Signature::variadic(),
            move |_, kw| {
                log.borrow_mut().push(kw.clone());
                Ok(())
            },
        ));
        let f = provide().with("b", 2).apply(f);
        f.call_with(&resolver(), &[], Kwargs::new().with("a", 9)).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen[0], Kwargs::new().with("a", 9));
        assert_eq!(seen[1], Kwargs::new().with("a", 9).with("b", 2));
    }

    #[test]
    fn test_empty_layer_adds_a_pass() {
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let f = provide().apply(Function::new(Signature::variadic(), move |_, _| {
            counter.set(counter.get() + 1);
            Ok(counter.get())
        }));
        let f = provide().apply(f);

        assert_eq!(f.run().unwrap(), 2);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_first_failing_layer_stops_the_call() {
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let f = provide().with("x", 0).apply(Function::new(
            Signature::named(["x"]),
            move |_, kw| {
                counter.set(counter.get() + 1);
                if kw.int("x")? == 1 {
                    return Err("x was 1".into());
                }
                Ok(())
            },
        ));
        let f = provide().with("x", 1).apply(f);
        let f = provide().with("x", 2).apply(f);

        let err = f.run().unwrap_err();
        assert_eq!(err.layer(), 1);
        assert_eq!(err.to_string(), "layer 1: function failed: x was 1");
        assert_eq!(count.get(), 2);
    }

    struct Tearable {
        raises: bool,
        torn: Rc<Cell<u32>>,
    }

    impl Teardown for Tearable {
        fn teardown(&mut self) -> Result<(), BoxError> {
            self.torn.set(self.torn.get() + 1);
            if self.raises {
                return Err("teardown broke".into());
            }
            Ok(())
        }
    }

    fn tearable_spec(raises: bool, torn: &Rc<Cell<u32>>) -> Spec {
        let torn = torn.clone();
        Spec::thunk(move |_| {
            Ok(Spec::tearable(Tearable {
                raises,
                torn: torn.clone(),
            }))
        })
    }

    #[test]
    fn test_teardown_after_success() {
        let torn = Rc::new(Cell::new(0));
        let f = provide()
            .with("res", tearable_spec(false, &torn))
            .apply(Function::new(Signature::named(["res"]), |_, kw| {
                Ok(kw.handle("res")?.clone())
            }));

        let obj: Object = f.run().unwrap();
        assert_eq!(torn.get(), 1);
        assert!(obj.is::<Tearable>());
    }

    #[test]
    fn test_undelivered_fixtures_are_still_torn_down() {
        let torn = Rc::new(Cell::new(0));
        let f = provide()
            .arg(tearable_spec(false, &torn))
            .with("hidden", tearable_spec(false, &torn))
            .apply(Function::new(Signature::named(Vec::<String>::new()), |_, kw| {
                Ok(kw.len())
            }));

        assert_eq!(f.run().unwrap(), 0);
        assert_eq!(torn.get(), 2);
    }

    #[test]
    fn test_body_failure_wins_over_teardown_failure() {
        let torn = Rc::new(Cell::new(0));
        let f = provide()
            .with("res", tearable_spec(true, &torn))
            .apply(Function::new(Signature::variadic(), |_, _| -> Result<(), BoxError> {
                Err("body broke".into())
            }));

        let err = f.run().unwrap_err();
        assert_eq!(torn.get(), 1);
        assert_eq!(err.body_error().map(|e| e.to_string()), Some("body broke".to_string()));
        assert_eq!(err.teardown_failures().paths(), vec!["res"]);
    }

    #[test]
    fn test_teardown_failure_after_success() {
        let torn = Rc::new(Cell::new(0));
        let f = provide()
            .with("res", tearable_spec(true, &torn))
            .apply(Function::new(Signature::variadic(), |_, _| Ok(())));

        match f.run().unwrap_err() {
            ProvideError::Teardown { layer, failures } => {
                assert_eq!(layer, 0);
                assert_eq!(failures.paths(), vec!["res"]);
            }
            other => panic!("expected teardown failure, got {:?}", other),
        }
    }

    #[test]
    fn test_resolution_failure_tears_down_partial_values() {
        let torn = Rc::new(Cell::new(0));
        let called = Rc::new(Cell::new(false));
        let flag = called.clone();
        let f = provide()
            .with("first", tearable_spec(false, &torn))
            .with("broken", Spec::thunk(|_| Err(ResolveError::thunk("no service"))))
            .with("never", tearable_spec(false, &torn))
            .apply(Function::new(Signature::variadic(), move |_, _| {
                flag.set(true);
                Ok(())
            }));

        let err = f.run().unwrap_err();
        assert!(!called.get());
        assert_eq!(torn.get(), 1);
        match err {
            ProvideError::Resolve { name, .. } => assert_eq!(name, "broken"),
            other => panic!("expected resolve failure, got {:?}", other),
        }
    }

    #[test]
    fn test_provided_function_as_spec() {
        let point = provide()
            .with("x", between(0, 10))
            .with("y", between(0, 10))
            .apply(Function::new(Signature::named(["x", "y"]), |_, kw| {
                Ok(Value::Tuple(vec![kw.int("x")?.into(), kw.int("y")?.into()]))
            }));

        let points = resolver().resolve(&Spec::repeat(point, 3)).unwrap();
        let points = points.as_items().unwrap();
        assert_eq!(points.len(), 3);
        for p in points {
            assert_eq!(p.len(), Some(2));
        }
    }

    #[test]
    fn test_provided_spec_failure_is_a_thunk_error() {
        let broken = provide().apply(Function::new(Signature::variadic(), |_, _| -> Result<Value, BoxError> {
            Err("factory broke".into())
        }));

        let err = resolver().resolve(&broken.into()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "thunk failed: layer 0: function failed: factory broke"
        );
    }
}
