//! Interceptor registry and execution-glob matching.
//!
//! An execution glob is matched against `<ownerType>.<methodName>` of a
//! handler. `*` matches any character sequence (dots included) and `.` is
//! literal; the glob has to cover the whole name:
//!
//! | glob                       | `com.app.UserController.init` |
//! |----------------------------|-------------------------------|
//! | `*.UserController.init`    | matches                       |
//! | `*.init`                   | matches                       |
//! | `app.UserController.init`  | no (not a full match)         |
//! | `*.UserController.create`  | no                            |

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use crate::descriptor::{InterceptorDescriptor, JoinPoint};
use crate::error::Error;
use crate::handler::HandlerRef;

/// A compiled execution glob.
#[derive(Clone, Debug)]
pub struct Glob {
    source: String,
    regex: Regex,
}

impl Glob {
    /// Escapes `.` and turns `*` into "any sequence". Other characters keep
    /// their regular-expression meaning.
    pub fn new(glob: &str) -> Result<Self, Error> {
        let pattern = glob.replace('.', "\\.").replace('*', ".*");
        let regex = Regex::new(&format!("^(?:{pattern})$"))
            .map_err(|source| Error::Glob { glob: glob.to_owned(), source })?;
        Ok(Self { source: glob.to_owned(), regex })
    }

    pub fn as_str(&self) -> &str { &self.source }

    pub fn matches(&self, qualified_name: &str) -> bool {
        self.regex.is_match(qualified_name)
    }
}

struct Entry {
    descriptor: InterceptorDescriptor,
    globs: Vec<Glob>,
}

/// Every known interceptor, in registration order.
#[derive(Default)]
pub struct AspectRegistry {
    entries: Vec<Entry>,
}

impl AspectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an interceptor. Globs are compiled here, so a bad glob fails
    /// at startup rather than on the first request.
    pub fn register(&mut self, descriptor: InterceptorDescriptor) -> Result<(), Error> {
        let globs = descriptor.globs.iter()
            .map(|g| Glob::new(g))
            .collect::<Result<Vec<_>, _>>()?;
        self.entries.push(Entry { descriptor, globs });
        Ok(())
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Collects the interceptors that apply to `handler`, per join point.
    ///
    /// Each matching glob appends the interceptor once, so an interceptor
    /// with two globs that both match runs twice.
    pub fn resolve_for_handler(&self, handler: &HandlerRef) -> Interceptors {
        let name = handler.qualified_name();
        let mut selected = Interceptors::default();

        for entry in &self.entries {
            for glob in &entry.globs {
                if glob.matches(&name) {
                    selected.by_kind
                        .entry(entry.descriptor.join_point)
                        .or_default()
                        .push(Arc::clone(&entry.descriptor.handler));
                }
            }
        }
        selected
    }
}

/// The interceptors selected for one handler, per join point, in
/// registration order.
#[derive(Clone, Debug, Default)]
pub struct Interceptors {
    by_kind: HashMap<JoinPoint, Vec<Arc<HandlerRef>>>,
}

impl Interceptors {
    pub fn get(&self, join_point: JoinPoint) -> &[Arc<HandlerRef>] {
        self.by_kind.get(&join_point).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Qualified names for one join point. Handy in logs and tests.
    pub fn names(&self, join_point: JoinPoint) -> Vec<String> {
        self.get(join_point).iter().map(|h| h.qualified_name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.values().all(Vec::is_empty)
    }
}

/// Two selections are equal when they hold the very same interceptors in the
/// same order.
impl PartialEq for Interceptors {
    fn eq(&self, other: &Self) -> bool {
        JoinPoint::ALL.iter().all(|&jp| {
            let (a, b) = (self.get(jp), other.get(jp));
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Arc::ptr_eq(x, y))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::Arguments;
    use crate::error::BoxError;
    use crate::handler::Factory;

    struct Owner;

    fn noop(_: &mut Owner, _: &Arguments) -> Result<(), BoxError> { Ok(()) }

    fn handler(owner: &str, method: &str) -> Arc<HandlerRef> {
        let factory: Factory<Owner> = Arc::new(|| Ok(Owner));
        Arc::new(HandlerRef::new(owner, method, vec![], Some(factory), noop))
    }

    #[test]
    fn glob_is_a_full_match() {
        let g = Glob::new("*.UserController.init").unwrap();
        assert!(g.matches("com.app.UserController.init"));
        assert!(!g.matches("com.app.UserController.create"));
        assert!(!g.matches("com.app.UserController.initAll"));

        let g = Glob::new("app.UserController.init").unwrap();
        assert!(!g.matches("com.app.UserController.init"));
    }

    #[test]
    fn dot_is_literal() {
        let g = Glob::new("a.b").unwrap();
        assert!(g.matches("a.b"));
        assert!(!g.matches("axb"));
    }

    #[test]
    fn package_segment_must_be_covered() {
        let g = Glob::new("com.app.*Controller.init").unwrap();
        assert!(g.matches("com.app.UserController.init"));
        // `*` spans dots, so a sub-package matches only when the glob allows it.
        assert!(g.matches("com.app.sub.UserController.init"));

        let g = Glob::new("com.app.UserController.init").unwrap();
        assert!(!g.matches("com.app.sub.UserController.init"));
    }

    #[test]
    fn selection_keeps_registration_order_per_kind() {
        let mut reg = AspectRegistry::new();
        let first = handler("app.Audit", "first");
        let second = handler("app.Audit", "second");
        let timing = handler("app.Timing", "around");
        reg.register(InterceptorDescriptor::new(JoinPoint::Before, ["*.show"], first)).unwrap();
        reg.register(InterceptorDescriptor::new(JoinPoint::Around, ["app.*"], timing)).unwrap();
        reg.register(InterceptorDescriptor::new(JoinPoint::Before, ["*.Users.*"], second)).unwrap();
        reg.register(
            InterceptorDescriptor::new(JoinPoint::After, ["*.other"], handler("app.Audit", "never")),
        ).unwrap();

        let target = handler("app.Users", "show");
        let selected = reg.resolve_for_handler(&target);
        assert_eq!(selected.names(JoinPoint::Before), ["app.Audit.first", "app.Audit.second"]);
        assert_eq!(selected.names(JoinPoint::Around), ["app.Timing.around"]);
        assert!(selected.get(JoinPoint::After).is_empty());
        assert!(selected.get(JoinPoint::AfterThrowing).is_empty());
    }

    #[test]
    fn every_matching_glob_appends() {
        let mut reg = AspectRegistry::new();
        reg.register(InterceptorDescriptor::new(JoinPoint::Before, ["*.show", "app.*"], handler("a.A", "log")))
            .unwrap();
        let selected = reg.resolve_for_handler(&handler("app.Users", "show"));
        assert_eq!(selected.get(JoinPoint::Before).len(), 2);
    }

    #[test]
    fn resolution_is_idempotent() {
        let mut reg = AspectRegistry::new();
        reg.register(InterceptorDescriptor::new(JoinPoint::Before, ["*"], handler("a.A", "one"))).unwrap();
        reg.register(InterceptorDescriptor::new(JoinPoint::After, ["*"], handler("a.A", "two"))).unwrap();

        let target = handler("app.Users", "show");
        let once = reg.resolve_for_handler(&target);
        let twice = reg.resolve_for_handler(&target);
        assert_eq!(once, twice);
        assert_eq!(once.names(JoinPoint::Before), twice.names(JoinPoint::Before));
    }

    #[test]
    fn invalid_glob_fails_registration() {
        let mut reg = AspectRegistry::new();
        let err = reg.register(InterceptorDescriptor::new(JoinPoint::Before, ["app.(*"], handler("a.A", "x")));
        assert!(matches!(err, Err(Error::Glob { .. })));
        assert!(reg.is_empty());
    }
}
