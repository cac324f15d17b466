#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::rc::Rc;

    use crate::effects::{Effect, on_cleanup};
    use crate::error::ScopeError;
    use crate::scope::{Scope, current_scope};
    use crate::signal::{signal, watch};

    fn recorder(order: Rc<RefCell<Vec<&'static str>>>, tag: &'static str) -> impl FnOnce() + 'static {
        move || order.borrow_mut().push(tag)
    }

    #[test]
    fn scenario_a_stopping_the_root_stops_the_whole_tree() {
        let (s, (e1, s2, e2)) = Scope::with(|_| {
            let e1 = Effect::new(|| ());
            let (s2, e2) = Scope::with(|_| Effect::new(|| ()));
            (e1, s2, e2)
        });

        s.stop().unwrap();
        assert!(!e1.is_active());
        assert!(!e2.is_active());
        assert!(!s.is_active());
        assert!(!s2.is_active());
    }

    #[test]
    fn scenario_b_detached_scopes_escape_ancestor_disposal() {
        let (s, (s3, e3)) = Scope::with(|_| {
            let s3 = Scope::detached();
            let e3 = s3.run(|_| Effect::new(|| ())).unwrap();
            (s3, e3)
        });

        s.stop().unwrap();
        assert!(s3.is_active());
        assert!(e3.is_active());

        s3.stop().unwrap();
        assert!(!e3.is_active());
    }

    #[test]
    fn scenario_c_children_stop_before_cleanups_run() {
        let order = Rc::new(RefCell::new(Vec::new()));

        let (s, _) = Scope::with(|scope| {
            scope.register_cleanup(recorder(order.clone(), "c1")).unwrap();
            Effect::new(recorder(order.clone(), "e1"));
        });

        s.stop().unwrap();
        assert_eq!(*order.borrow(), ["e1", "c1"]);
    }

    #[test]
    fn scenario_d_panic_in_run_propagates_and_restores_the_stack() {
        let sig = signal(0);
        let scope = Scope::new();

        let result = catch_unwind(AssertUnwindSafe(|| {
            scope.run(|_| {
                watch(&sig, |_| ());
                panic!("setup failed");
            })
        }));

        assert!(result.is_err());
        assert!(current_scope().is_none());
        // Not auto-stopped: the caller decides what to do with a partially
        // initialized scope, and what it did register is still owned.
        assert!(scope.is_active());
        assert_eq!(scope.child_count(), 1);

        scope.stop().unwrap();
        assert_eq!(sig.subscriber_count(), 0);
    }

    #[test]
    fn outer_scope_still_captures_after_an_inner_failure() {
        let (outer, _) = Scope::with(|_| {
            let inner = Scope::new();
            let failed = catch_unwind(AssertUnwindSafe(|| {
                inner.run(|_| {
                    panic!("inner setup");
                })
            }));
            assert!(failed.is_err());

            Effect::new(|| ());
        });

        // The inner scope and the effect created after its failure.
        assert_eq!(outer.child_count(), 2);
        outer.stop().unwrap();
    }

    #[test]
    fn disposal_follows_creation_order_depth_first() {
        let order = Rc::new(RefCell::new(Vec::new()));

        let (scope, _) = Scope::with(|s| {
            Effect::new(recorder(order.clone(), "e1"));
            Scope::with(|ns| {
                Effect::new(recorder(order.clone(), "n1"));
                ns.register_cleanup(recorder(order.clone(), "nc")).unwrap();
            });
            Effect::new(recorder(order.clone(), "e2"));
            s.register_cleanup(recorder(order.clone(), "c1")).unwrap();
        });

        scope.stop().unwrap();
        assert_eq!(*order.borrow(), ["e1", "n1", "nc", "e2", "c1"]);
    }

    #[test]
    fn stop_twice_runs_cleanups_once() {
        let runs = Rc::new(Cell::new(0));

        let (scope, _) = Scope::with(|s| {
            let runs = runs.clone();
            s.register_cleanup(move || runs.set(runs.get() + 1)).unwrap();
        });

        scope.stop().unwrap();
        scope.stop().unwrap();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn re_entry_extends_the_same_scope() {
        let sig = signal(0);
        let scope = Scope::new();

        scope
            .run(|_| {
                watch(&sig, |_| ());
            })
            .unwrap();
        scope
            .run(|_| {
                watch(&sig, |_| ());
                on_cleanup(|| ()).unwrap();
            })
            .unwrap();

        assert_eq!(scope.child_count(), 2);
        assert_eq!(scope.cleanup_count(), 1);
        assert_eq!(sig.subscriber_count(), 2);

        scope.stop().unwrap();
        assert_eq!(sig.subscriber_count(), 0);
    }

    #[test]
    fn disposal_failures_are_isolated_and_aggregated() {
        let survivor_ran = Rc::new(Cell::new(false));

        let (scope, _) = Scope::with(|s| {
            Effect::new(|| panic!("effect teardown"));
            Scope::with(|ns| {
                ns.register_cleanup(|| panic!("nested cleanup")).unwrap();
            });
            Effect::new({
                let survivor_ran = survivor_ran.clone();
                move || survivor_ran.set(true)
            });
            s.register_cleanup(|| panic!("own cleanup")).unwrap();
        });

        let err = scope.stop().unwrap_err();

        // The walk finished despite the panics.
        assert!(survivor_ran.get());
        assert!(!scope.is_active());

        let messages: Vec<_> = err.failures.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, ["effect teardown", "nested cleanup", "own cleanup"]);
    }

    #[test]
    fn cleanups_cannot_extend_a_stopping_scope() {
        let seen = Rc::new(RefCell::new(None));

        let scope = Scope::new();
        scope
            .register_cleanup({
                let scope = scope.clone();
                let seen = seen.clone();
                move || {
                    *seen.borrow_mut() = Some(scope.register_cleanup(|| ()));
                }
            })
            .unwrap();

        let id = scope.id();
        scope.stop().unwrap();
        assert_eq!(*seen.borrow(), Some(Err(ScopeError::Stopped { id })));
    }

    #[test]
    fn reentrant_stop_from_a_nested_cleanup_is_a_no_op() {
        let (outer, inner) = Scope::with(|_| Scope::new());

        inner
            .register_cleanup({
                let outer = outer.clone();
                move || {
                    // Already mid-disposal; must not restart the walk.
                    assert!(outer.stop().is_ok());
                }
            })
            .unwrap();

        outer.stop().unwrap();
        assert!(!outer.is_active());
        assert!(!inner.is_active());
    }

    #[test]
    fn effects_created_outside_any_scope_are_uncaptured() {
        let sig = signal(0);
        let watcher = watch(&sig, |_| ());

        let (scope, _) = Scope::with(|_| ());
        assert_eq!(scope.child_count(), 0);

        scope.stop().unwrap();
        assert!(watcher.is_active());
        watcher.stop().unwrap();
    }
}
