#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use tether_core::Surface;

    use crate::*;

    fn recorder() -> (Rc<RefCell<Vec<ChangeRecord>>>, impl Fn(&[ChangeRecord]) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |records: &[ChangeRecord]| {
            sink.borrow_mut().extend(records.iter().cloned())
        })
    }

    #[test]
    fn test_options_normalize() {
        assert_eq!(
            ObserveOptions::new().subtree().normalize(),
            Err(ObserveError::NothingToObserve)
        );

        let opts = ObserveOptions::new()
            .attribute_old_value()
            .character_data_old_value()
            .normalize()
            .unwrap();
        assert!(opts.flags.contains(ObserveFlags::ATTRIBUTES));
        assert!(opts.flags.contains(ObserveFlags::CHARACTER_DATA));
        assert!(!opts.flags.contains(ObserveFlags::CHILD_LIST));
    }

    #[test]
    fn test_records_are_batched_until_flush() {
        let doc = Document::new();
        let form = doc.create_element("form");
        let (seen, cb) = recorder();
        let _obs = form
            .observe(ObserveOptions::new().attributes().child_list(), cb)
            .unwrap();

        form.set_attribute("data-step", "1");
        form.set_attribute("data-step", "2");
        form.append_child(&doc.create_element("input")).unwrap();
        assert!(seen.borrow().is_empty());

        assert_eq!(doc.flush(), 3);
        assert_eq!(seen.borrow().len(), 3);
        assert_eq!(doc.flush(), 0);
    }

    #[test]
    fn test_old_values_only_when_requested() {
        let doc = Document::new();
        let el = doc.create_element("div");
        el.set_attribute("class", "a");

        let (plain, cb) = recorder();
        let _plain = el.observe(ObserveOptions::new().attributes(), cb).unwrap();
        let (detailed, cb) = recorder();
        let _detailed = el
            .observe(ObserveOptions::new().attribute_old_value(), cb)
            .unwrap();

        el.set_attribute("class", "b");
        doc.flush();

        assert_eq!(
            plain.borrow()[0].kind,
            ChangeKind::Attributes {
                name: "class".into(),
                old_value: None
            }
        );
        assert_eq!(
            detailed.borrow()[0].kind,
            ChangeKind::Attributes {
                name: "class".into(),
                old_value: Some("a".into())
            }
        );
    }

    #[test]
    fn test_attribute_filter() {
        let doc = Document::new();
        let el = doc.create_element("dialog");
        let (seen, cb) = recorder();
        let _obs = el
            .observe(ObserveOptions::new().attribute_filter(["open"]), cb)
            .unwrap();

        el.set_attribute("class", "wide");
        el.set_attribute("open", "");
        doc.flush();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(matches!(&seen[0].kind, ChangeKind::Attributes { name, .. } if name == "open"));
    }

    #[test]
    fn test_subtree_reaches_descendants_only_when_asked() {
        let doc = Document::new();
        let root = doc.create_element("main");
        let leaf = doc.create_element("span");
        root.append_child(&leaf).unwrap();

        let (shallow, cb) = recorder();
        let _shallow = root.observe(ObserveOptions::new().character_data(), cb).unwrap();
        let (deep, cb) = recorder();
        let _deep = root
            .observe(ObserveOptions::new().character_data().subtree(), cb)
            .unwrap();

        leaf.set_text("hello");
        doc.flush();

        assert!(shallow.borrow().is_empty());
        assert_eq!(deep.borrow().len(), 1);
        assert_eq!(deep.borrow()[0].target, leaf);
    }

    #[test]
    fn test_moving_a_child_reports_removal_and_addition() {
        let doc = Document::new();
        let a = doc.create_element("ul");
        let b = doc.create_element("ul");
        let item = doc.create_element("li");
        a.append_child(&item).unwrap();

        let (seen, cb) = recorder();
        let _obs = a.observe(ObserveOptions::new().child_list(), cb).unwrap();
        b.append_child(&item).unwrap();
        doc.flush();

        assert_eq!(item.parent(), Some(b.clone()));
        assert!(a.children().is_empty());
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        match &seen[0].kind {
            ChangeKind::ChildList { added, removed } => {
                assert!(added.is_empty());
                assert_eq!(removed.as_slice(), &[item.clone()]);
            }
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn test_tree_errors() {
        let doc = Document::new();
        let other = Document::new();
        let parent = doc.create_element("div");
        let child = doc.create_element("p");
        parent.append_child(&child).unwrap();

        assert_eq!(child.append_child(&parent), Err(DomError::HierarchyCycle));
        assert_eq!(parent.append_child(&parent), Err(DomError::HierarchyCycle));
        assert_eq!(
            parent.append_child(&other.create_element("p")),
            Err(DomError::ForeignNode)
        );
        assert_eq!(child.remove_child(&parent), Err(DomError::NotAChild));
        assert_eq!(child.remove_attribute("missing"), None);
    }

    #[test]
    fn test_callbacks_may_mutate_during_flush() {
        let doc = Document::new();
        let el = doc.create_element("div");
        let rounds = Rc::new(Cell::new(0));

        let r = rounds.clone();
        let target = el.clone();
        let _obs = el
            .observe(ObserveOptions::new().attributes(), move |_| {
                r.set(r.get() + 1);
                if r.get() == 1 {
                    target.set_attribute("data-seen", "1");
                }
            })
            .unwrap();

        el.set_attribute("data-x", "1");
        assert_eq!(doc.flush(), 2);
        assert_eq!(rounds.get(), 2);
    }

    #[test]
    fn test_observation_disconnects_on_drop() {
        let doc = Document::new();
        let el = doc.create_element("div");
        let (seen, cb) = recorder();
        {
            let obs = el.observe(ObserveOptions::new().attributes(), cb).unwrap();
            el.set_attribute("a", "1");
            assert_eq!(obs.take_records().len(), 1);
            assert_eq!(doc.active_observations(), 1);
        }
        assert_eq!(doc.active_observations(), 0);
        el.set_attribute("a", "2");
        doc.flush();
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_queued_records_do_not_keep_document_alive() {
        let doc = Document::new();
        let el = doc.create_element("div");
        let child = doc.create_element("span");
        let (_, cb) = recorder();
        let obs = el.observe(ObserveOptions::new().child_list(), cb).unwrap();

        el.append_child(&child).unwrap();
        drop((doc, el, child));

        assert!(!obs.is_connected());
        assert!(obs.take_records().is_empty());
    }

    #[test]
    fn test_watcher_released_mid_flush_gets_nothing() {
        let doc = Document::new();
        let el = doc.create_element("div");
        let (first_seen, first_cb) = recorder();
        let (second_seen, second_cb) = recorder();
        let second = Rc::new(MutationWatcher::new(second_cb));

        let to_release = second.clone();
        let first = MutationWatcher::new(move |records: &[ChangeRecord]| {
            first_cb(records);
            to_release.release();
        });
        let opts = ObserveOptions::new().attributes();
        first.watch(Some(&el), &opts).unwrap();
        second.watch(Some(&el), &opts).unwrap();

        el.set_attribute("data-state", "closing");
        assert_eq!(doc.flush(), 1);
        assert_eq!(first_seen.borrow().len(), 1);
        assert!(second_seen.borrow().is_empty());
        assert!(!second.is_active());
        assert_eq!(doc.active_observations(), 1);
    }

    #[test]
    fn test_watcher_with_no_target_subscribes_nothing() {
        let doc = Document::new();
        let (_, cb) = recorder();
        let watcher = MutationWatcher::new(cb);

        watcher.watch(None, &ObserveOptions::new().child_list()).unwrap();
        assert!(!watcher.is_active());
        assert_eq!(doc.active_observations(), 0);
    }

    #[test]
    fn test_watcher_release_leaves_no_subscription() {
        let doc = Document::new();
        let el = doc.create_element("div");
        let (_, cb) = recorder();
        let watcher = MutationWatcher::new(cb);

        let opts = ObserveOptions::new().child_list();
        watcher.watch(Some(&el), &opts).unwrap();
        watcher.watch(Some(&el), &opts).unwrap();
        assert_eq!(doc.active_observations(), 1);
        assert_eq!(watcher.target(), Some(el.clone()));

        watcher.release();
        watcher.release();
        assert!(!watcher.is_active());
        assert_eq!(doc.active_observations(), 0);
    }

    #[test]
    fn test_watcher_rejects_empty_options() {
        let doc = Document::new();
        let el = doc.create_element("div");
        let (_, cb) = recorder();
        let watcher = MutationWatcher::new(cb);

        assert_eq!(
            watcher.watch(Some(&el), &ObserveOptions::new()),
            Err(ObserveError::NothingToObserve)
        );
        assert_eq!(doc.active_observations(), 0);
    }

    #[test]
    fn test_mutation_watcher_hook_lifecycle() {
        let doc = Document::new();
        let first = doc.create_element("section");
        let second = doc.create_element("section");
        let surface = Surface::new("watch");
        let hits = Rc::new(RefCell::new(Vec::new()));

        let pass = |target: Option<&Element>, label: &'static str| {
            let hits = hits.clone();
            surface
                .compose(|| {
                    mutation_watcher(target, ObserveOptions::new().attributes(), move |records| {
                        hits.borrow_mut().push((label, records.len()))
                    })
                })
                .unwrap()
        };

        let watcher = pass(None, "idle");
        assert!(!watcher.is_active());
        assert_eq!(doc.active_observations(), 0);

        pass(Some(&first), "first");
        assert_eq!(doc.active_observations(), 1);

        // same target and options: subscription kept, callback swapped
        pass(Some(&first), "latest");
        assert_eq!(doc.active_observations(), 1);
        first.set_attribute("hidden", "");
        doc.flush();
        assert_eq!(*hits.borrow(), vec![("latest", 1)]);

        // new target: old subscription torn down
        pass(Some(&second), "second");
        assert_eq!(doc.active_observations(), 1);
        assert_eq!(watcher.target(), Some(second.clone()));
        first.set_attribute("hidden", "false");
        second.set_attribute("hidden", "");
        doc.flush();
        assert_eq!(*hits.borrow(), vec![("latest", 1), ("second", 1)]);

        surface.dispose();
        assert_eq!(doc.active_observations(), 0);
    }

    #[test]
    fn test_mutation_watcher_hook_follows_options_and_target_removal() {
        let doc = Document::new();
        let panel = doc.create_element("section");
        let surface = Surface::new("watch-options");
        let hits = Rc::new(RefCell::new(Vec::new()));

        let pass = |target: Option<&Element>, options: ObserveOptions, label: &'static str| {
            let hits = hits.clone();
            surface
                .compose(|| {
                    mutation_watcher(target, options, move |records| {
                        hits.borrow_mut().push((label, records.len()))
                    })
                })
                .unwrap()
        };

        let watcher = pass(Some(&panel), ObserveOptions::new().attributes(), "attrs");
        panel.append_child(&doc.create_element("p")).unwrap();
        doc.flush();
        assert!(hits.borrow().is_empty());

        // same target, new options: re-subscribed with the new filter
        pass(Some(&panel), ObserveOptions::new().child_list(), "children");
        assert_eq!(doc.active_observations(), 1);
        assert_eq!(watcher.options(), Some(ObserveOptions::new().child_list()));
        panel.set_attribute("hidden", "");
        panel.append_child(&doc.create_element("p")).unwrap();
        doc.flush();
        assert_eq!(*hits.borrow(), vec![("children", 1)]);

        // target goes away: subscription released, nothing delivered
        pass(None, ObserveOptions::new().child_list(), "gone");
        assert!(!watcher.is_active());
        assert_eq!(doc.active_observations(), 0);
        panel.append_child(&doc.create_element("p")).unwrap();
        doc.flush();
        assert_eq!(*hits.borrow(), vec![("children", 1)]);

        surface.dispose();
        assert_eq!(doc.active_observations(), 0);
    }
}
