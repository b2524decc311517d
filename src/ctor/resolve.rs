//! Constructor options resolution
//!
//! A constructor's cached options stay valid as long as its ancestor's
//! effective options keep the same identity. When the ancestor's options are
//! replaced (a mixin applied to a base class after the subclass was
//! declared), the cache is rebuilt from the declaration options, carrying
//! forward fields that were patched onto the cached options in the meantime.

use std::rc::Rc;

use tracing::debug;

use super::{register_component, Constructor};
use crate::options::{dedupe, merge_options, ComponentRef, Options, OptionsRef, StrategyTable};

/// Effective options of `ctor`, rebuilding its cache if an ancestor changed.
pub fn resolve_constructor_options(ctor: &Rc<Constructor>, strategies: &StrategyTable) -> OptionsRef {
    let Some(parent) = ctor.parent() else {
        return ctor.options();
    };

    let super_options = resolve_constructor_options(&parent, strategies);
    let unchanged = ctor
        .super_options
        .borrow()
        .as_ref()
        .is_some_and(|cached| cached.ptr_eq(&super_options));
    if unchanged {
        debug!(cid = ctor.cid, "constructor options cache hit");
        return ctor.options();
    }

    debug!(cid = ctor.cid, parent = parent.cid, "super options changed, re-merging");
    *ctor.super_options.borrow_mut() = Some(super_options.clone());

    if let Some(modified) = resolve_modified_options(ctor) {
        debug!(
            cid = ctor.cid,
            fields = ?modified.keys().collect::<Vec<_>>(),
            "carrying late-modified options forward"
        );
        ctor.extend_options.borrow_mut().extend_from(&modified);
    }

    let mut merged = merge_options(
        &super_options.borrow(),
        &ctor.extend_options.borrow(),
        None,
        strategies,
    );
    if let Some(name) = merged.name().map(str::to_string) {
        register_component(&mut merged, &name, ComponentRef::Weak(Rc::downgrade(ctor)));
    }

    let resolved = merged.into_shared();
    *ctor.options.borrow_mut() = resolved.clone();
    resolved
}

/// Fields of the cached options that no longer match the sealed snapshot.
///
/// List fields are deduped against the sealed and declared values so entries
/// that only came from the previous merge are not carried forward twice.
pub fn resolve_modified_options(ctor: &Constructor) -> Option<Options> {
    let latest = ctor.options();
    let latest = latest.borrow();
    let extended = ctor.extend_options.borrow();
    let sealed = &ctor.sealed_options;

    let mut modified: Option<Options> = None;
    for (key, value) in latest.iter() {
        let sealed_value = sealed.get(key);
        if sealed_value.is_some_and(|s| s.same(value)) {
            continue;
        }
        modified
            .get_or_insert_with(Options::new)
            .set(key.clone(), dedupe(value, extended.get(key), sealed_value));
    }
    modified
}
