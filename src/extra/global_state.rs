//! Thread-local contexts.
//!
//! For callers that cannot thread a [`Context`] through their code (bindings, callbacks), this
//! module keeps contexts in a per-thread table. Lifecycle is explicit: [`init`] creates a context
//! and makes it current, [`close`] drops it. Nothing is shared between threads.

use crate::*;
use core::cell::RefCell;
use std::rc::Rc;

pub type DynContext = Context<Box<dyn Rasterizer>>;

type ContextRef = Rc<RefCell<DynContext>>;

#[derive(Default)]
struct Contexts {
    contexts: Vec<Option<ContextRef>>,
    free_contexts: Vec<usize>,
    current: Option<usize>,
}

thread_local! {
    static CONTEXTS: Rc<RefCell<Contexts>> = Default::default();
}

fn get_contexts() -> Rc<RefCell<Contexts>> {
    CONTEXTS.with(Clone::clone)
}

/// Creates a context drawing into `rasterizer`, makes it current and returns its id.
pub fn init(rasterizer: Box<dyn Rasterizer>, cfg: Config) -> usize {
    let contexts = get_contexts();
    let mut contexts = contexts.borrow_mut();

    let id = if let Some(id) = contexts.free_contexts.pop() {
        id
    } else {
        contexts.contexts.push(None);
        contexts.contexts.len() - 1
    };

    let ctx = Context::with_config(rasterizer, cfg);
    contexts.contexts[id] = Some(Rc::new(RefCell::new(ctx)));
    contexts.current = Some(id);

    log::debug!("context {id} created");

    id
}

/// Drops a context. Returns `false` if `id` was not alive.
pub fn close(id: usize) -> bool {
    let contexts = get_contexts();
    let mut contexts = contexts.borrow_mut();

    let Some(slot) = contexts.contexts.get_mut(id) else {
        return false;
    };

    if slot.take().is_none() {
        return false;
    }

    contexts.free_contexts.push(id);
    if contexts.current == Some(id) {
        contexts.current = None;
    }

    log::debug!("context {id} closed");

    true
}

/// Selects the context [`with_current`] operates on. Returns `false` if `id` is not alive.
pub fn make_current(id: usize) -> bool {
    let contexts = get_contexts();
    let mut contexts = contexts.borrow_mut();

    if matches!(contexts.contexts.get(id), Some(Some(_))) {
        contexts.current = Some(id);
        true
    } else {
        false
    }
}

pub fn current() -> Option<usize> {
    get_contexts().borrow().current
}

/// Runs `f` on a context. Returns `None` if `id` is not alive.
///
/// The table is not borrowed while `f` runs, so `f` may create or close other contexts.
pub fn with_context<T>(id: usize, f: impl FnOnce(&mut DynContext) -> T) -> Option<T> {
    let ctx = get_contexts()
        .borrow()
        .contexts
        .get(id)
        .and_then(|v| v.clone())?;

    let mut ctx = ctx.borrow_mut();
    Some(f(&mut ctx))
}

/// Runs `f` on the current context.
pub fn with_current<T>(f: impl FnOnce(&mut DynContext) -> T) -> Option<T> {
    with_context(current()?, f)
}
