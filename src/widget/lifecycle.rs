use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::AbortHandle;

#[derive(Debug)]
struct Inner {
    alive: Cell<bool>,
    children: RefCell<Vec<AbortHandle>>,
}

/// Owner of the resources a widget registers while it is displayed.
///
/// Disposing aborts every registered child task and marks the owner dead;
/// continuations check [`Lifecycle::is_alive`] before touching the widget,
/// so a result that lands after disposal is dropped.
#[derive(Debug, Clone)]
pub struct Lifecycle(Rc<Inner>);

impl Lifecycle {
    pub fn new() -> Self {
        Self(Rc::new(Inner {
            alive: Cell::new(true),
            children: RefCell::new(Vec::new()),
        }))
    }

    pub fn is_alive(&self) -> bool {
        self.0.alive.get()
    }

    /// Tie a task to this owner. Registering on a disposed owner aborts the
    /// task immediately.
    pub fn register(&self, handle: AbortHandle) {
        if self.is_alive() {
            self.0.children.borrow_mut().push(handle);
        } else {
            handle.abort();
        }
    }

    /// Number of registered child tasks.
    pub fn child_count(&self) -> usize {
        self.0.children.borrow().len()
    }

    /// Abort all children and mark the owner dead. Idempotent.
    pub fn dispose(&self) {
        if !self.0.alive.replace(false) {
            return;
        }
        for handle in self.0.children.borrow_mut().drain(..) {
            handle.abort();
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::future::{Aborted, abortable};

    #[test]
    fn test_dispose_aborts_children() {
        let lifecycle = Lifecycle::new();
        let (task, handle) = abortable(async { 1 });
        lifecycle.register(handle);
        assert_eq!(lifecycle.child_count(), 1);

        lifecycle.dispose();
        assert!(!lifecycle.is_alive());
        assert_eq!(block_on(task), Err(Aborted));
        assert_eq!(lifecycle.child_count(), 0);

        lifecycle.dispose();
        assert!(!lifecycle.is_alive());
    }

    #[test]
    fn test_register_after_dispose_aborts() {
        let lifecycle = Lifecycle::new();
        lifecycle.dispose();
        let (task, handle) = abortable(async { 1 });
        lifecycle.register(handle);
        assert_eq!(block_on(task), Err(Aborted));
        assert_eq!(lifecycle.child_count(), 0);
    }

    #[test]
    fn test_live_owner_lets_tasks_finish() {
        let lifecycle = Lifecycle::new();
        let (task, handle) = abortable(async { 7 });
        lifecycle.register(handle);
        assert_eq!(block_on(task), Ok(7));
    }
}
