//! Loading lifecycle notifications
//!
//! Two zero-argument callbacks bracket every transition that does real work.
//! They are invoked synchronously from whichever call starts or settles the
//! transition and can be replaced at any time.

/// Zero-argument lifecycle callback
pub type LoadingCallback = Box<dyn FnMut()>;

/// "Loading started" / "loading ended" callback registry
#[derive(Default)]
pub struct LoadingHooks {
    on_start: Option<LoadingCallback>,
    on_end: Option<LoadingCallback>,
}

impl LoadingHooks {
    /// Create a registry with no callbacks
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the "loading started" callback
    pub fn set_on_loading_start(&mut self, callback: impl FnMut() + 'static) {
        self.on_start = Some(Box::new(callback));
    }

    /// Replace the "loading ended" callback
    pub fn set_on_loading_end(&mut self, callback: impl FnMut() + 'static) {
        self.on_end = Some(Box::new(callback));
    }

    /// Remove the "loading started" callback
    pub fn clear_on_loading_start(&mut self) {
        self.on_start = None;
    }

    /// Remove the "loading ended" callback
    pub fn clear_on_loading_end(&mut self) {
        self.on_end = None;
    }

    pub(crate) fn loading_started(&mut self) {
        if let Some(callback) = self.on_start.as_mut() {
            callback();
        }
    }

    pub(crate) fn loading_ended(&mut self) {
        if let Some(callback) = self.on_end.as_mut() {
            callback();
        }
    }
}

impl std::fmt::Debug for LoadingHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadingHooks")
            .field("on_start", &self.on_start.is_some())
            .field("on_end", &self.on_end.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_hooks_fire_and_can_be_replaced() {
        let count = Rc::new(Cell::new(0));
        let mut hooks = LoadingHooks::new();

        let first = Rc::clone(&count);
        hooks.set_on_loading_start(move || first.set(first.get() + 1));
        hooks.loading_started();
        assert_eq!(count.get(), 1);

        let second = Rc::clone(&count);
        hooks.set_on_loading_start(move || second.set(second.get() + 10));
        hooks.loading_started();
        assert_eq!(count.get(), 11);

        hooks.clear_on_loading_start();
        hooks.loading_started();
        assert_eq!(count.get(), 11);
    }

    #[test]
    fn test_missing_hooks_are_ignored() {
        let mut hooks = LoadingHooks::new();
        hooks.loading_started();
        hooks.loading_ended();
    }
}
