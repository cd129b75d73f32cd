//! Small pieces of shared plumbing that don't deserve their own crate but are used
//! throughout the workspace: a threading-aware shared-ownership alias, a minimal
//! progress reporting trait, and a cooperative interrupt flag.
//!
//! None of this is specific to git; it exists so the higher-level crates don't each
//! reinvent it slightly differently.

#![deny(unsafe_code)]

///
pub mod threading {
    #[cfg(not(feature = "parallel"))]
    mod shared {
        use std::{cell::RefCell, rc::Rc};

        /// A value shared by reference, using `Rc` when the `parallel` feature is off.
        pub type OwnShared<T> = Rc<T>;
        /// Interior mutability matching the sharing mode in use.
        pub type MutableShared<T> = RefCell<T>;

        /// Create a new [`MutableShared`].
        pub fn mutable<T>(v: T) -> MutableShared<T> {
            RefCell::new(v)
        }
    }

    #[cfg(feature = "parallel")]
    mod shared {
        use std::sync::Arc;

        /// A value shared by reference, using `Arc` when the `parallel` feature is on.
        pub type OwnShared<T> = Arc<T>;
        /// Interior mutability matching the sharing mode in use.
        pub type MutableShared<T> = parking_lot::RwLock<T>;

        /// Create a new [`MutableShared`].
        pub fn mutable<T>(v: T) -> MutableShared<T> {
            parking_lot::RwLock::new(v)
        }
    }

    pub use shared::*;
}

///
pub mod progress {
    /// A sink for progress information emitted by long-running operations like
    /// pack writing or garbage collection.
    ///
    /// Implementations may render a progress bar, forward to `tracing`, or do nothing.
    pub trait Progress: Send {
        /// Set the total amount of work, if known.
        fn init(&mut self, max: Option<usize>, unit: Option<&'static str>);
        /// Advance the counter by `step`.
        fn inc_by(&mut self, step: usize);
        /// Set a human readable name for the current sub-task.
        fn set_name(&mut self, name: impl Into<String>);
    }

    /// A [`Progress`] implementation that discards everything.
    #[derive(Default, Clone, Copy)]
    pub struct Discard;

    impl Progress for Discard {
        fn init(&mut self, _max: Option<usize>, _unit: Option<&'static str>) {}
        fn inc_by(&mut self, _step: usize) {}
        fn set_name(&mut self, _name: impl Into<String>) {}
    }
}

///
pub mod interrupt {
    use std::sync::atomic::{AtomicBool, Ordering};

    /// A cooperative cancellation flag consulted at suspension points.
    ///
    /// Every object-store read/write, ref CAS, pkt-line read, and worktree filesystem
    /// call in the rest of the workspace is expected to check this (or an equivalent
    /// caller-provided signal) between steps of a larger operation.
    #[derive(Default)]
    pub struct Flag(AtomicBool);

    impl Flag {
        /// Create a new, non-triggered flag.
        pub fn new() -> Self {
            Self(AtomicBool::new(false))
        }

        /// Request cancellation; subsequent [`is_set`][Flag::is_set] calls return `true`.
        pub fn trigger(&self) {
            self.0.store(true, Ordering::SeqCst);
        }

        /// Whether cancellation was requested.
        pub fn is_set(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }
}
