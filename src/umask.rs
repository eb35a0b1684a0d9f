//! RAII guard that tightens the process umask for a scope.
//!
//! Mirrors the original implementation's `umask_secret` context manager:
//! widen the mask so newly created files default to owner-only
//! permissions, then restore whatever the caller's process had before,
//! even if the guarded scope returns early or panics.

#[cfg(unix)]
mod imp {
    use libc::{mode_t, umask};

    pub struct ScopedUmask {
        previous: mode_t,
    }

    impl ScopedUmask {
        /// Sets `umask |= 0o77` (deny group/other entirely) and remembers
        /// the previous mask to restore on drop. `umask(2)` has no
        /// read-only form, so this reads the current mask by setting it to
        /// `0` first, then immediately applies `previous | 0o77`.
        pub fn new() -> Self {
            let previous = unsafe {
                let previous = umask(0);
                umask(previous | 0o077);
                previous
            };
            Self { previous }
        }
    }

    impl Drop for ScopedUmask {
        fn drop(&mut self) {
            unsafe {
                umask(self.previous);
            }
        }
    }
}

#[cfg(not(unix))]
mod imp {
    /// No-op on non-Unix targets -- umask and octal permission bits are a
    /// Unix concept. This crate does not claim Windows/macOS file-ACL
    /// parity (see the teacher's own `#[cfg(target_os = ...)]`
    /// platform-adapter pattern).
    pub struct ScopedUmask;

    impl ScopedUmask {
        pub fn new() -> Self {
            Self
        }
    }
}

pub use imp::ScopedUmask;

impl Default for ScopedUmask {
    fn default() -> Self {
        Self::new()
    }
}
