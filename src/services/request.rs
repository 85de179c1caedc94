//! Tri-state wrapper around fallible operations.
//!
//! Mirrors the loading/error/data contract every remote call goes through:
//! `execute` flips `loading` on, runs the operation, stores either the data
//! or a human-readable error, raises the configured notifications, and
//! clears `loading` again.
//!
//! Overlapping invocations are disambiguated by a generation counter:
//! `begin` stamps a token and `commit` discards any completion whose token
//! is no longer current, so only the latest invocation's result is ever
//! committed to state.

use crate::services::notify::Notifier;
use std::fmt::Display;

pub struct RequestOptions {
    pub success_message: Option<String>,
    pub notify_error: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            success_message: None,
            notify_error: true,
        }
    }
}

#[derive(Debug)]
pub struct RequestCell<T> {
    data: Option<T>,
    loading: bool,
    error: Option<String>,
    generation: u64,
}

impl<T> Default for RequestCell<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            generation: 0,
        }
    }
}

impl<T> RequestCell<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn take_data(&mut self) -> Option<T> {
        self.data.take()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Start a new invocation and return its token.
    pub fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.loading = true;
        self.error = None;
        self.generation
    }

    /// Apply a completed invocation's result. A stale token (a newer
    /// invocation has begun since) is discarded and leaves state untouched.
    pub fn commit<E: Display>(
        &mut self,
        token: u64,
        result: Result<T, E>,
        notifier: &mut Notifier,
        opts: &RequestOptions,
    ) -> bool {
        if token != self.generation {
            return false;
        }
        self.loading = false;
        match result {
            Ok(value) => {
                self.data = Some(value);
                self.error = None;
                if let Some(message) = &opts.success_message {
                    notifier.success(message.clone());
                }
            }
            Err(e) => {
                let message = e.to_string();
                if opts.notify_error {
                    notifier.error(message.clone());
                }
                self.error = Some(message);
            }
        }
        true
    }

    /// Sequential convenience: begin, run, commit. Returns whether the
    /// operation succeeded.
    pub fn execute<E: Display>(
        &mut self,
        op: impl FnOnce() -> Result<T, E>,
        notifier: &mut Notifier,
        opts: &RequestOptions,
    ) -> bool {
        let token = self.begin();
        self.commit(token, op(), notifier, opts);
        self.error.is_none()
    }

    /// Clear data, loading, and error back to initial.
    pub fn reset(&mut self) {
        self.data = None;
        self.loading = false;
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notify::{NoticeKind, Notifier};

    #[test]
    fn execute_success_stores_data_and_notifies() {
        let mut cell = RequestCell::new();
        let mut notifier = Notifier::new(true);
        let ok = cell.execute(
            || Ok::<_, String>(42),
            &mut notifier,
            &RequestOptions {
                success_message: Some("done".into()),
                notify_error: true,
            },
        );
        assert!(ok);
        assert_eq!(cell.data(), Some(&42));
        assert!(cell.error().is_none());
        assert!(!cell.is_loading());
        assert_eq!(notifier.notices().len(), 1);
        assert_eq!(notifier.notices()[0].kind, NoticeKind::Success);
    }

    #[test]
    fn execute_failure_stores_message_and_notifies() {
        let mut cell: RequestCell<u32> = RequestCell::new();
        let mut notifier = Notifier::new(true);
        let ok = cell.execute(
            || Err::<u32, _>("boom"),
            &mut notifier,
            &RequestOptions::default(),
        );
        assert!(!ok);
        assert!(cell.data().is_none());
        assert_eq!(cell.error(), Some("boom"));
        assert_eq!(notifier.notices()[0].kind, NoticeKind::Error);
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut cell: RequestCell<u32> = RequestCell::new();
        let mut notifier = Notifier::new(true);
        let first = cell.begin();
        let second = cell.begin();

        // Newest invocation resolves first and wins.
        assert!(cell.commit(second, Ok::<_, String>(2), &mut notifier, &RequestOptions::default()));
        // The older invocation's late rejection must not clobber state.
        assert!(!cell.commit(first, Err::<u32, _>("late failure"), &mut notifier, &RequestOptions::default()));

        assert_eq!(cell.data(), Some(&2));
        assert!(cell.error().is_none());
        assert!(notifier.notices().is_empty());
    }

    #[test]
    fn reset_clears_tri_state() {
        let mut cell = RequestCell::new();
        let mut notifier = Notifier::new(true);
        cell.execute(|| Ok::<_, String>(7), &mut notifier, &RequestOptions::default());
        cell.reset();
        assert!(cell.data().is_none());
        assert!(cell.error().is_none());
        assert!(!cell.is_loading());
    }
}
