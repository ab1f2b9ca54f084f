//! Callback plumbing shared by every typed stream.
//!
//! A stream decodes its push payload into a typed value and hands it to the
//! user's `on_data` callback. Payloads that fail to decode go to the
//! optional `on_invalid` callback and never leave the stream.

use mx_core::DecodeError;
use tracing::debug;

pub type OnData<T> = Box<dyn Fn(T) + Send + Sync>;
pub type OnInvalid = Box<dyn Fn(DecodeError) + Send + Sync>;

pub struct Callbacks<T> {
    on_data: OnData<T>,
    on_invalid: Option<OnInvalid>,
}

impl<T> Callbacks<T> {
    pub fn new(on_data: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self { on_data: Box::new(on_data), on_invalid: None }
    }

    pub fn set_on_invalid(&mut self, f: impl Fn(DecodeError) + Send + Sync + 'static) {
        self.on_invalid = Some(Box::new(f));
    }

    /// Hand a decode result to the matching callback.
    pub fn deliver(&self, key: &str, decoded: Result<T, DecodeError>) {
        match decoded {
            Ok(value) => (self.on_data)(value),
            Err(e) => match &self.on_invalid {
                Some(on_invalid) => on_invalid(e),
                None => debug!("[{key}] dropping invalid payload: {e}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn routes_by_result() {
        let data = Arc::new(AtomicUsize::new(0));
        let invalid = Arc::new(AtomicUsize::new(0));
        let mut cb = {
            let data = data.clone();
            Callbacks::new(move |v: usize| {
                data.fetch_add(v, Ordering::Relaxed);
            })
        };

        cb.deliver("k", Err(DecodeError::new("dropped silently")));
        {
            let invalid = invalid.clone();
            cb.set_on_invalid(move |_| {
                invalid.fetch_add(1, Ordering::Relaxed);
            });
        }
        cb.deliver("k", Ok(5));
        cb.deliver("k", Err(DecodeError::new("bad")));

        assert_eq!(data.load(Ordering::Relaxed), 5);
        assert_eq!(invalid.load(Ordering::Relaxed), 1);
    }
}
