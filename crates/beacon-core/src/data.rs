//! The value + metadata envelope emitted through signals.

use std::any::Any;
use std::fmt;

use crate::params::Params;

/// An immutable payload paired with ad hoc metadata.
///
/// Envelopes never nest: [`SignalData::merge_params`] (and the signal-side
/// `emit_with_params`) fold new metadata into the existing map instead of
/// wrapping the envelope again.
#[derive(Clone)]
pub struct SignalData<T> {
    value: T,
    params: Params,
}

impl<T> SignalData<T> {
    /// Wraps `value` with no metadata.
    pub fn new(value: T) -> Self {
        Self {
            value,
            params: Params::new(),
        }
    }

    /// Wraps `value` with exactly `params`.
    pub fn with_params(value: T, params: Params) -> Self {
        Self { value, params }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Consumes the envelope, returning the payload.
    pub fn into_value(self) -> T {
        self.value
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Splits the envelope into payload and metadata.
    pub fn into_parts(self) -> (T, Params) {
        (self.value, self.params)
    }

    /// Best-effort typed lookup.
    ///
    /// `None` when `key` is absent or when the stored value is not an `R`.
    pub fn get_param<R: Any>(&self, key: &str) -> Option<&R> {
        self.params.get::<R>(key)
    }

    /// Presence test, independent of the stored value's type.
    pub fn has_param(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Re-wraps the same payload with `params` folded in.
    ///
    /// On key collision the newly supplied value wins.
    #[must_use]
    pub fn merge_params(self, params: Params) -> Self {
        Self {
            value: self.value,
            params: self.params.merge(params),
        }
    }

    /// Applies `f` to the payload, keeping the metadata.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SignalData<U> {
        SignalData {
            value: f(self.value),
            params: self.params,
        }
    }
}

impl<T> From<T> for SignalData<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for SignalData<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalData")
            .field("value", &self.value)
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_has_no_params() {
        let data = SignalData::new(42);
        assert_eq!(*data.value(), 42);
        assert!(data.params().is_empty());
        assert!(!data.has_param("x"));
    }

    #[test]
    fn test_click_envelope() {
        let data = SignalData::with_params("click", Params::new().with("x", 1));

        assert_eq!(*data.value(), "click");
        assert!(data.has_param("x"));
        assert_eq!(data.get_param::<i32>("x"), Some(&1));
    }

    #[test]
    fn test_get_param_mismatch_is_none_but_present() {
        let data = SignalData::with_params((), Params::new().with("x", 1_i32));

        assert_eq!(data.get_param::<u64>("x"), None);
        assert_eq!(data.get_param::<i32>("missing"), None);
        assert!(data.has_param("x"));
        assert!(!data.has_param("missing"));
    }

    #[test]
    fn test_merge_params_new_wins_and_keeps_payload() {
        let data = SignalData::with_params("v", Params::new().with("a", 1).with("b", 1));
        let merged = data.merge_params(Params::new().with("b", 2).with("c", 3));

        assert_eq!(*merged.value(), "v");
        assert_eq!(merged.params().len(), 3);
        assert_eq!(merged.get_param::<i32>("a"), Some(&1));
        assert_eq!(merged.get_param::<i32>("b"), Some(&2));
        assert_eq!(merged.get_param::<i32>("c"), Some(&3));
    }

    #[test]
    fn test_from_bare_value() {
        let data: SignalData<&str> = "hello".into();
        assert_eq!(data.into_value(), "hello");
    }

    #[test]
    fn test_map_keeps_params() {
        let data = SignalData::with_params(2, Params::new().with("unit", "px"));
        let doubled = data.map(|v| v * 2);

        assert_eq!(*doubled.value(), 4);
        assert_eq!(doubled.get_param::<&str>("unit"), Some(&"px"));
    }

    #[test]
    fn test_debug_output() {
        let data = SignalData::with_params(7, Params::new().with("k", 0));
        assert_eq!(
            format!("{data:?}"),
            r#"SignalData { value: 7, params: Params { keys: ["k"] } }"#
        );
    }
}
