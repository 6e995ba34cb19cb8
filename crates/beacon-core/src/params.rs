//! Type-erased metadata attached to emitted values.
//!
//! [`Params`] maps string keys to arbitrary `'static` values. Retrieval is
//! checked: asking for a key under the wrong type yields `None`, the same as
//! asking for a key that was never stored.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A single type-erased parameter value.
///
/// Shared behind an `Arc` so envelopes stay cheap to clone during fan-out.
#[derive(Clone)]
pub struct ParamValue(Arc<dyn Any + Send + Sync>);

impl ParamValue {
    /// Wraps any thread-safe `'static` value.
    pub fn new<V: Any + Send + Sync>(value: V) -> Self {
        Self(Arc::new(value))
    }

    /// Borrows the stored value as `R` if that is its concrete type.
    pub fn downcast_ref<R: Any>(&self) -> Option<&R> {
        self.0.downcast_ref::<R>()
    }

    /// Returns `true` if the stored value's concrete type is `R`.
    pub fn is<R: Any>(&self) -> bool {
        self.0.is::<R>()
    }
}

impl fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ParamValue(..)")
    }
}

/// Key/value metadata carried by a [`SignalData`](crate::SignalData).
#[derive(Clone, Default)]
pub struct Params {
    entries: HashMap<String, ParamValue>,
}

impl Params {
    /// Creates an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    ///
    /// ```
    /// use beacon_core::Params;
    ///
    /// let params = Params::new().with("x", 1).with("button", "left");
    /// assert_eq!(params.get::<i32>("x"), Some(&1));
    /// ```
    #[must_use]
    pub fn with<V: Any + Send + Sync>(mut self, key: impl Into<String>, value: V) -> Self {
        self.insert(key, value);
        self
    }

    /// Stores `value` under `key`, returning the previous value if any.
    pub fn insert<V: Any + Send + Sync>(
        &mut self,
        key: impl Into<String>,
        value: V,
    ) -> Option<ParamValue> {
        self.entries.insert(key.into(), ParamValue::new(value))
    }

    /// Looks up `key` and borrows it as `R`.
    ///
    /// Returns `None` when the key is missing or the stored value is not an `R`.
    pub fn get<R: Any>(&self, key: &str) -> Option<&R> {
        self.entries.get(key)?.downcast_ref::<R>()
    }

    /// Returns the raw entry for `key` without any type check.
    pub fn get_raw(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the stored keys in arbitrary order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Combines two maps. Entries of `other` replace entries of `self` on
    /// key collision.
    #[must_use]
    pub fn merge(mut self, other: Params) -> Self {
        self.entries.extend(other.entries);
        self
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("Params").field("keys", &keys).finish()
    }
}

impl<K: Into<String>> FromIterator<(K, ParamValue)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, ParamValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<K: Into<String>> Extend<(K, ParamValue)> for Params {
    fn extend<I: IntoIterator<Item = (K, ParamValue)>>(&mut self, iter: I) {
        self.entries
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v)));
    }
}

/// Builds a [`Params`] map from `key => value` pairs.
///
/// ```
/// use beacon_core::params;
///
/// let params = params! { "x" => 1, "y" => 2.5_f64 };
/// assert_eq!(params.len(), 2);
/// ```
#[macro_export]
macro_rules! params {
    () => { $crate::Params::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::Params::new()$(.with($key, $value))+
    };
}
