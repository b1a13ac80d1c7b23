//! Path parameters bound by a dynamic match.
//!
//! Values are kept in pattern order in a small vector, so the common case
//! of a handful of parameters never touches the heap for the container.

use smallvec::SmallVec;

/// Maximum number of parameters stored inline.
const INLINE_PARAMS: usize = 4;

/// Ordered `(name, value)` pairs extracted from a request path.
///
/// Lookup by name is a linear scan. Duplicate names are kept as-is, and
/// [`get`](Self::get) returns the first one.
///
/// # Example
///
/// ```rust
/// use trellis_router::Params;
///
/// let mut params = Params::new();
/// params.push("title", "hello-world");
/// params.push("id", "3");
///
/// assert_eq!(params.get("title"), Some("hello-world"));
/// assert_eq!(params.get("id"), Some("3"));
/// assert_eq!(params.get("page"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates an empty parameter list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value of the first parameter called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Iterates over `(name, value)` pairs in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(as_str_pair)
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a str, &'a str);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, String)>,
        fn(&'a (String, String)) -> (&'a str, &'a str),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter().map(as_str_pair as fn(&'a (String, String)) -> _)
    }
}

fn as_str_pair((name, value): &(String, String)) -> (&str, &str) {
    (name.as_str(), value.as_str())
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_new() {
        let params = Params::new();
        assert!(params.is_empty());
        assert_eq!(params.len(), 0);
        assert_eq!(params.get("id"), None);
    }

    #[test]
    fn test_params_push_and_get() {
        let mut params = Params::new();
        params.push("title", "test-number-one-2020-01");
        params.push("id", "3");

        assert_eq!(params.get("title"), Some("test-number-one-2020-01"));
        assert_eq!(params.get("id"), Some("3"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_duplicate_names_first_wins() {
        let params: Params = [("id", "103"), ("id", "10")].into_iter().collect();

        assert_eq!(params.len(), 2);
        assert_eq!(params.get("id"), Some("103"));
    }

    #[test]
    fn test_params_iter_keeps_order() {
        let params: Params = [("b", "2"), ("a", "1")].into_iter().collect();

        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("b", "2"), ("a", "1")]);

        let borrowed: Vec<_> = (&params).into_iter().collect();
        assert_eq!(borrowed, pairs);
    }

    #[test]
    fn test_params_spill_past_inline_capacity() {
        let mut params = Params::new();
        for i in 0..10 {
            params.push(format!("key{i}"), format!("value{i}"));
        }

        assert_eq!(params.len(), 10);
        assert_eq!(params.get("key7"), Some("value7"));
    }
}
