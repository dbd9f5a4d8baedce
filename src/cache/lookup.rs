use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::future::Future;
use tracing::{debug, warn};

use super::SharedCache;

/// Whether a lookup result is worth caching. Empty and zero-like results
/// are not stored, so the next identical call recomputes them.
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> Truthy for Vec<T> {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Truthy> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.as_ref().is_some_and(Truthy::is_truthy)
    }
}

impl Truthy for Value {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
        }
    }
}

macro_rules! truthy_int {
    ($($t:ty),*) => {
        $(impl Truthy for $t {
            fn is_truthy(&self) -> bool {
                *self != 0
            }
        })*
    };
}

truthy_int!(i32, i64, u32, u64, usize);

impl Truthy for f64 {
    fn is_truthy(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

/// Builds the cache key of a call: `label` followed by every positional
/// argument in JSON form, joined with `:`.
///
/// `args` is the argument list: a tuple or array contributes one element
/// per item, anything else counts as a single argument. A lone `Vec` is
/// therefore keyed like a tuple of its items (`&vec![1, 2]` and `&(1, 2)`
/// share a key); wrap it as `&(items,)` to key it as one argument. `None` if
/// the arguments cannot be serialized.
pub fn cache_key<A: Serialize + ?Sized>(label: &str, args: &A) -> Option<String> {
    let value = serde_json::to_value(args).ok()?;

    let mut parts = vec![label.to_string()];
    match value {
        Value::Array(items) => parts.extend(items.iter().map(Value::to_string)),
        other => parts.push(other.to_string()),
    }
    Some(parts.join(":"))
}

/// Memoizes an async, argument-deterministic lookup in a [`SharedCache`].
///
/// ```rust,no_run
/// # use open_player::cache::{CachedLookup, SharedCache};
/// # async fn example(cache: SharedCache) {
/// let search = CachedLookup::new(cache, "search", |(query, limit): (String, usize)| async move {
///     vec![format!("{query} #{limit}")]
/// });
///
/// let first = search.call(("lofi".to_string(), 5)).await;
/// let second = search.call(("lofi".to_string(), 5)).await; // cache hit
/// assert_eq!(first, second);
/// # }
/// ```
pub struct CachedLookup<F> {
    cache: SharedCache,
    label: String,
    op: F,
}

impl<F> CachedLookup<F> {
    pub fn new(cache: SharedCache, label: impl Into<String>, op: F) -> Self {
        Self {
            cache,
            label: label.into(),
            op,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the cached result for `args`, or runs the lookup and caches a
    /// truthy result. Without an initialized cache this is a plain call.
    pub async fn call<A, T, Fut>(&self, args: A) -> T
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = T>,
        A: Serialize,
        T: Serialize + DeserializeOwned + Truthy,
    {
        let store = self.cache.current();
        let key = store.as_ref().and_then(|_| cache_key(&self.label, &args));

        if let (Some(store), Some(key)) = (&store, &key) {
            if let Some(value) = store.get(key) {
                match serde_json::from_value::<T>(value) {
                    Ok(hit) => {
                        debug!("✅ Cache hit: {}", key);
                        return hit;
                    }
                    Err(e) => warn!("⚠️ Entrada de caché ilegible para {}: {}", key, e),
                }
            }
        }

        let result = (self.op)(args).await;

        if let (Some(store), Some(key)) = (store, key) {
            if result.is_truthy() {
                match serde_json::to_value(&result) {
                    Ok(value) => store.set(key, value).await,
                    Err(e) => warn!("⚠️ No se pudo serializar el resultado de {}: {}", key, e),
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };
    use tempfile::TempDir;

    async fn initialized(tmp: &TempDir) -> SharedCache {
        let cache = SharedCache::new();
        cache.initialize(tmp.path(), "lookups").await;
        cache
    }

    fn counting_lookup(
        cache: SharedCache,
        calls: Arc<AtomicUsize>,
        result: Vec<String>,
    ) -> CachedLookup<impl Fn((String, u32)) -> std::future::Ready<Vec<String>>> {
        CachedLookup::new(cache, "search", move |_args: (String, u32)| {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(result.clone())
        })
    }

    #[test]
    fn key_joins_positional_arguments() {
        assert_eq!(
            cache_key("search", &("lofi beats", 5)).as_deref(),
            Some(r#"search:"lofi beats":5"#)
        );
        assert_eq!(cache_key("track", &"abc").as_deref(), Some(r#"track:"abc""#));
        assert_eq!(
            cache_key("playlist", &(vec![1, 2],)).as_deref(),
            Some("playlist:[1,2]")
        );
    }

    #[test]
    fn wrapped_sequence_keeps_its_own_key() {
        assert_eq!(cache_key("x", &vec![1, 2]), cache_key("x", &(1, 2)));
        assert_ne!(cache_key("x", &(vec![1, 2],)), cache_key("x", &(1, 2)));
    }

    #[test]
    fn unserializable_arguments_have_no_key() {
        let args = HashMap::from([((1u8, 2u8), 3u8)]);

        assert_eq!(cache_key("graph", &(args,)), None);
    }

    #[tokio::test]
    async fn unserializable_arguments_call_through() {
        let tmp = TempDir::new().unwrap();
        let cache = initialized(&tmp).await;
        let calls = Arc::new(AtomicUsize::new(0));
        let lookup = CachedLookup::new(cache.clone(), "graph", {
            let calls = calls.clone();
            move |(edges,): (HashMap<(u8, u8), u8>,)| {
                calls.fetch_add(1, Ordering::SeqCst);
                std::future::ready(vec![edges.len().to_string()])
            }
        });
        let args = HashMap::from([((1u8, 2u8), 3u8)]);

        let first = lookup.call((args.clone(),)).await;
        let second = lookup.call((args,)).await;

        assert_eq!(first, vec!["1".to_string()]);
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.current().unwrap().is_empty());
    }

    #[test]
    fn truthiness_follows_emptiness() {
        assert!(!String::new().is_truthy());
        assert!(!Vec::<u8>::new().is_truthy());
        assert!(!Some(0u32).is_truthy());
        assert!(!None::<String>.is_truthy());
        assert!(!json!({}).is_truthy());
        assert!(json!({"title": "x"}).is_truthy());
        assert!(Some("x".to_string()).is_truthy());
        assert!(1.5f64.is_truthy());
    }

    #[tokio::test]
    async fn identical_calls_run_lookup_once() {
        let tmp = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let lookup = counting_lookup(initialized(&tmp).await, calls.clone(), vec!["hit".into()]);

        let first = lookup.call(("lofi".to_string(), 5)).await;
        let second = lookup.call(("lofi".to_string(), 5)).await;

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_arguments_miss() {
        let tmp = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let lookup = counting_lookup(initialized(&tmp).await, calls.clone(), vec!["hit".into()]);

        lookup.call(("lofi".to_string(), 5)).await;
        lookup.call(("lofi".to_string(), 6)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_results_are_recomputed() {
        let tmp = TempDir::new().unwrap();
        let cache = initialized(&tmp).await;
        let calls = Arc::new(AtomicUsize::new(0));
        let lookup = counting_lookup(cache.clone(), calls.clone(), Vec::new());

        lookup.call(("nothing".to_string(), 1)).await;
        lookup.call(("nothing".to_string(), 1)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.current().unwrap().is_empty());
    }

    #[tokio::test]
    async fn uninitialized_cache_always_calls_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lookup = counting_lookup(SharedCache::new(), calls.clone(), vec!["hit".into()]);

        lookup.call(("lofi".to_string(), 5)).await;
        lookup.call(("lofi".to_string(), 5)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cached_results_outlive_the_process_store() {
        let tmp = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let lookup = counting_lookup(initialized(&tmp).await, calls.clone(), vec!["hit".into()]);
        lookup.call(("lofi".to_string(), 5)).await;

        let reloaded = counting_lookup(initialized(&tmp).await, calls.clone(), vec!["other".into()]);
        let result = reloaded.call(("lofi".to_string(), 5)).await;

        assert_eq!(result, vec!["hit".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn undecodable_entry_falls_back_to_lookup() {
        let tmp = TempDir::new().unwrap();
        let cache = initialized(&tmp).await;
        let key = cache_key("search", &("lofi", 5)).unwrap();
        cache.current().unwrap().set(key, json!({"not": "a list"})).await;
        let calls = Arc::new(AtomicUsize::new(0));
        let lookup = counting_lookup(cache, calls.clone(), vec!["fresh".into()]);

        let result = lookup.call(("lofi".to_string(), 5)).await;

        assert_eq!(result, vec!["fresh".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
