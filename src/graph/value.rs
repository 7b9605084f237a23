//! Deferred values produced by deployment graph nodes.
//!
//! An [`Output`] is a placeholder for a value that is unknown until its
//! producing node finishes provisioning: resolved once, cached, and never
//! readable synchronously. Consumers `await` it; composition is available
//! through [`Output::map`], [`Output::zip`], and [`Output::zip3`].

use tokio::sync::watch;

use crate::error::GraphError;

/// A deferred value resolved by a deployment graph node.
///
/// Cheap to clone; every clone observes the same one-shot resolution.
#[derive(Debug, Clone)]
pub struct Output<T> {
    /// Name of the producing node, carried for diagnostics.
    node: String,
    /// Channel observing the resolution.
    rx: watch::Receiver<Option<T>>,
}

/// The resolving half of a deferred value, held by the producing node.
#[derive(Debug)]
pub struct Resolver<T> {
    tx: watch::Sender<Option<T>>,
}

/// Creates a new unresolved deferred value for the named node.
#[must_use]
pub fn deferred<T>(node: impl Into<String>) -> (Resolver<T>, Output<T>) {
    let (tx, rx) = watch::channel(None);
    (
        Resolver { tx },
        Output {
            node: node.into(),
            rx,
        },
    )
}

impl<T> Resolver<T> {
    /// Resolves the deferred value. Consumes the resolver: resolution is
    /// one-shot.
    pub fn resolve(self, value: T) {
        // Send only fails when every consumer is gone, which is harmless.
        let _ = self.tx.send(Some(value));
    }
}

impl<T: Clone + Send + Sync + 'static> Output<T> {
    /// Creates an already-resolved output.
    #[must_use]
    pub fn resolved(node: impl Into<String>, value: T) -> Self {
        let (resolver, output) = deferred(node);
        resolver.resolve(value);
        output
    }

    /// Returns the name of the producing node.
    #[must_use]
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Waits for the value to resolve and returns a clone of it.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ProducerFailed`] if the producing node failed
    /// (or was aborted) before resolving.
    pub async fn resolve(&self) -> Result<T, GraphError> {
        let mut rx = self.rx.clone();

        let guard = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| GraphError::ProducerFailed {
                node: self.node.clone(),
            })?;

        guard.clone().ok_or_else(|| GraphError::Unresolved {
            node: self.node.clone(),
        })
    }

    /// Transforms the resolved value with a pure function, producing a new
    /// deferred value.
    #[must_use]
    pub fn map<U, F>(&self, node: impl Into<String>, f: F) -> Output<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let node = node.into();
        let (resolver, output) = deferred(&node);
        let source = self.clone();

        tokio::spawn(async move {
            // A failed source simply drops the resolver, which propagates
            // the failure to any consumer of the mapped output.
            if let Ok(value) = source.resolve().await {
                resolver.resolve(f(value));
            }
        });

        output
    }

    /// Combines this output with another, resolving once both resolve.
    #[must_use]
    pub fn zip<U>(&self, other: &Output<U>, node: impl Into<String>) -> Output<(T, U)>
    where
        U: Clone + Send + Sync + 'static,
    {
        let node = node.into();
        let (resolver, output) = deferred(&node);
        let a = self.clone();
        let b = other.clone();

        tokio::spawn(async move {
            if let (Ok(a), Ok(b)) = (a.resolve().await, b.resolve().await) {
                resolver.resolve((a, b));
            }
        });

        output
    }

    /// Combines three outputs, resolving once all three resolve.
    #[must_use]
    pub fn zip3<U, V>(
        &self,
        second: &Output<U>,
        third: &Output<V>,
        node: impl Into<String>,
    ) -> Output<(T, U, V)>
    where
        U: Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let node = node.into();
        let (resolver, output) = deferred(&node);
        let a = self.clone();
        let b = second.clone();
        let c = third.clone();

        tokio::spawn(async move {
            if let (Ok(a), Ok(b), Ok(c)) = (a.resolve().await, b.resolve().await, c.resolve().await)
            {
                resolver.resolve((a, b, c));
            }
        });

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_after_producer() {
        let (resolver, output) = deferred::<String>("account");
        resolver.resolve(String::from("sa123"));

        assert_eq!(output.resolve().await.unwrap(), "sa123");
    }

    #[tokio::test]
    async fn test_resolve_blocks_until_resolved() {
        let (resolver, output) = deferred::<u32>("late");

        let waiter = tokio::spawn(async move { output.resolve().await });
        tokio::task::yield_now().await;
        resolver.resolve(7);

        assert_eq!(waiter.await.unwrap().unwrap(), 7);
    }

    #[tokio::test]
    async fn test_resolution_is_cached_across_clones() {
        let (resolver, output) = deferred::<u32>("shared");
        let clone = output.clone();
        resolver.resolve(42);

        assert_eq!(output.resolve().await.unwrap(), 42);
        assert_eq!(clone.resolve().await.unwrap(), 42);
        // A second read observes the same cached value.
        assert_eq!(output.resolve().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_dropped_resolver_is_producer_failure() {
        let (resolver, output) = deferred::<u32>("failed");
        drop(resolver);

        let err = output.resolve().await.unwrap_err();
        assert!(matches!(err, GraphError::ProducerFailed { node } if node == "failed"));
    }

    #[tokio::test]
    async fn test_map() {
        let output = Output::resolved("account", String::from("sa123"));
        let mapped = output.map("endpoint", |name| format!("https://{name}"));

        assert_eq!(mapped.resolve().await.unwrap(), "https://sa123");
    }

    #[tokio::test]
    async fn test_map_propagates_failure() {
        let (resolver, output) = deferred::<u32>("failed");
        let mapped = output.map("derived", |n| n * 2);
        drop(resolver);

        assert!(mapped.resolve().await.is_err());
    }

    #[tokio::test]
    async fn test_zip_and_zip3() {
        let a = Output::resolved("a", 1u32);
        let b = Output::resolved("b", String::from("two"));
        let c = Output::resolved("c", 3u32);

        assert_eq!(
            a.zip(&b, "ab").resolve().await.unwrap(),
            (1, String::from("two"))
        );
        assert_eq!(
            a.zip3(&b, &c, "abc").resolve().await.unwrap(),
            (1, String::from("two"), 3)
        );
    }
}
