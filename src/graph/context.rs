//! Deployment context driving the concurrent graph walk.
//!
//! Every resource of the stack is registered as a named node: an async
//! task producing one deferred [`Output`]. Dependency order is not stated
//! anywhere; it emerges from nodes awaiting the outputs they consume. The
//! context schedules all nodes at once and the runtime blocks each one on
//! its data edges, so independent subtrees provision in parallel.

use std::future::Future;

use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::error::{GraphError, Result, StratusError};

use super::value::{deferred, Output};

/// The deployment context: owns every node task of one graph evaluation.
#[derive(Debug, Default)]
pub struct DeploymentContext {
    /// Node tasks, keyed only by completion order.
    tasks: JoinSet<Result<()>>,
}

impl DeploymentContext {
    /// Creates an empty deployment context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: JoinSet::new(),
        }
    }

    /// Registers a named node and returns its deferred output.
    ///
    /// The node future starts running immediately; it typically begins by
    /// awaiting the outputs of the nodes it depends on.
    pub fn node<T, F>(&mut self, name: impl Into<String>, fut: F) -> Output<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let name = name.into();
        let (resolver, output) = deferred::<T>(&name);

        self.tasks.spawn(async move {
            match fut.await {
                Ok(value) => {
                    debug!(node = %name, "node resolved");
                    resolver.resolve(value);
                    Ok(())
                }
                Err(e) => {
                    // Consumers of this node observe the dropped resolver
                    // as a producer failure; the graph-level error below is
                    // the one surfaced to the user.
                    error!(node = %name, "node failed: {e}");
                    Err(e)
                }
            }
        });

        output
    }

    /// Returns the number of registered nodes still owned by the context.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.tasks.len()
    }

    /// Drives the graph to completion.
    ///
    /// The first node failure is terminal: all remaining tasks are aborted
    /// and the failing node's error is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing node, or a
    /// [`GraphError::TaskAborted`] if a node panicked.
    pub async fn run(mut self) -> Result<()> {
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    self.tasks.abort_all();
                    return Err(e);
                }
                Err(join_err) => {
                    self.tasks.abort_all();
                    if join_err.is_cancelled() {
                        continue;
                    }
                    return Err(StratusError::Graph(GraphError::TaskAborted {
                        message: join_err.to_string(),
                    }));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AzureError;

    #[tokio::test]
    async fn test_nodes_resolve_in_dependency_order() {
        let mut ctx = DeploymentContext::new();

        let first = ctx.node("first", async { Ok(String::from("alpha")) });
        let second = {
            let first = first.clone();
            ctx.node("second", async move {
                let value = first.resolve().await?;
                Ok(format!("{value}-beta"))
            })
        };

        assert_eq!(ctx.node_count(), 2);
        ctx.run().await.unwrap();
        assert_eq!(second.resolve().await.unwrap(), "alpha-beta");
    }

    #[tokio::test]
    async fn test_first_failure_aborts_graph() {
        let mut ctx = DeploymentContext::new();

        let failing = ctx.node::<String, _>("failing", async {
            Err(StratusError::Azure(AzureError::api_error(403, "denied")))
        });
        let downstream = {
            let failing = failing.clone();
            ctx.node("downstream", async move {
                let value = failing.resolve().await?;
                Ok(value)
            })
        };

        let err = ctx.run().await.unwrap_err();
        assert!(matches!(
            err,
            StratusError::Azure(AzureError::ApiRequestFailed { status: 403, .. })
        ));
        // The downstream node observes the failure rather than hanging.
        assert!(downstream.resolve().await.is_err());
    }

    #[tokio::test]
    async fn test_independent_nodes_run_concurrently() {
        use tokio::sync::oneshot;

        let mut ctx = DeploymentContext::new();
        let (tx, rx) = oneshot::channel::<()>();

        // Node A blocks until node B signals it: only possible when both
        // are scheduled at the same time.
        let a = ctx.node("a", async move {
            rx.await
                .map_err(|e| StratusError::internal(e.to_string()))?;
            Ok(1u32)
        });
        let _b = ctx.node("b", async move {
            let _ = tx.send(());
            Ok(2u32)
        });

        ctx.run().await.unwrap();
        assert_eq!(a.resolve().await.unwrap(), 1);
    }
}
