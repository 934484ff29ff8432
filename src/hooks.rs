//! Post-cycle hook extension point.
//!
//! Callers attach hooks to the cycle runner; after every acquisition the
//! runner invokes them sequentially, in registration order, each awaited to
//! completion before the next starts. Hooks receive the current
//! [`CycleContext`] so external actions can be correlated with the cycle
//! number; the runner consumes no return value beyond success or failure.
//!
//! Hook failures propagate and abort the run, like any other device error.

use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use log::debug;

/// Per-cycle context handed to every hook invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleContext {
    /// Zero-based index of the current cycle.
    pub cycle_nb: usize,
    /// Total number of cycles requested for this run.
    pub repeats: usize,
}

/// A callback run once after each cycle's acquisition.
#[async_trait]
pub trait CycleHook: Send + Sync {
    /// Hook name, used in log lines.
    fn name(&self) -> &str;

    /// Execute the hook for the given cycle.
    async fn run(&self, ctx: &CycleContext) -> Result<()>;
}

/// Adapter turning an async closure into a [`CycleHook`].
pub struct FnHook {
    name: String,
    #[allow(clippy::type_complexity)]
    f: Box<dyn Fn(CycleContext) -> BoxFuture<'static, Result<()>> + Send + Sync>,
}

impl FnHook {
    /// Wrap `f` as a named hook.
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(CycleContext) -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Box::new(f),
        }
    }
}

#[async_trait]
impl CycleHook for FnHook {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &CycleContext) -> Result<()> {
        (self.f)(*ctx).await
    }
}

/// Ordered collection of post-cycle hooks.
///
/// Registration order is invocation order.
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<Box<dyn CycleHook>>,
}

impl HookRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook; it will run after every previously registered hook.
    pub fn register(&mut self, hook: Box<dyn CycleHook>) {
        self.hooks.push(hook);
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether no hooks are registered.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook for the given cycle, in registration order.
    ///
    /// The first failing hook aborts the remaining hooks and the error
    /// propagates to the caller.
    pub async fn run_all(&self, ctx: &CycleContext) -> Result<()> {
        for hook in &self.hooks {
            debug!("Running post-cycle hook '{}'", hook.name());
            hook.run(ctx).await?;
        }
        Ok(())
    }
}
