use tracing::{debug, warn};

use crate::error::{LookoutError, MultiError, Result};
use crate::telemetry::context::LifecycleContext;
use crate::telemetry::subsystem::SubsystemHandle;

/// Deferred cleanup bound to exactly one started subsystem
pub type ReleaseFn = Box<dyn FnOnce(&LifecycleContext) -> Result<()> + Send>;

struct Release {
    name: String,
    release: ReleaseFn,
}

/// Ordered releases for everything started so far.
///
/// Releases run in registration order, not reverse.
#[derive(Default)]
pub struct ShutdownRegistry {
    pending: Vec<Release>,
}

impl ShutdownRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, release: F)
    where
        F: FnOnce(&LifecycleContext) -> Result<()> + Send + 'static,
    {
        let name = name.into();
        debug!(name = %name, position = self.pending.len(), "release registered");
        self.pending.push(Release { name, release: Box::new(release) });
    }

    /// Register `handle.shutdown` as the release for `name`
    pub fn register_handle<H: SubsystemHandle>(&mut self, name: impl Into<String>, handle: H) {
        self.register(name, move |ctx: &LifecycleContext| handle.shutdown(ctx));
    }

    /// Names of pending releases, in the order they will run
    pub fn names(&self) -> Vec<&str> {
        self.pending.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Run every pending release, first registered first.
    ///
    /// A failing or cancelled release never stops the ones after it; all
    /// failures come back joined. The registry is empty afterwards, so a
    /// second call returns `Ok(())`.
    pub fn shutdown_all(&mut self, ctx: &LifecycleContext) -> std::result::Result<(), MultiError> {
        let mut errors = MultiError::new();
        for Release { name, release } in self.pending.drain(..) {
            match release(ctx) {
                Ok(()) => debug!(name = %name, "released"),
                Err(source) => {
                    warn!(name = %name, error = %source, "release failed");
                    errors.append(LookoutError::Release { name, source: Box::new(source) });
                }
            }
        }
        errors.into_result()
    }
}

impl std::fmt::Debug for ShutdownRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownRegistry").field("pending", &self.names()).finish()
    }
}
