//! Loads the map provider's script at most once per loader
//!
//! Every component that needs the provider calls [`ProviderLoader::load`].
//! The first call starts the injection; concurrent callers receive the same
//! shared future, so the script is requested once however many maps mount at
//! the same time.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::core::config::ProviderConfig;
use crate::traits::ScriptInjector;
use crate::MapError;

/// Cloneable load failure, shared by every waiter
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ScriptLoadError(pub String);

impl From<ScriptLoadError> for MapError {
    fn from(err: ScriptLoadError) -> Self {
        MapError::ScriptLoad(err.0)
    }
}

pub type LoadFuture = Shared<BoxFuture<'static, Result<(), ScriptLoadError>>>;

enum Phase {
    Idle,
    Loading(LoadFuture),
    Ready,
    Failed(ScriptLoadError),
}

struct Inner {
    phase: Phase,
    /// Bumped on teardown so a load started before it cannot mark us ready
    generation: u64,
}

pub struct ProviderLoader {
    injector: Arc<dyn ScriptInjector>,
    src: String,
    inner: Arc<Mutex<Inner>>,
    attempts: Arc<AtomicUsize>,
}

impl ProviderLoader {
    pub fn new(injector: Arc<dyn ScriptInjector>, config: &ProviderConfig) -> Self {
        Self {
            injector,
            src: config.script_src(),
            inner: Arc::new(Mutex::new(Inner {
                phase: Phase::Idle,
                generation: 0,
            })),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn script_src(&self) -> &str {
        &self.src
    }

    /// Future resolving once the provider is usable
    ///
    /// Starts an injection when idle or after a failure; otherwise joins the
    /// one in flight or resolves immediately.
    pub fn load(&self) -> LoadFuture {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(_) => {
                let err = ScriptLoadError("loader state poisoned".to_string());
                return futures::future::ready(Err(err)).boxed().shared();
            }
        };

        match &inner.phase {
            Phase::Ready => return futures::future::ready(Ok(())).boxed().shared(),
            Phase::Loading(pending) => return pending.clone(),
            Phase::Failed(err) => {
                log::info!("retrying provider script after earlier failure: {}", err);
            }
            Phase::Idle => {}
        }

        let injector = Arc::clone(&self.injector);
        let state = Arc::clone(&self.inner);
        let attempts = Arc::clone(&self.attempts);
        let src = self.src.clone();
        let generation = inner.generation;

        let future = async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            log::debug!("injecting map provider script {}", src);
            let result = injector.inject(&src).await;

            if let Ok(mut inner) = state.lock() {
                if inner.generation == generation {
                    inner.phase = match &result {
                        Ok(()) => Phase::Ready,
                        Err(err) => {
                            log::error!("map provider script failed to load: {}", err);
                            Phase::Failed(err.clone())
                        }
                    };
                }
            }
            result
        }
        .boxed()
        .shared();

        inner.phase = Phase::Loading(future.clone());
        future
    }

    /// Awaits the provider, mapping failures into [`MapError`]
    pub async fn ready(&self) -> crate::Result<()> {
        self.load().await.map_err(MapError::from)
    }

    pub fn is_ready(&self) -> bool {
        self.inner
            .lock()
            .map(|inner| matches!(inner.phase, Phase::Ready))
            .unwrap_or(false)
    }

    /// Forgets any loaded or pending script; the next `load` injects again
    pub fn teardown(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.phase = Phase::Idle;
            inner.generation += 1;
        }
    }

    /// How many injections were started
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}
