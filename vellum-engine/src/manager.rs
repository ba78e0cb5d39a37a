//! Process-wide lifecycle of the shared rendering engine.
//!
//! Exactly one engine process exists at a time. The UNINITIALIZED→READY
//! transition runs with the state lock held, so concurrent first callers
//! serialize on the lock and observe a single startup instead of racing N
//! redundant ones.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::session::EngineSession;

/// Observable lifecycle state of the shared engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

enum ManagerInner {
    Uninitialized,
    Initializing,
    Ready(Arc<EngineSession>),
    Closed,
}

/// Lazily starts, shares, and shuts down the one [`EngineSession`] per
/// process. Request handlers reach the engine only through [`acquire`].
///
/// [`acquire`]: EngineManager::acquire
pub struct EngineManager {
    config: EngineConfig,
    inner: Mutex<ManagerInner>,
}

impl EngineManager {
    pub fn new(config: EngineConfig) -> Self {
        EngineManager {
            config,
            inner: Mutex::new(ManagerInner::Uninitialized),
        }
    }

    pub async fn state(&self) -> EngineState {
        match &*self.inner.lock().await {
            ManagerInner::Uninitialized => EngineState::Uninitialized,
            ManagerInner::Initializing => EngineState::Initializing,
            ManagerInner::Ready(_) => EngineState::Ready,
            ManagerInner::Closed => EngineState::Closed,
        }
    }

    /// Return the shared READY session, starting the engine on first demand.
    ///
    /// A failed startup resets the state to UNINITIALIZED so a later caller
    /// may retry; the manager itself never retries. After [`shutdown`] every
    /// call fails with [`EngineError::Closed`].
    ///
    /// [`shutdown`]: EngineManager::shutdown
    pub async fn acquire(&self) -> Result<Arc<EngineSession>, EngineError> {
        let mut inner = self.inner.lock().await;
        match &*inner {
            ManagerInner::Ready(session) => return Ok(session.clone()),
            ManagerInner::Closed => return Err(EngineError::Closed),
            // An Initializing marker is only observable here when a previous
            // caller was cancelled mid-startup; treat it as uninitialized.
            ManagerInner::Uninitialized | ManagerInner::Initializing => {}
        }

        *inner = ManagerInner::Initializing;
        match EngineSession::launch(&self.config).await {
            Ok(session) => {
                let session = Arc::new(session);
                *inner = ManagerInner::Ready(session.clone());
                tracing::info!("rendering engine session ready");
                Ok(session)
            }
            Err(err) => {
                *inner = ManagerInner::Uninitialized;
                tracing::error!(error = %err, "rendering engine startup failed");
                Err(err)
            }
        }
    }

    /// Stop the engine process and release it. Idempotent; safe to call from
    /// any state. Does not wait for in-flight renders; they fail when the
    /// connection drops.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        if let ManagerInner::Ready(session) = &*inner {
            session.close().await;
            tracing::info!("rendering engine stopped");
        }
        *inner = ManagerInner::Closed;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
