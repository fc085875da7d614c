use crate::config::Config;
use crate::rate_limit::RateLimiter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task;

const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

// ── Prune Shutdown Guard ────────────────────────────────────────────────────
// Sets a shared flag when the last AppState clone is dropped, which stops the
// rate-limit pruning task.
struct PruneShutdownGuard(Arc<AtomicBool>);

impl Drop for PruneShutdownGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

// ── Shared HTTP State ───────────────────────────────────────────────────────
// Immutable configuration plus the per-client request counters. The message
// store is not reachable from here: it belongs to a single viewer session.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub limiter: Arc<RateLimiter>,
    _prune_guard: Arc<PruneShutdownGuard>,
}

impl AppState {
    /// Must be called from inside a tokio runtime: spawns the pruning task.
    pub fn new(config: Config) -> Self {
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit_max,
            config.rate_limit_window,
        ));

        let shutdown = Arc::new(AtomicBool::new(false));
        let guard = Arc::new(PruneShutdownGuard(shutdown.clone()));
        let weak_limiter = Arc::downgrade(&limiter);
        task::spawn(async move {
            let mut ticker = tokio::time::interval(PRUNE_INTERVAL);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if shutdown.load(Ordering::Acquire) {
                    tracing::info!("Rate-limit pruning task shutting down");
                    break;
                }
                let Some(limiter) = weak_limiter.upgrade() else {
                    break;
                };
                let removed = limiter.prune();
                if removed > 0 {
                    tracing::debug!(
                        "Pruned {} expired rate-limit windows ({} tracked)",
                        removed,
                        limiter.tracked_clients()
                    );
                }
            }
        });

        tracing::info!(
            "AppState initialized: {} req / {:?} per client, {} CORS origins",
            config.rate_limit_max,
            config.rate_limit_window,
            config.cors_origins.len()
        );

        Self {
            config: Arc::new(config),
            limiter,
            _prune_guard: guard,
        }
    }
}
