use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::services::registry::CheckoutRegistry;

/// Фоновая очистка брошенных сессий оформления.
pub struct CleanupService {
    registry: CheckoutRegistry,
    every: Duration,
}

impl CleanupService {
    pub fn new(registry: CheckoutRegistry, every: Duration) -> Self {
        Self { registry, every }
    }

    /// Один проход: закрывает простаивающие сессии, возвращает их число.
    pub async fn run_cleanup(&self) -> usize {
        let closed = self.registry.sweep_idle().await;
        if closed > 0 {
            info!(
                "🧹 Closed {} idle checkouts, {} still open",
                closed,
                self.registry.len().await
            );
        } else {
            debug!("🧹 No idle checkouts to close");
        }
        closed
    }

    /// Запускает очистку по таймеру до конца работы рантайма.
    pub fn spawn(self) -> JoinHandle<()> {
        task::spawn(async move {
            let mut ticker = interval(self.every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.run_cleanup().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn empty_registry_is_a_noop() {
        let service = CleanupService::new(
            CheckoutRegistry::new(4, Duration::from_secs(60)),
            Duration::from_secs(15),
        );
        assert_eq!(service.run_cleanup().await, 0);
    }
}
