//! Живые сессии оформления заказа.
//!
//! Каждый сценарий лежит за своим `tokio::sync::Mutex`: обработчики шагов
//! держат его на время удалённых вызовов. Рядом хранится handle завершения,
//! чтобы сессию можно было закрыть, пока её сценарий ещё ждёт ответа.
//! Сессии без запросов дольше `idle_ttl` закрываются очисткой
//! (см. [`crate::services::cleanup`]).

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::checkout::lifetime::TeardownHandle;
use crate::checkout::session::RecordingNavigator;
use crate::checkout::CheckoutFlow;

pub struct CheckoutEntry {
    pub flow: Mutex<CheckoutFlow>,
    pub navigator: Arc<RecordingNavigator>,
    teardown: TeardownHandle,
    last_touched: StdMutex<Instant>,
}

impl CheckoutEntry {
    fn touch(&self) {
        *self.last_touched.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    /// Сколько прошло с последнего обращения к сессии.
    pub fn idle_for(&self) -> Duration {
        self.last_touched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("too many open checkouts (limit {0})")]
pub struct RegistryFull(pub usize);

type Entries = HashMap<Uuid, Arc<CheckoutEntry>>;

#[derive(Clone)]
pub struct CheckoutRegistry {
    entries: Arc<RwLock<Entries>>,
    limit: usize,
    idle_ttl: Duration,
}

impl CheckoutRegistry {
    pub fn new(limit: usize, idle_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            limit,
            idle_ttl,
        }
    }

    pub async fn insert(
        &self,
        flow: CheckoutFlow,
        navigator: Arc<RecordingNavigator>,
    ) -> Result<(Uuid, Arc<CheckoutEntry>), RegistryFull> {
        let mut entries = self.entries.write().await;

        // Лимит исчерпан: сначала освобождаем места простаивающих сессий
        let evicted = if entries.len() >= self.limit {
            self.take_idle(&mut entries)
        } else {
            Vec::new()
        };
        if entries.len() >= self.limit {
            drop(entries);
            Self::close_all(evicted).await;
            return Err(RegistryFull(self.limit));
        }

        let id = Uuid::new_v4();
        let entry = Arc::new(CheckoutEntry {
            teardown: flow.teardown_handle(),
            flow: Mutex::new(flow),
            navigator,
            last_touched: StdMutex::new(Instant::now()),
        });
        entries.insert(id, Arc::clone(&entry));
        debug!("Checkout {} registered ({} open)", id, entries.len());
        drop(entries);

        Self::close_all(evicted).await;
        Ok((id, entry))
    }

    /// Находит сессию и продлевает ей жизнь.
    pub async fn get(&self, id: Uuid) -> Option<Arc<CheckoutEntry>> {
        let entry = self.entries.read().await.get(&id).cloned()?;
        entry.touch();
        Some(entry)
    }

    /// Убирает сессию и отменяет всё, чего она ждёт.
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.entries.write().await.remove(&id);
        match removed {
            Some(entry) => {
                Self::close(id, entry).await;
                true
            }
            None => false,
        }
    }

    /// Закрывает все сессии, простоявшие дольше `idle_ttl`.
    pub async fn sweep_idle(&self) -> usize {
        let evicted = {
            let mut entries = self.entries.write().await;
            self.take_idle(&mut entries)
        };
        let count = evicted.len();
        Self::close_all(evicted).await;
        count
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn take_idle(&self, entries: &mut Entries) -> Vec<(Uuid, Arc<CheckoutEntry>)> {
        let idle: Vec<Uuid> = entries
            .iter()
            .filter(|(_, entry)| entry.idle_for() >= self.idle_ttl)
            .map(|(id, _)| *id)
            .collect();
        idle.into_iter()
            .filter_map(|id| entries.remove(&id).map(|entry| (id, entry)))
            .collect()
    }

    async fn close_all(evicted: Vec<(Uuid, Arc<CheckoutEntry>)>) {
        for (id, entry) in evicted {
            debug!("Checkout {} idle for {:?}, evicting", id, entry.idle_for());
            Self::close(id, entry).await;
        }
    }

    async fn close(id: Uuid, entry: Arc<CheckoutEntry>) {
        entry.teardown.teardown();
        // таймер редиректа снимается, как только текущий владелец отпустит сценарий
        entry.flow.lock().await.teardown();
        info!("Checkout {} closed", id);
    }
}
