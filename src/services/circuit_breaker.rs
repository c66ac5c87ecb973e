//! circuit_breaker.rs
//!
//! Паттерн "Автоматический выключатель" для вызовов REST API кинотеатра.
//! Он не даёт сценарию оформления заказа раз за разом ждать таймаута от
//! неработающего сервиса: после серии сбоев запросы сразу отклоняются, а по
//! истечении паузы пропускается один пробный запрос.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, RwLock};
use tokio::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::config::CircuitBreakerConfig;

/// Состояния "Автоматического выключателя" (Circuit Breaker).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// **Closed (Замкнуто)**: нормальный режим, запросы разрешены.
    Closed,
    /// **Open (Разомкнуто)**: запросы временно запрещены после множественных сбоев.
    Open,
    /// **HalfOpen (Полуоткрыто)**: после таймаута разрешён пробный запрос.
    HalfOpen,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    state: RwLock<CircuitState>,
    /// Счетчик последовательных сбоев.
    failure_count: AtomicU32,
    /// Момент последнего сбоя для расчета таймаута.
    last_failure: Mutex<Option<Instant>>,
    failure_threshold: u32,
    timeout_duration: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, timeout: Duration) -> Self {
        Self {
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicU32::new(0),
            last_failure: Mutex::new(None),
            failure_threshold: failure_threshold.max(1),
            timeout_duration: timeout,
        }
    }

    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(config.failure_threshold, Duration::from_secs(config.timeout_seconds))
    }

    /// Проверяет, можно ли выполнить следующий запрос к сервису.
    pub fn can_execute(&self) -> bool {
        match self.state() {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = self
                    .last_failure
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .map(|at| at.elapsed());

                // Если с момента последнего сбоя прошло достаточно времени,
                // переходим в HalfOpen для тестового запроса.
                if elapsed.map_or(true, |e| e >= self.timeout_duration) {
                    *self.write_state() = CircuitState::HalfOpen;
                    info!("Circuit breaker transitioning to HalfOpen state");
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Регистрирует успешное выполнение запроса.
    pub fn record_success(&self) {
        let mut state = self.write_state();
        match *state {
            CircuitState::HalfOpen => {
                *state = CircuitState::Closed;
                self.failure_count.store(0, Ordering::Relaxed);
                info!("Circuit breaker recovered - transitioning to Closed state");
            }
            CircuitState::Closed => {
                self.failure_count.store(0, Ordering::Relaxed);
            }
            CircuitState::Open => {}
        }
    }

    /// Регистрирует неудачное выполнение запроса.
    pub fn record_failure(&self) {
        let failure_count = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        *self
            .last_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Instant::now());

        let mut state = self.write_state();
        match *state {
            CircuitState::Closed => {
                if failure_count >= self.failure_threshold {
                    *state = CircuitState::Open;
                    error!(
                        "Circuit breaker OPENED - {} failures reached threshold {}",
                        failure_count, self.failure_threshold
                    );
                }
            }
            CircuitState::HalfOpen => {
                *state = CircuitState::Open;
                warn!("Circuit breaker test failed - returning to Open state");
            }
            CircuitState::Open => {}
        }
    }

    /// Текущее состояние выключателя для мониторинга.
    pub fn state(&self) -> CircuitState {
        *self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::Relaxed)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, CircuitState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
