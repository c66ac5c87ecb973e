pub mod config;
pub mod error;
pub mod models;
pub mod checkout;
pub mod controllers;
pub mod middleware;
pub mod services;

use std::sync::Arc;

use services::cinema_api::{CinemaApi, HttpCinemaApi};
use services::cleanup::CleanupService;
use services::registry::CheckoutRegistry;

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub api: Arc<dyn CinemaApi>,
    pub checkouts: CheckoutRegistry,
}

impl AppState {
    pub fn new(config: config::Config) -> Result<Arc<Self>, error::ApiError> {
        let api = HttpCinemaApi::from_config(&config.cinema_api, &config.circuit_breaker)?;
        Ok(Self::with_api(config, Arc::new(api)))
    }

    /// Состояние поверх любого `CinemaApi`, в тестах это фейк в памяти.
    /// Запускает фоновую очистку сессий, поэтому вызывается внутри рантайма tokio.
    pub fn with_api(config: config::Config, api: Arc<dyn CinemaApi>) -> Arc<Self> {
        let checkouts =
            CheckoutRegistry::new(config.checkout.session_limit, config.checkout.idle_ttl());

        // Очистка брошенных сессий в фоне
        CleanupService::new(checkouts.clone(), config.checkout.sweep_interval()).spawn();

        Arc::new(Self {
            config,
            api,
            checkouts,
        })
    }
}
