use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Ключ, под которым фронтенд хранит id вошедшего пользователя.
pub const USER_ID_KEY: &str = "userId";

/// Чтение клиентского key/value хранилища.
pub trait SessionStorage {
    fn get_item(&self, key: &str) -> Option<String>;
}

impl SessionStorage for HashMap<String, String> {
    fn get_item(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Кто пользуется сценарием. Передаётся при создании, только для чтения.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    user_id: Option<String>,
    pub is_user_logged_in: bool,
    pub is_admin_logged_in: bool,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            is_user_logged_in: true,
            is_admin_logged_in: false,
        }
    }

    pub fn from_storage(storage: &impl SessionStorage) -> Self {
        let user_id = storage.get_item(USER_ID_KEY);
        Self {
            is_user_logged_in: user_id.is_some(),
            user_id,
            is_admin_logged_in: false,
        }
    }

    pub fn with_login_flags(mut self, user: bool, admin: bool) -> Self {
        self.is_user_logged_in = user;
        self.is_admin_logged_in = admin;
        self
    }

    /// Сохранённый userId. Проверяется только наличие, пустая строка считается отсутствием.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Route {
    Login {
        #[serde(rename = "returnTo")]
        return_to: String,
    },
    Home,
    Profile,
}

impl Route {
    /// Экран входа с возвратом на страницу брони.
    pub fn login_for_showtime(showtime_id: i64) -> Self {
        Route::Login {
            return_to: format!("/booking/{showtime_id}"),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login { return_to } => format!("/login?redirect={return_to}"),
            Route::Home => "/".to_string(),
            Route::Profile => "/profile".to_string(),
        }
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Навигатор, который запоминает переходы. HTTP слой отдаёт последний
/// маршрут клиенту, а переход делает уже клиент.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    history: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<Route> {
        self.lock().last().cloned()
    }

    pub fn history(&self) -> Vec<Route> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Route>> {
        self.history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        info!("Navigating to {}", route.path());
        self.lock().push(route);
    }
}

/// Отложенный переход сценария. Drop таймера его отменяет.
#[derive(Debug)]
pub struct RedirectTimer {
    handle: JoinHandle<()>,
}

impl RedirectTimer {
    pub fn schedule(navigator: Arc<dyn Navigator>, route: Route, delay: Duration) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.navigate(route);
        });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for RedirectTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
