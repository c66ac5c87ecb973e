use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;

use crate::checkout::session::{SessionContext, SessionStorage, USER_ID_KEY};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_LOGGED_IN_HEADER: &str = "x-user-logged-in";
pub const ADMIN_LOGGED_IN_HEADER: &str = "x-admin-logged-in";

/// Клиентское хранилище, которое фронтенд пересылает заголовками запроса.
struct HeaderStorage<'a>(&'a HeaderMap);

impl SessionStorage for HeaderStorage<'_> {
    fn get_item(&self, key: &str) -> Option<String> {
        // Храним в заголовках только userId
        if key != USER_ID_KEY {
            return None;
        }
        self.0
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_string())
    }
}

fn flag(headers: &HeaderMap, name: &str) -> Option<bool> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().eq_ignore_ascii_case("true"))
}

/// Сессия браузера. Экстрактор никогда не отказывает: отсутствие userId
/// обрабатывает сам сценарий оформления.
#[derive(Debug, Clone)]
pub struct ClientSession(pub SessionContext);

impl<S> FromRequestParts<S> for ClientSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = SessionContext::from_storage(&HeaderStorage(&parts.headers));

        // Флаги логина из общего стора фронтенда, если переданы
        let user_logged_in = flag(&parts.headers, USER_LOGGED_IN_HEADER)
            .unwrap_or(session.is_user_logged_in);
        let admin_logged_in = flag(&parts.headers, ADMIN_LOGGED_IN_HEADER).unwrap_or(false);

        Ok(ClientSession(session.with_login_flags(user_logged_in, admin_logged_in)))
    }
}
