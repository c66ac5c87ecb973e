//! Выбор мест и оформление заказа.
//!
//! [`CheckoutFlow`] проводит один сеанс через четыре шага:
//!
//! 1. **SelectSeats**: выбор мест на схеме зала.
//! 2. **SelectPayment**: выбор способа оплаты.
//! 3. **Confirm**: проверка билетов и суммы, отправка.
//! 4. **Success**: бронь создана, подтверждение оплаты выполнено.
//!
//! Сценарий общается только с [`CinemaApi`] (данные) и [`Navigator`]
//! (переходы). Глобального состояния нет: пользователь приходит через
//! [`SessionContext`].

pub mod lifetime;
pub mod pricing;
pub mod seat_map;
pub mod selection;
pub mod session;
mod submission;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::CheckoutConfig;
use crate::error::{ApiError, CheckoutError};
use crate::models::{
    BookingConfirmation, Money, Movie, PaymentMethod, Room, Seat, SeatId, Showtime, TicketLine,
};
use crate::services::cinema_api::{ApiResult, CinemaApi};

use lifetime::{Lifetime, TeardownHandle};
use pricing::PriceTable;
use seat_map::SeatMap;
use selection::{BookedSeats, SeatSelection, SeatState, ToggleOutcome};
use session::{Navigator, RedirectTimer, Route, SessionContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    SelectSeats,
    SelectPayment,
    Confirm,
    Success,
}

impl Step {
    pub fn index(self) -> u8 {
        match self {
            Step::SelectSeats => 0,
            Step::SelectPayment => 1,
            Step::Confirm => 2,
            Step::Success => 3,
        }
    }

    fn next(self) -> Self {
        match self {
            Step::SelectSeats => Step::SelectPayment,
            Step::SelectPayment => Step::Confirm,
            Step::Confirm | Step::Success => Step::Success,
        }
    }

    fn previous(self) -> Option<Self> {
        match self {
            Step::SelectPayment => Some(Step::SelectSeats),
            Step::Confirm => Some(Step::SelectPayment),
            Step::SelectSeats | Step::Success => None,
        }
    }
}

/// Оверлей ошибки поверх текущего шага.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowError {
    pub message: String,
    /// Фатальная ошибка блокирует движение и предлагает уйти назад.
    pub fatal: bool,
}

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub login_redirect_delay: Duration,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self::from(&CheckoutConfig::default())
    }
}

impl From<&CheckoutConfig> for CheckoutSettings {
    fn from(config: &CheckoutConfig) -> Self {
        Self {
            login_redirect_delay: config.login_redirect_delay(),
        }
    }
}

/// Источники мест, перебираются по порядку.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatSource {
    Showtime(i64),
    Room(i64),
}

pub struct CheckoutFlow {
    showtime_id: i64,
    session: SessionContext,
    api: Arc<dyn CinemaApi>,
    navigator: Arc<dyn Navigator>,
    settings: CheckoutSettings,

    step: Step,
    error: Option<FlowError>,
    loading: bool,

    showtime: Option<Showtime>,
    movie: Option<Movie>,
    room: Option<Room>,
    seats: Vec<Seat>,
    prices: PriceTable,
    selection: SeatSelection,
    payment_method: PaymentMethod,
    confirmation: Option<BookingConfirmation>,

    lifetime: Lifetime,
    redirect: Option<RedirectTimer>,
}

impl CheckoutFlow {
    pub fn new(
        showtime_id: i64,
        session: SessionContext,
        api: Arc<dyn CinemaApi>,
        navigator: Arc<dyn Navigator>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            showtime_id,
            session,
            api,
            navigator,
            settings,
            step: Step::SelectSeats,
            error: None,
            loading: false,
            showtime: None,
            movie: None,
            room: None,
            seats: Vec::new(),
            prices: PriceTable::new(),
            selection: SeatSelection::new(),
            payment_method: PaymentMethod::default(),
            confirmation: None,
            lifetime: Lifetime::new(),
            redirect: None,
        }
    }

    /// Создаёт сценарий и вызывает [`CheckoutFlow::mount`].
    pub async fn open(
        showtime_id: i64,
        session: SessionContext,
        api: Arc<dyn CinemaApi>,
        navigator: Arc<dyn Navigator>,
        settings: CheckoutSettings,
    ) -> Self {
        let mut flow = Self::new(showtime_id, session, api, navigator, settings);
        flow.mount().await;
        flow
    }

    /// Проверка сессии, затем первая загрузка данных.
    ///
    /// Без userId ничего не загружается: показывается ошибка и планируется
    /// переход на экран входа.
    pub async fn mount(&mut self) {
        if self.session.user_id().is_none() {
            self.fail(CheckoutError::NotAuthenticated);
            self.schedule_login_redirect();
            return;
        }
        // ошибки уже на оверлее
        let _ = self.load().await;
    }

    /// Загружает сеанс, фильм, зал, места и цены билетов.
    pub async fn load(&mut self) -> Result<(), CheckoutError> {
        self.loading = true;
        let result = self.fetch_all().await;
        self.loading = false;

        match result {
            Ok(()) => {
                info!(
                    "Checkout for showtime {} loaded: {} seats, {} booked",
                    self.showtime_id,
                    self.seats.len(),
                    self.showtime.as_ref().map_or(0, |s| s.booked_seats.len())
                );
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn fetch_all(&mut self) -> Result<(), CheckoutError> {
        let api = Arc::clone(&self.api);

        let showtime = self
            .call(api.get_showtime(self.showtime_id), CheckoutError::ShowtimeFetch)
            .await?;
        let sources = Self::seat_sources(&showtime);
        let (movie_id, room_id) = (showtime.movie_id, showtime.room_id);
        self.showtime = Some(showtime);

        self.movie = Some(self.call(api.get_movie(movie_id), CheckoutError::MovieFetch).await?);
        self.room = Some(self.call(api.get_room(room_id), CheckoutError::RoomFetch).await?);
        self.seats = self.fetch_seats(&sources).await?;

        match self.lifetime.guard(api.get_ticket_prices()).await {
            None => return Err(CheckoutError::Cancelled),
            Some(Ok(tickets)) => self.prices = PriceTable::from_tickets(&tickets),
            Some(Err(e)) => warn!("Ticket prices unavailable, using built-in prices: {}", e),
        }
        Ok(())
    }

    /// Перечитывает цены бэкенда. Сумма пересчитается при следующем чтении.
    pub async fn refresh_prices(&mut self) -> Result<(), CheckoutError> {
        let api = Arc::clone(&self.api);
        match self.lifetime.guard(api.get_ticket_prices()).await {
            None => Err(CheckoutError::Cancelled),
            Some(Ok(tickets)) => {
                self.prices = PriceTable::from_tickets(&tickets);
                Ok(())
            }
            Some(Err(e)) => {
                warn!("Ticket prices unavailable, keeping current prices: {}", e);
                Ok(())
            }
        }
    }

    pub fn seat_sources(showtime: &Showtime) -> Vec<SeatSource> {
        vec![SeatSource::Showtime(showtime.id), SeatSource::Room(showtime.room_id)]
    }

    /// Пробует источники по очереди, наружу уходит только последняя ошибка.
    async fn fetch_seats(&self, sources: &[SeatSource]) -> Result<Vec<Seat>, CheckoutError> {
        let api = Arc::clone(&self.api);
        let mut last_error: Option<ApiError> = None;

        for source in sources {
            let attempt = match *source {
                SeatSource::Showtime(id) => self.lifetime.guard(api.get_seats_for_showtime(id)).await,
                SeatSource::Room(id) => self.lifetime.guard(api.get_seats_by_room(id)).await,
            };
            match attempt {
                None => return Err(CheckoutError::Cancelled),
                Some(Ok(seats)) => {
                    debug!("Loaded {} seats from {:?}", seats.len(), source);
                    return Ok(seats);
                }
                Some(Err(e)) => {
                    warn!("Seat lookup via {:?} failed: {}", source, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.map_or(CheckoutError::NotReady, CheckoutError::SeatsFetch))
    }

    /// Ждёт удалённый вызов, если сценарий не завершат раньше.
    async fn call<T>(
        &self,
        fut: impl Future<Output = ApiResult<T>>,
        wrap: fn(ApiError) -> CheckoutError,
    ) -> Result<T, CheckoutError> {
        match self.lifetime.guard(fut).await {
            None => Err(CheckoutError::Cancelled),
            Some(result) => result.map_err(wrap),
        }
    }

    // --- Выбор мест ---

    pub fn toggle_seat(&mut self, seat_id: SeatId) -> ToggleOutcome {
        if self.step != Step::SelectSeats {
            debug!("Ignoring seat toggle at step {:?}", self.step);
            return ToggleOutcome::Ignored;
        }
        let Some(seat) = self.seats.iter().find(|s| s.id == seat_id) else {
            debug!("Ignoring toggle of unknown seat {}", seat_id);
            return ToggleOutcome::Ignored;
        };

        let booked = BookedSeats::from_showtime(self.showtime.as_ref());
        let outcome = self.selection.toggle(seat, &booked);
        match outcome {
            ToggleOutcome::Selected | ToggleOutcome::Deselected => {
                if self.error.as_ref().is_some_and(|e| !e.fatal) {
                    self.error = None;
                }
            }
            ToggleOutcome::Unavailable => debug!("Seat {} is not for sale", seat_id),
            ToggleOutcome::Ignored => {}
        }
        outcome
    }

    pub fn select_payment_method(&mut self, method: PaymentMethod) {
        if self.step == Step::Success {
            debug!("Ignoring payment method change after success");
            return;
        }
        self.payment_method = method;
    }

    // --- Переходы между шагами ---

    /// Шаг вперёд с проверкой условий текущего шага.
    pub async fn next(&mut self) -> Result<Step, CheckoutError> {
        match self.step {
            Step::SelectSeats => {
                if self.selection.is_empty() {
                    return Err(self.fail(CheckoutError::NoSeatsSelected));
                }
                Ok(self.advance())
            }
            Step::SelectPayment => Ok(self.advance()),
            Step::Confirm => self.submit().await,
            Step::Success => {
                debug!("Already at success, nothing to advance");
                Ok(Step::Success)
            }
        }
    }

    pub fn back(&mut self) -> Step {
        if let Some(previous) = self.step.previous() {
            debug!("Checkout step {:?} -> {:?}", self.step, previous);
            self.step = previous;
        }
        self.step
    }

    fn advance(&mut self) -> Step {
        let next = self.step.next();
        info!("Checkout for showtime {} step {:?} -> {:?}", self.showtime_id, self.step, next);
        self.step = next;
        self.error = None;
        next
    }

    // --- Навигация ---

    /// Уход назад при блокирующей ошибке.
    pub fn retreat(&self) {
        self.navigator.navigate(Route::Home);
    }

    pub fn go_home(&self) {
        self.navigator.navigate(Route::Home);
    }

    pub fn view_profile(&self) {
        self.navigator.navigate(Route::Profile);
    }

    fn schedule_login_redirect(&mut self) {
        if self.redirect.as_ref().is_some_and(|timer| !timer.is_finished()) {
            return;
        }
        info!(
            "No signed-in user, redirecting to login in {:?}",
            self.settings.login_redirect_delay
        );
        self.redirect = Some(RedirectTimer::schedule(
            Arc::clone(&self.navigator),
            Route::login_for_showtime(self.showtime_id),
            self.settings.login_redirect_delay,
        ));
    }

    // --- Завершение ---

    pub fn teardown_handle(&self) -> TeardownHandle {
        self.lifetime.handle()
    }

    /// Отменяет текущие вызовы и отложенный переход на вход.
    pub fn teardown(&mut self) {
        self.lifetime.end();
        if let Some(timer) = self.redirect.take() {
            timer.cancel();
        }
        debug!("Checkout for showtime {} torn down", self.showtime_id);
    }

    pub fn is_torn_down(&self) -> bool {
        self.lifetime.is_ended()
    }

    /// Показывает `err` на оверлее и возвращает её.
    fn fail(&mut self, err: CheckoutError) -> CheckoutError {
        if matches!(err, CheckoutError::Cancelled) {
            debug!("Checkout for showtime {} call cancelled", self.showtime_id);
            return err;
        }
        if err.is_fatal() {
            error!("Checkout for showtime {} failed: {:?}", self.showtime_id, err);
        } else {
            warn!("Checkout for showtime {}: {}", self.showtime_id, err);
        }
        self.error = Some(FlowError {
            message: err.to_string(),
            fatal: err.is_fatal(),
        });
        err
    }

    // --- Чтение состояния ---

    pub fn showtime_id(&self) -> i64 {
        self.showtime_id
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn error(&self) -> Option<&FlowError> {
        self.error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn showtime(&self) -> Option<&Showtime> {
        self.showtime.as_ref()
    }

    pub fn movie(&self) -> Option<&Movie> {
        self.movie.as_ref()
    }

    pub fn room(&self) -> Option<&Room> {
        self.room.as_ref()
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn seat_map(&self) -> SeatMap {
        SeatMap::build(&self.seats)
    }

    pub fn seat_status(&self, seat: &Seat) -> SeatState {
        let booked = BookedSeats::from_showtime(self.showtime.as_ref());
        selection::resolve_status(seat, &self.selection, &booked)
    }

    pub fn selected_seats(&self) -> Vec<&Seat> {
        self.selection.sorted()
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    /// Заменяет таблицу цен, сумма меняется без повторного выбора.
    pub fn set_prices(&mut self, prices: PriceTable) {
        self.prices = prices;
    }

    pub fn ticket_lines(&self) -> Vec<TicketLine> {
        pricing::ticket_lines(self.selection.sorted(), &self.prices)
    }

    pub fn total(&self) -> Money {
        pricing::total(self.selection.iter(), &self.prices)
    }

    pub fn total_display(&self) -> String {
        pricing::format_vnd(self.total())
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn confirmation(&self) -> Option<&BookingConfirmation> {
        self.confirmation.as_ref()
    }
}

impl Drop for CheckoutFlow {
    fn drop(&mut self) {
        self.lifetime.end();
    }
}
