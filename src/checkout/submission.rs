//! Отправка на шаге подтверждения.
//!
//! Вызовы идут строго по очереди, ничего не откатывается: создание брони
//! (ошибка фатальна), подтверждение оплаты и обновление мест (ошибки только
//! в лог). Успех наступает, как только бронь создана.

use std::sync::Arc;
use tracing::{info, warn};

use super::{pricing, CheckoutFlow, Step};
use crate::error::CheckoutError;
use crate::models::{BookingConfirmation, BookingDraft};
use crate::services::cinema_api::CinemaApi;

impl CheckoutFlow {
    /// Снимок текущего выбора в виде запроса на бронь.
    pub fn build_draft(&self, user_id: &str) -> Result<BookingDraft, CheckoutError> {
        let showtime = self.showtime.as_ref().ok_or(CheckoutError::NotReady)?;
        if self.selection.is_empty() {
            return Err(CheckoutError::NoSeatsSelected);
        }

        let seats = self.selection.sorted();
        let tickets = pricing::ticket_lines(seats.iter().copied(), &self.prices);
        let total_amount = tickets.iter().map(|line| line.subtotal()).sum();

        Ok(BookingDraft {
            showtime_id: showtime.id,
            movie_id: self.movie.as_ref().map_or(showtime.movie_id, |m| m.id),
            seat_ids: seats.iter().map(|s| s.id).collect(),
            tickets,
            total_amount,
            payment_method: self.payment_method,
            user_id: user_id.to_string(),
        })
    }

    pub(super) async fn submit(&mut self) -> Result<Step, CheckoutError> {
        let Some(user_id) = self.session.user_id().map(str::to_owned) else {
            self.schedule_login_redirect();
            return Err(self.fail(CheckoutError::NotAuthenticated));
        };
        let draft = match self.build_draft(&user_id) {
            Ok(draft) => draft,
            Err(e) => return Err(self.fail(e)),
        };

        info!(
            "Submitting booking for showtime {}: seats={:?}, total={}, method={}",
            draft.showtime_id, draft.seat_ids, draft.total_amount, draft.payment_method
        );

        self.loading = true;
        let result = self.run_submission(draft).await;
        self.loading = false;

        match result {
            Ok(confirmation) => {
                info!(
                    "Booking {} created for showtime {} (payment completed: {})",
                    confirmation.booking.id, self.showtime_id, confirmation.payment_completed
                );
                self.confirmation = Some(confirmation);
                self.step = Step::Success;
                self.error = None;
                Ok(Step::Success)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn run_submission(
        &mut self,
        draft: BookingDraft,
    ) -> Result<BookingConfirmation, CheckoutError> {
        let api: Arc<dyn CinemaApi> = Arc::clone(&self.api);

        let created = self
            .call(api.create_booking(&draft), CheckoutError::BookingFailed)
            .await?;

        let mut payment_completed = false;
        if let Some(payment) = &created.payment {
            match self
                .call(api.complete_payment(&payment.id), CheckoutError::PaymentConfirmationFailed)
                .await
            {
                Ok(completion) if completion.success => {
                    payment_completed = true;
                    if let Some(showtime) = completion.showtime {
                        self.showtime = Some(showtime);
                    }
                }
                Ok(_) => warn!("Payment {} was not confirmed by the backend", payment.id),
                Err(CheckoutError::Cancelled) => return Err(CheckoutError::Cancelled),
                Err(e) => warn!("Payment {} confirmation failed: {:?}", payment.id, e),
            }
        }

        if let Some(showtime) = self.showtime.as_ref() {
            let sources = Self::seat_sources(showtime);
            match self.fetch_seats(&sources).await {
                Ok(seats) => self.seats = seats,
                Err(CheckoutError::Cancelled) => return Err(CheckoutError::Cancelled),
                Err(e) => warn!("Seat refresh after booking failed: {:?}", e),
            }
        }

        Ok(BookingConfirmation {
            booking: created.booking,
            payment: created.payment,
            payment_completed,
            draft,
        })
    }
}
