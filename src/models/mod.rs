pub mod seat;
pub mod showtime;
pub mod movie;
pub mod room;
pub mod ticket;
pub mod booking;

pub use seat::{Seat, SeatId, SeatStatus, SeatType};
pub use showtime::{BookedSeatRef, Showtime};
pub use movie::Movie;
pub use room::Room;
pub use ticket::{Money, TicketPrice};
pub use booking::{
    Booking, BookingConfirmation, BookingDraft, CreateBookingResponse, PaymentCompletion,
    PaymentMethod, PaymentRef, TicketLine,
};
