pub mod booking;
pub mod promotion;
pub mod seat;
pub mod showroom;
pub mod showtime;
pub mod ticket;

pub use booking::{Booking, BookingStatus, BookingView, NewBooking, NewTicket};
pub use promotion::{NewPromotion, Promotion};
pub use seat::SeatLabel;
pub use showroom::Showroom;
pub use showtime::{NewShowtime, Showtime, ShowtimeView};
pub use ticket::{Ticket, TicketSelection, TicketType};
