pub mod reservation;
pub mod history;

pub use reservation::{Reservation, ReservationEngine};
pub use history::{OrderDetail, OrderHistory};
