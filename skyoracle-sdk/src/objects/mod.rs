pub mod flight;

pub use flight::{FlightId, FlightKey, FlightRecord, FlightStatus, InvalidFlightStatus};
