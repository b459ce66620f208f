pub mod models;
pub mod weather;

pub use models::UserProfile;
pub use weather::{display_location, WeatherError, WeatherService};
