mod weather;

pub use weather::WeatherClient;
