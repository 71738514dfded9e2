//! API clients for the three data sources.

pub mod news;
pub mod quotes;
pub mod weather;

pub use news::NewsClient;
pub use quotes::QuoteClient;
pub use weather::WeatherClient;
