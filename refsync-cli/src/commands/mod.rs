pub mod codelists;
pub mod images;
pub mod pull;
pub mod version;
