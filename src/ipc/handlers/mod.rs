pub mod backup;
pub mod calendar;
pub mod core;
pub mod curriculum;
pub mod names;
pub mod reports;
pub mod setup;
pub mod workdays;
