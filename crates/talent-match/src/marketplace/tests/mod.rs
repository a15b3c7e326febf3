mod common;
mod listings;
mod uploads;
