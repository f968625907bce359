pub mod calendar;
pub mod popup;
