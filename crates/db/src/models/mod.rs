//! Row types for the `users` and `widgets` tables.

pub mod user;
pub mod widget;
