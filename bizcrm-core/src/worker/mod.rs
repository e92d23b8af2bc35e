//! Background jobs that run next to the HTTP server.

pub mod sweeper;

pub use sweeper::OverdueSweeper;
