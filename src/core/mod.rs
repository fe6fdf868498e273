pub mod bridge;
pub mod config;
pub mod controller;
pub mod parser;
pub mod reactor;
pub mod router;
pub mod signal;
pub mod state;
