pub mod audit;
pub mod config;
pub mod court_allocator;
pub mod error;
pub mod events;
pub mod handlers;
pub mod pairing_engine;
pub mod persistence;
pub mod repository;
pub mod scheduler;
pub mod state;
pub mod suggestions;
