pub mod backend;
pub mod bot;
pub mod cli;
pub mod config;
pub mod models;
pub mod state;
pub mod storage;
pub mod stream;
pub mod telegram;
