// src/lib.rs

pub mod config;
pub mod error;
pub mod gateway;
pub mod oplog;
