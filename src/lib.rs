// src/lib.rs

//! Schedule crawler library

pub mod error;
pub mod models;
pub mod pipeline;
pub mod scanner;
pub mod services;
pub mod utils;
