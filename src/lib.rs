// src/lib.rs

//! gh-harvest library: interactive review and capture of code-search matches.

pub mod error;
pub mod hooks;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
