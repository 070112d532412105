#![forbid(unsafe_code)]

pub mod analysis;
pub mod app;
pub mod classify;
pub mod cli;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod error;
pub mod formats;
pub mod gemini;
pub mod logging;
pub mod noop;
pub mod pipeline;
pub mod provider;
pub mod samples;
pub mod video_job;
