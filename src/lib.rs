#![doc = "release-mirror: mirror the latest GitHub release's assets into an object-storage bucket and announce them."]

//! The pipeline lives in [`synchronise`]; [`staging`] moves one asset through a local
//! file; [`download`], [`upload`] and [`notify`] are the GitHub, Tencent COS and
//! Discord adapters behind the traits in [`contract`].

pub mod cli;
pub mod config;
pub mod contract;
pub mod download;
pub mod error;
pub mod http;
pub mod load_config;
pub mod notify;
pub mod staging;
pub mod synchronise;
pub mod upload;

pub use cli::{run, Cli};
