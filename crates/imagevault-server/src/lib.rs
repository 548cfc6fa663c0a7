#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod extract;
pub mod handler;
pub mod middleware;
pub mod service;

/// Tracing target for request handlers.
pub const TRACING_TARGET_HANDLER: &str = "imagevault_server::handler";

/// Tracing target for request extractors.
pub const TRACING_TARGET_EXTRACT: &str = "imagevault_server::extract";
