#![allow(clippy::len_without_is_empty, clippy::new_without_default)]

pub mod api;
pub mod app;
pub mod common;
pub mod config;

pub use common::error::{Error, ErrorKind, Result};
pub use config::node::{Node, NodeType};
