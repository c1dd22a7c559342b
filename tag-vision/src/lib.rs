#![allow(missing_docs)]

pub mod camera_registry;
pub mod config;
pub mod coprocessor;
pub mod detection;
pub mod pipeline;
pub mod publisher;
pub mod selector;
pub mod table;
pub mod utils;
pub mod worker;
pub const IS_DEBUG: bool = false;
