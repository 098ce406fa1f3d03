//! 解析API

pub mod client;
