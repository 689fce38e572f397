//! 声明宏属性参数的解析

pub mod client;
pub mod handler;

pub use client::parse_client_args;
pub use handler::{PARAM_ATTRIBUTES, ROUTE_ATTRIBUTES, is_param_attribute, is_route_attribute};
