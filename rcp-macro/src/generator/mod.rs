pub mod client;
pub mod method;
pub mod routes;

pub use client::generate_client_impl;
pub use routes::generate_routes_impl;
