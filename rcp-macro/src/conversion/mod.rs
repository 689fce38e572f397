pub mod types;

pub use types::{generate_arg_conversion, generate_type_conversion};
