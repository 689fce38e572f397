pub mod request;
pub mod session;
pub mod store;

pub use request::RequestConfig;
pub use session::SessionConfig;
pub use store::{ConfigStore, Fragment, Site, TypeKey};
