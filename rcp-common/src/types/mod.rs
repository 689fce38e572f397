pub mod args;
pub mod header;
pub mod http;
pub mod options;
pub mod param;
pub mod range;
pub mod response;
pub mod retry;

pub use args::{ClientArgs, ParamAttr, RetryArg, RouteAttr};
pub use header::{
    Cookies, HeaderValue, Headers, concat_to_array_or_string, cookie_header, parse_cookie_string,
};
pub use http::{HttpMethod, infer_route};
pub use options::{ConnectionOptions, ProxyConfig, ProxyType, TransportOptions};
pub use param::{Arg, ParamBinding, ParamRole, RequestContent};
pub use range::{RangeSpec, TransferRange, parse_transfer_range};
pub use response::{
    CallOutput, Destination, DestinationKind, DestinationTarget, ResponseMap, ResponseSet, to_json,
    to_map, to_text,
};
pub use retry::{RetryConfig, RetryPolicy};
