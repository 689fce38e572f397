pub mod cache;
pub mod traits;

pub use cache::InterceptorCache;
pub use traits::{
    CapturedMethod, Interceptor, MethodInterceptor, Next, NoOpInterceptor, RequestContext,
};
