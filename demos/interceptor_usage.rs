use log::info;
use rcp_common::{
    Interceptor, Next, Registry, RequestContext, Response, async_trait,
};
use rcp_macro::{rcp_client, rcp_routes};
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 用户数据结构
#[derive(Debug, Deserialize)]
struct User {
    id: u32,
    name: String,
}

/// 认证拦截器 - 自动添加认证头部
#[derive(Default)]
struct AuthInterceptor;

#[async_trait]
impl Interceptor for AuthInterceptor {
    async fn intercept(&self, context: &mut RequestContext<'_>, next: Next<'_>) -> rcp_common::Result<Response> {
        println!("🔐 AuthInterceptor: 添加认证头部");
        context
            .request
            .headers
            .insert("Authorization".to_string(), "Bearer demo-token-12345".into());
        next.run(context).await
    }
}

/// 日志拦截器 - 记录请求和响应信息
#[derive(Default)]
struct LoggingInterceptor {
    calls: AtomicUsize,
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn intercept(&self, context: &mut RequestContext<'_>, next: Next<'_>) -> rcp_common::Result<Response> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        println!(
            "📝 LoggingInterceptor #{}: {} {}",
            call,
            context.request.method.as_str(),
            context.request.url
        );
        let response = next.run(context).await?;
        println!("📝 LoggingInterceptor #{}: 响应状态 {}", call, response.status);
        Ok(response)
    }
}

/// 会话级拦截器按声明顺序执行，`#[interceptor(0)]` 插到最前面
#[rcp_client(
    base_address = "https://jsonplaceholder.typicode.com",
    interceptor = LoggingInterceptor,
    interceptor = AuthInterceptor
)]
struct ApiClient;

#[rcp_routes]
impl ApiClient {
    #[get("/users/1")]
    async fn user(&self) -> anyhow::Result<User> {}

    #[get("/users")]
    #[retry(1)]
    async fn users(&self, #[header("X-Trace-Id")] trace_id: &str) -> anyhow::Result<Vec<User>> {}

    /// 方法拦截器可以访问客户端自身
    #[interceptor(0)]
    async fn stamp(&self, context: &mut RequestContext<'_>, next: Next<'_>) -> rcp_common::Result<Response> {
        info!("stamping request {:?}", context.request.id());
        context
            .request
            .headers
            .insert("X-Client".to_string(), self.name().into());
        next.run(context).await
    }

    fn name(&self) -> &'static str {
        "rcp-interceptor-demo"
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("=== rcp Interceptor Usage Example ===\n");

    let registry = Registry::default();
    let client = ApiClient::new(&registry);

    let interceptors = registry.session_config::<ApiClient>().interceptors.len();
    println!("会话拦截器数量: {}\n", interceptors);

    match client.user().await {
        Ok(user) => println!("✅ 获取用户 #{}: {}\n", user.id, user.name),
        Err(e) => println!("❌ 错误: {}\n", e),
    }

    match client.users("trace-42").await {
        Ok(users) => println!("✅ 获取 {} 个用户\n", users.len()),
        Err(e) => println!("❌ 错误: {}\n", e),
    }

    registry.close_all();
    Ok(())
}
