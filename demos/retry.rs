use log::{error, info, warn};
use rcp_common::{
    CancelToken, Client, Destination, DestinationKind, RcpError, Registry, Response, cancel,
};
use rcp_macro::{rcp_client, rcp_routes};
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Deserialize)]
struct User {
    id: u32,
    name: String,
}

/// 重试客户端 - 展示各种重试策略
#[rcp_client(
    base_address = "https://jsonplaceholder.typicode.com",
    connect_timeout = "3s",
    destination = resolve_destination
)]
struct RetryClient;

#[rcp_routes]
impl RetryClient {
    /// 不重试
    #[get("/users/1")]
    async fn user_no_retry(&self) -> anyhow::Result<User> {}

    /// 失败后立即再试两次
    #[get("/users/1")]
    #[retry(2)]
    async fn user_with_retry(&self) -> anyhow::Result<User> {}

    /// 指数退避：3 次重试，基础延迟 100ms
    #[get("/users/0")]
    #[retry("exponential(3, 100ms)")]
    async fn missing_user(&self) -> anyhow::Result<User> {}

    /// 完整配置的退避策略，请求结束后关闭私有会话
    #[get("/users")]
    #[retry("exponential(max_retries=5, base_delay=200ms, max_delay=10s, jitter_ratio=0.2)")]
    #[auto_close(true)]
    #[map(rcp_common::to_json)]
    async fn users_json(&self) -> anyhow::Result<serde_json::Value> {}

    /// 可取消的请求
    #[get("/photos")]
    #[retry("fixed(2, 50ms)")]
    async fn photos(&self, #[cancel_token] token: &CancelToken) -> rcp_common::Result<Vec<u8>> {}

    /// 分段下载，数据块交给回调
    #[get("/posts")]
    #[destination(incoming_data_callback, "progress")]
    async fn download(&self, #[transfer_range] range: &str) -> rcp_common::Result<Response> {}

    fn resolve_destination(&self, kind: DestinationKind, name: &str) -> Option<Destination> {
        match (kind, name) {
            (DestinationKind::IncomingDataCallback, "progress") => {
                let received = Arc::new(AtomicUsize::new(0));
                Some(Destination::callback(move |chunk| {
                    let total = received.fetch_add(chunk.len(), Ordering::SeqCst) + chunk.len();
                    info!("received {} bytes (total {})", chunk.len(), total);
                }))
            }
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    println!("=== rcp Retry Example ===\n");

    let registry = Registry::default();
    let client = RetryClient::new(&registry);

    println!("1. 无重试");
    let start = Instant::now();
    match client.user_no_retry().await {
        Ok(user) => println!("   ✅ 用户 #{}: {} ({:?})\n", user.id, user.name, start.elapsed()),
        Err(e) => println!("   ❌ 错误: {}\n", e),
    }

    println!("2. 固定次数重试");
    match client.user_with_retry().await {
        Ok(user) => println!("   ✅ 用户: {}\n", user.name),
        Err(e) => println!("   ❌ 错误: {}\n", e),
    }

    println!("3. 指数退避，服务端返回 404，所有尝试都会失败");
    let start = Instant::now();
    match client.missing_user().await {
        Ok(user) => println!("   ⚠️ 意外成功: {}\n", user.name),
        Err(e) => match e.downcast_ref::<RcpError>() {
            Some(RcpError::Transport(failure)) => {
                warn!("transport failure code {}", failure.code);
                println!("   ✅ 重试耗尽，最后的错误码 {} ({:?})\n", failure.code, start.elapsed());
            }
            _ => println!("   ❌ 其他错误: {}\n", e),
        },
    }

    println!("4. 响应映射 + auto_close");
    match client.users_json().await {
        Ok(value) => println!(
            "   ✅ 返回 {} 个用户\n",
            value.as_array().map(Vec::len).unwrap_or_default()
        ),
        Err(e) => println!("   ❌ 错误: {}\n", e),
    }

    println!("5. 取消进行中的请求");
    let token = CancelToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        println!("   取消请求: {}", cancel(&canceller));
    });
    match client.photos(&token).await {
        Ok(body) => println!("   ⚠️ 请求在取消前完成，{} 字节\n", body.len()),
        Err(RcpError::Transport(failure)) => println!("   ✅ 已中止，错误码 {}\n", failure.code),
        Err(RcpError::Cancelled { request }) => println!("   ✅ 已取消 {:?}\n", request),
        Err(e) => {
            error!("unexpected failure: {}", e);
            println!("   ❌ 错误: {}\n", e);
        }
    }

    println!("6. 分段下载");
    match client.download("0-1023").await {
        Ok(response) => println!("   ✅ 状态码 {}\n", response.status),
        Err(e) => println!("   ❌ 错误: {}\n", e),
    }

    println!("关闭会话: {}", client.close());
    Ok(())
}
