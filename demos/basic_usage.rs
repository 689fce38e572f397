use rcp_common::{Registry, Response};
use rcp_macro::{rcp_client, rcp_routes};
use serde::{Deserialize, Serialize};

/// 用户数据结构
#[derive(Debug, Serialize, Deserialize)]
struct User {
    id: u32,
    name: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: u32,
    #[serde(rename = "userId")]
    user_id: u32,
    title: String,
}

/// 创建用户请求
#[derive(Serialize)]
struct CreateUserRequest {
    name: String,
    email: String,
}

/// API 客户端
#[rcp_client(
    base_address = "https://jsonplaceholder.typicode.com",
    header = "Accept: application/json",
    timeout = "10s"
)]
struct ApiClient;

#[rcp_routes]
impl ApiClient {
    /// 获取用户信息
    #[get("/users/1")]
    async fn user(&self) -> anyhow::Result<User> {}

    /// 按用户过滤文章，`userId` 拼接到查询串
    #[get("/posts")]
    async fn posts(&self, #[query("userId")] user_id: u32) -> anyhow::Result<Vec<Post>> {}

    /// 创建新用户
    #[post("/users")]
    #[header("X-Demo", "basic")]
    async fn create_user(&self, #[content] body: CreateUserRequest) -> anyhow::Result<User> {}

    /// 没有动词属性，按方法名推断为 `GET users`
    async fn get_users(&self) -> anyhow::Result<Vec<User>> {}

    /// 原始响应
    #[request(method = HEAD, path = "/users/1", timeout = "3s")]
    async fn probe(&self) -> rcp_common::Result<Response> {}

    #[no_request]
    async fn describe(&self) -> String {
        "jsonplaceholder demo client".to_string()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    env_logger::init();

    println!("=== rcp Basic Usage Example ===\n");

    let registry = Registry::default();
    let client = ApiClient::new(&registry);
    println!("{}\n", client.describe().await);

    println!("1. 获取单个用户");
    match client.user().await {
        Ok(user) => println!("   ✅ 获取用户: {} <{}>\n", user.name, user.email),
        Err(e) => println!("   ❌ 错误: {}\n", e),
    }

    println!("2. 查询参数绑定");
    match client.posts(1).await {
        Ok(posts) => {
            println!("   ✅ 用户 1 共有 {} 篇文章", posts.len());
            if let Some(post) = posts.first() {
                println!("   第一篇 #{} (user {}): {}\n", post.id, post.user_id, post.title);
            }
        }
        Err(e) => println!("   ❌ 错误: {}\n", e),
    }

    println!("3. 创建新用户");
    let new_user = CreateUserRequest {
        name: "张三".to_string(),
        email: "zhangsan@example.com".to_string(),
    };
    match client.create_user(new_user).await {
        Ok(user) => println!("   ✅ 创建的用户 #{}: {}\n", user.id, user.name),
        Err(e) => println!("   ❌ 错误: {}\n", e),
    }

    println!("4. 推断路由");
    match client.get_users().await {
        Ok(users) => println!("   ✅ 获取 {} 个用户\n", users.len()),
        Err(e) => println!("   ❌ 错误: {}\n", e),
    }

    println!("5. 原始响应");
    match client.probe().await {
        Ok(response) => println!("   ✅ HEAD 状态码: {}\n", response.status),
        Err(e) => println!("   ❌ 错误: {}\n", e),
    }

    // 同一注册表上再次构造不会重复声明
    let again = ApiClient::new(&registry);
    println!("共享会话存在: {}", registry.shared_session::<ApiClient>().is_some());
    println!("关闭会话: {}", rcp_common::Client::close(&again));

    println!("🎉 所有示例运行完成！");

    Ok(())
}
