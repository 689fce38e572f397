use std::time::Duration;

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::LitStr;

/// 重试退避策略
///
/// `max_retries` 是首次请求之后的重试次数，总尝试次数为 `max_retries + 1`；
/// 其余字段决定两次尝试之间的等待时间。
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// 最大重试次数
    pub max_retries: u32,
    /// 基础延迟时间（毫秒）
    pub base_delay_ms: u64,
    /// 最大延迟时间（毫秒）
    pub max_delay_ms: u64,
    /// 指数底数
    pub exponential_base: f64,
    /// 随机抖动比例 (0.0-1.0)
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 30000, // 30秒
            exponential_base: 2.0,
            jitter_ratio: 0.1,
        }
    }
}

impl RetryPolicy {
    /// 创建指数重试策略
    pub fn exponential(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            ..Default::default()
        }
    }

    /// 创建固定延迟重试策略
    pub fn fixed(max_retries: u32, delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
            exponential_base: 1.0,
            jitter_ratio: 0.0,
        }
    }

    /// 计算第 `attempt` 次重试前的等待时间，`attempt == 0` 不等待
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::from_millis(0);
        }

        // 指数退避: base_delay * exponential_base^(attempt-1)
        let exponential_delay =
            self.base_delay_ms as f64 * self.exponential_base.powi((attempt - 1) as i32);

        let capped_delay = exponential_delay.min(self.max_delay_ms as f64);

        let jitter = if self.jitter_ratio > 0.0 {
            fastrand::f64() * capped_delay * self.jitter_ratio
        } else {
            0.0
        };

        Duration::from_millis((capped_delay + jitter) as u64)
    }

    /// 从字符串解析退避策略
    ///
    /// 支持格式:
    /// - "exponential(max_retries=3, base_delay=100ms)"
    /// - "fixed(max_retries=5, delay=200ms)"
    /// - "exponential(3, 100ms)" // 简化格式
    pub fn parse(config: &str) -> Result<Self, String> {
        let config = config.trim();

        if let Some(params) = config
            .strip_prefix("exponential(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            Self::parse_params(params, RetryPolicy::default())
        } else if let Some(params) = config
            .strip_prefix("fixed(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            Self::parse_params(params, RetryPolicy::fixed(3, 100))
        } else {
            Err(format!("Unsupported retry config format: {}", config))
        }
    }

    fn parse_params(params: &str, mut policy: RetryPolicy) -> Result<Self, String> {
        let fixed = policy.exponential_base == 1.0;
        let mut position = 0;
        let mut named_seen = false;

        for part in params.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            let Some((key, value)) = part.split_once('=') else {
                // 简化格式：exponential(3, 100ms)，位置参数必须在命名参数之前
                if named_seen {
                    return Err(format!("Positional parameter after named ones: {}", part));
                }
                match position {
                    0 => {
                        policy.max_retries = part
                            .parse()
                            .map_err(|_| format!("Invalid max_retries: {}", part))?;
                    }
                    1 => policy.apply_delay(parse_duration(part)?, fixed),
                    _ => return Err(format!("Too many positional parameters: {}", part)),
                }
                position += 1;
                continue;
            };

            named_seen = true;
            let value = value.trim();
            match key.trim() {
                // `max_attempts` 是旧写法，含义相同
                "max_retries" | "max_attempts" => {
                    policy.max_retries = value
                        .parse()
                        .map_err(|_| format!("Invalid max_retries: {}", value))?;
                }
                "base_delay" | "delay" => policy.apply_delay(parse_duration(value)?, fixed),
                "max_delay" if !fixed => policy.max_delay_ms = parse_duration(value)?,
                "exponential_base" if !fixed => {
                    policy.exponential_base = value
                        .parse()
                        .map_err(|_| format!("Invalid exponential_base: {}", value))?;
                }
                "jitter_ratio" => {
                    policy.jitter_ratio = value
                        .parse()
                        .map_err(|_| format!("Invalid jitter_ratio: {}", value))?;
                }
                other => return Err(format!("Unknown parameter: {}", other)),
            }
        }

        Ok(policy)
    }

    fn apply_delay(&mut self, delay_ms: u64, fixed: bool) {
        self.base_delay_ms = delay_ms;
        if fixed {
            self.max_delay_ms = delay_ms;
        }
    }
}

impl ToTokens for RetryPolicy {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let RetryPolicy {
            max_retries,
            base_delay_ms,
            max_delay_ms,
            exponential_base,
            jitter_ratio,
        } = self;
        tokens.extend(quote! {
            ::rcp_common::RetryPolicy {
                max_retries: #max_retries,
                base_delay_ms: #base_delay_ms,
                max_delay_ms: #max_delay_ms,
                exponential_base: #exponential_base,
                jitter_ratio: #jitter_ratio,
            }
        });
    }
}

/// 解析 `100ms`、`2s` 或不带单位的毫秒数
pub fn parse_duration(duration_str: &str) -> Result<u64, String> {
    let duration_str = duration_str.trim();

    if let Some(millis) = duration_str.strip_suffix("ms") {
        millis
            .trim()
            .parse()
            .map_err(|_| format!("Invalid milliseconds: {}", duration_str))
    } else if let Some(seconds) = duration_str.strip_suffix('s') {
        let seconds: u64 = seconds
            .trim()
            .parse()
            .map_err(|_| format!("Invalid seconds: {}", duration_str))?;
        Ok(seconds * 1000)
    } else {
        // 默认按毫秒处理
        duration_str
            .parse()
            .map_err(|_| format!("Invalid duration (expected ms or s suffix): {}", duration_str))
    }
}

/// 属性中的重试配置解析结果
#[derive(Clone)]
pub struct RetryConfig {
    pub policy: RetryPolicy,
    pub raw_config: LitStr,
}

impl std::fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryConfig")
            .field("policy", &self.policy)
            .field("raw_config", &self.raw_config.value())
            .finish()
    }
}

impl RetryConfig {
    pub fn parse(config_str: &LitStr) -> syn::Result<Self> {
        let policy = RetryPolicy::parse(&config_str.value())
            .map_err(|msg| syn::Error::new(config_str.span(), msg))?;

        Ok(RetryConfig {
            policy,
            raw_config: config_str.clone(),
        })
    }
}

#[cfg(test)]
mod basic_tests {
    use super::*;
    use syn::{LitStr, parse_quote};

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay_ms, 100);
        assert_eq!(policy.exponential_base, 2.0);
    }

    #[test]
    fn test_calculate_delay() {
        let policy = RetryPolicy::exponential(3, 100);

        assert_eq!(policy.calculate_delay(0), Duration::from_millis(0));
        assert!(policy.calculate_delay(1).as_millis() >= 100);
        assert!(policy.calculate_delay(2).as_millis() >= 200);
        assert!(policy.calculate_delay(3).as_millis() >= 400);
    }

    #[test]
    fn test_parse_exponential_simple() {
        let config: LitStr = parse_quote! { "exponential(3, 100ms)" };
        let result = RetryConfig::parse(&config).unwrap();

        assert_eq!(result.policy.max_retries, 3);
        assert_eq!(result.policy.base_delay_ms, 100);
        assert_eq!(result.policy.exponential_base, 2.0);
    }

    #[test]
    fn test_parse_fixed() {
        let config: LitStr = parse_quote! { "fixed(max_retries=3, delay=500ms)" };
        let result = RetryConfig::parse(&config).unwrap();

        assert_eq!(result.policy.max_retries, 3);
        assert_eq!(result.policy.base_delay_ms, 500);
        assert_eq!(result.policy.max_delay_ms, 500);
        assert_eq!(result.policy.exponential_base, 1.0);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("100ms").unwrap(), 100);
        assert_eq!(parse_duration("2s").unwrap(), 2000);
        assert_eq!(parse_duration("500").unwrap(), 500);
        assert!(parse_duration("fast").is_err());
    }
}

#[path = "retry_test.rs"]
mod comprehensive_retry_tests;
