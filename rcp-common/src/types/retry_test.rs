#[cfg(test)]
mod comprehensive_tests {
    use crate::{RetryConfig, RetryPolicy};
    use crate::types::retry::parse_duration;
    use std::time::Duration;
    use syn::{LitStr, parse_quote};

    /// 退避时间计算
    mod retry_policy_tests {
        use super::*;

        #[test]
        fn test_exponential_backoff_calculation() {
            let policy = RetryPolicy {
                max_retries: 5,
                base_delay_ms: 100,
                max_delay_ms: 10000,
                exponential_base: 2.0,
                jitter_ratio: 0.0, // 无抖动便于测试
            };

            assert_eq!(policy.calculate_delay(0), Duration::from_millis(0));
            assert_eq!(policy.calculate_delay(1), Duration::from_millis(100)); // 100 * 2^0
            assert_eq!(policy.calculate_delay(2), Duration::from_millis(200)); // 100 * 2^1
            assert_eq!(policy.calculate_delay(3), Duration::from_millis(400)); // 100 * 2^2
            assert_eq!(policy.calculate_delay(4), Duration::from_millis(800)); // 100 * 2^3
        }

        #[test]
        fn test_max_delay_cap() {
            let policy = RetryPolicy {
                max_retries: 10,
                base_delay_ms: 1000,
                max_delay_ms: 5000,
                exponential_base: 2.0,
                jitter_ratio: 0.0,
            };

            // 1000 * 2^5 = 32000ms，被限制在 5000ms
            assert_eq!(policy.calculate_delay(6), Duration::from_millis(5000));
        }

        #[test]
        fn test_jitter_stays_in_range() {
            let policy = RetryPolicy {
                max_retries: 3,
                base_delay_ms: 1000,
                max_delay_ms: 10000,
                exponential_base: 2.0,
                jitter_ratio: 0.5,
            };

            for _ in 0..20 {
                let delay_ms = policy.calculate_delay(2).as_millis() as f64;
                // 基础延迟 2000ms，抖动范围 [2000, 3000]
                assert!(delay_ms >= 2000.0);
                assert!(delay_ms <= 3000.0);
            }
        }

        #[test]
        fn test_fixed_delay_policy() {
            let policy = RetryPolicy::fixed(4, 500);

            assert_eq!(policy.calculate_delay(1), Duration::from_millis(500));
            assert_eq!(policy.calculate_delay(2), Duration::from_millis(500));
            assert_eq!(policy.calculate_delay(3), Duration::from_millis(500));
        }

        #[test]
        fn test_fractional_exponential_base() {
            let policy = RetryPolicy {
                max_retries: 4,
                base_delay_ms: 1000,
                max_delay_ms: 10000,
                exponential_base: 1.5,
                jitter_ratio: 0.0,
            };

            assert_eq!(policy.calculate_delay(1).as_millis(), 1000);
            assert_eq!(policy.calculate_delay(2).as_millis(), 1500);
            assert_eq!(policy.calculate_delay(3).as_millis(), 2250);
        }
    }

    /// 配置字符串解析
    mod retry_config_parsing_tests {
        use super::*;

        #[test]
        fn test_parse_detailed_exponential() {
            let config: LitStr = parse_quote! {
                "exponential(max_retries=7, base_delay=250ms, max_delay=30s, exponential_base=1.5, jitter_ratio=0.3)"
            };
            let result = RetryConfig::parse(&config).unwrap();

            assert_eq!(result.policy.max_retries, 7);
            assert_eq!(result.policy.base_delay_ms, 250);
            assert_eq!(result.policy.max_delay_ms, 30000);
            assert_eq!(result.policy.exponential_base, 1.5);
            assert_eq!(result.policy.jitter_ratio, 0.3);
        }

        #[test]
        fn test_parse_fixed_delay_in_seconds() {
            let config: LitStr = parse_quote! { "fixed(max_attempts=5, delay=2s)" };
            let result = RetryConfig::parse(&config).unwrap();

            assert_eq!(result.policy.max_retries, 5);
            assert_eq!(result.policy.base_delay_ms, 2000);
            assert_eq!(result.policy.max_delay_ms, 2000);
            assert_eq!(result.policy.exponential_base, 1.0);
        }

        #[test]
        fn test_parse_mixed_parameter_formats() {
            let config: LitStr =
                parse_quote! { "exponential(5, 200ms, max_delay=30s, jitter_ratio=0.15)" };
            let result = RetryConfig::parse(&config).unwrap();

            assert_eq!(result.policy.max_retries, 5);
            assert_eq!(result.policy.base_delay_ms, 200);
            assert_eq!(result.policy.max_delay_ms, 30000);
            assert_eq!(result.policy.jitter_ratio, 0.15);
        }

        #[test]
        fn test_whitespace_handling() {
            for config_str in [
                "exponential(3, 100ms)",
                "exponential( 3 , 100ms )",
                " exponential(3 ,100ms ) ",
            ] {
                let config = LitStr::new(config_str, proc_macro2::Span::call_site());
                let result = RetryConfig::parse(&config);
                assert!(result.is_ok(), "Failed to parse: {}", config_str);
                assert_eq!(result.unwrap().policy.max_retries, 3);
            }
        }

        #[test]
        fn test_parse_invalid_configs() {
            for config_str in [
                "invalid_format",
                "exponential(invalid_number)",
                "exponential(max_retries=abc)",
                "exponential(max_retries=3, 100ms)",
                "exponential(1, 2ms, 3)",
                "fixed(max_delay=1s)",
                "exponential(unknown=1)",
            ] {
                let config = LitStr::new(config_str, proc_macro2::Span::call_site());
                assert!(RetryConfig::parse(&config).is_err(), "Should reject: {}", config_str);
            }
        }

        #[test]
        fn test_duration_parsing_variants() {
            assert_eq!(parse_duration("0ms").unwrap(), 0);
            assert_eq!(parse_duration("999ms").unwrap(), 999);
            assert_eq!(parse_duration("60s").unwrap(), 60000);
            assert!(parse_duration("100x").is_err());
            assert!(parse_duration("ms").is_err());
        }
    }

    /// 生成代码
    mod token_tests {
        use super::*;
        use quote::ToTokens;

        #[test]
        fn test_policy_to_tokens_names_every_field() {
            let tokens = RetryPolicy::fixed(2, 50).to_token_stream().to_string();
            for field in [
                "max_retries",
                "base_delay_ms",
                "max_delay_ms",
                "exponential_base",
                "jitter_ratio",
            ] {
                assert!(tokens.contains(field), "missing {} in {}", field, tokens);
            }
            assert!(tokens.contains("RetryPolicy"));
        }
    }
}
