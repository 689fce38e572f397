use serde::{Deserialize, Serialize};

use crate::types::param::Arg;

/// 单个字节区间，恒有 `from <= to`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRange {
    pub from: i64,
    pub to: i64,
}

impl TransferRange {
    /// 构造区间，`from > to` 时自动交换
    pub fn new(from: i64, to: i64) -> Self {
        if from > to {
            Self { from: to, to: from }
        } else {
            Self { from, to }
        }
    }
}

/// 解析后的传输区间：单个区间或按输入顺序排列的多个区间
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeSpec {
    Single(TransferRange),
    Multiple(Vec<TransferRange>),
}

impl RangeSpec {
    pub fn ranges(&self) -> &[TransferRange] {
        match self {
            RangeSpec::Single(range) => std::slice::from_ref(range),
            RangeSpec::Multiple(ranges) => ranges,
        }
    }

    /// `Range` 请求头的值，例如 `bytes=0-100,200-300`
    pub fn header_value(&self) -> String {
        let parts: Vec<String> = self
            .ranges()
            .iter()
            .map(|range| format!("{}-{}", range.from, range.to))
            .collect();
        format!("bytes={}", parts.join(","))
    }

    fn from_ranges(mut ranges: Vec<TransferRange>) -> Option<Self> {
        match ranges.len() {
            0 => None,
            1 => ranges.pop().map(RangeSpec::Single),
            _ => Some(RangeSpec::Multiple(ranges)),
        }
    }
}

impl From<TransferRange> for RangeSpec {
    fn from(range: TransferRange) -> Self {
        RangeSpec::Single(range)
    }
}

/// 宽松的整数解析：跳过前导空白，读取可选符号与连续数字，忽略其后的内容
fn parse_leading_int(segment: &str) -> Option<i64> {
    let trimmed = segment.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|value| sign * value)
}

/// 解析 `0-100,200-300` 形式的字符串，中英文逗号均可作为分隔符
///
/// 单个数字表示 `0-n`；无法识别的片段被静默丢弃。
pub fn parse_range_str(raw: &str) -> Option<RangeSpec> {
    let ranges = raw
        .split([',', '，'])
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| {
            let parts: Vec<&str> = segment.split('-').collect();
            match parts.as_slice() {
                [to] => Some(TransferRange::new(0, parse_leading_int(to)?)),
                [from, to] => Some(TransferRange::new(
                    parse_leading_int(from)?,
                    parse_leading_int(to)?,
                )),
                _ => None,
            }
        })
        .collect();
    RangeSpec::from_ranges(ranges)
}

/// 数字 `n` 表示 `0-n`，负数也不交换端点；非有限值返回 `None`
pub fn parse_range_number(value: f64) -> Option<RangeSpec> {
    if !value.is_finite() {
        return None;
    }
    Some(RangeSpec::Single(TransferRange {
        from: 0,
        to: value.trunc() as i64,
    }))
}

/// 将调用参数解析为传输区间
pub fn parse_transfer_range(arg: &Arg) -> Option<RangeSpec> {
    match arg {
        Arg::Text(raw) => parse_range_str(raw),
        Arg::Number(value) => parse_range_number(*value),
        Arg::Integer(value) => Some(RangeSpec::Single(TransferRange { from: 0, to: *value })),
        Arg::Range(spec) => Some(spec.clone()),
        Arg::Json(serde_json::Value::String(raw)) => parse_range_str(raw),
        Arg::Json(serde_json::Value::Number(number)) => number.as_f64().and_then(parse_range_number),
        Arg::Json(value) => serde_json::from_value::<RangeSpec>(value.clone())
            .ok()
            .and_then(|spec| {
                RangeSpec::from_ranges(
                    spec.ranges()
                        .iter()
                        .map(|range| TransferRange::new(range.from, range.to))
                        .collect(),
                )
            }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(from: i64, to: i64) -> TransferRange {
        TransferRange { from, to }
    }

    #[test]
    fn test_parse_single_pair() {
        assert_eq!(parse_range_str("0-100"), Some(RangeSpec::Single(range(0, 100))));
    }

    #[test]
    fn test_parse_bare_number_means_from_zero() {
        assert_eq!(parse_range_str("100"), Some(RangeSpec::Single(range(0, 100))));
    }

    #[test]
    fn test_parse_swaps_reversed_pair() {
        assert_eq!(parse_range_str("50-10"), Some(RangeSpec::Single(range(10, 50))));
    }

    #[test]
    fn test_parse_multiple_ranges() {
        assert_eq!(
            parse_range_str("0-100,200-300"),
            Some(RangeSpec::Multiple(vec![range(0, 100), range(200, 300)]))
        );
        assert_eq!(
            parse_range_str(" 0-1 ， 5-9 ,, "),
            Some(RangeSpec::Multiple(vec![range(0, 1), range(5, 9)]))
        );
    }

    #[test]
    fn test_parse_drops_malformed_segments() {
        assert_eq!(parse_range_str("abc"), None);
        assert_eq!(parse_range_str(""), None);
        assert_eq!(parse_range_str("abc,10-20"), Some(RangeSpec::Single(range(10, 20))));
        assert_eq!(parse_range_str("1-2-3"), None);
        assert_eq!(parse_range_str("12kb"), Some(RangeSpec::Single(range(0, 12))));
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_range_number(100.0), Some(RangeSpec::Single(range(0, 100))));
        assert_eq!(parse_range_number(f64::NAN), None);
        assert_eq!(parse_range_number(f64::INFINITY), None);
    }

    #[test]
    fn test_negative_number_keeps_endpoints() {
        assert_eq!(parse_range_number(-5.0), Some(RangeSpec::Single(range(0, -5))));
        assert_eq!(parse_range_number(-5.7), Some(RangeSpec::Single(range(0, -5))));
        assert_eq!(
            parse_transfer_range(&Arg::from(-5)),
            Some(RangeSpec::Single(range(0, -5)))
        );
    }

    #[test]
    fn test_parse_transfer_range_from_args() {
        assert_eq!(
            parse_transfer_range(&Arg::from("0-100")),
            Some(RangeSpec::Single(range(0, 100)))
        );
        assert_eq!(
            parse_transfer_range(&Arg::from(100)),
            Some(RangeSpec::Single(range(0, 100)))
        );
        assert_eq!(parse_transfer_range(&Arg::from(f64::NAN)), None);
        assert_eq!(parse_transfer_range(&Arg::Null), None);

        let structured = Arg::Json(serde_json::json!([{"from": 1, "to": 2}, {"from": 4, "to": 8}]));
        assert_eq!(
            parse_transfer_range(&structured),
            Some(RangeSpec::Multiple(vec![range(1, 2), range(4, 8)]))
        );
    }

    #[test]
    fn test_header_value() {
        let spec = RangeSpec::Multiple(vec![range(0, 100), range(200, 300)]);
        assert_eq!(spec.header_value(), "bytes=0-100,200-300");
    }
}
