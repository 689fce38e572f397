use proc_macro2::TokenStream;
use quote::quote;
use syn::{GenericArgument, Ident, PathArguments, Type};

/// 可以直接通过 `Arg::from` 转换的类型名
const DIRECT_ARG_TYPES: &[&str] = &[
    "String",
    "str",
    "i8",
    "i16",
    "i32",
    "i64",
    "u8",
    "u16",
    "u32",
    "u64",
    "usize",
    "f32",
    "f64",
    "bool",
    "Value",
    "RequestContent",
    "CancelToken",
    "RangeSpec",
    "TransferRange",
    "Cookies",
    "Arg",
];

fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(type_path) => type_path.path.segments.last(),
        _ => None,
    }
}

fn first_type_argument(arguments: &PathArguments) -> Option<&Type> {
    match arguments {
        PathArguments::AngleBracketed(args) => match args.args.first() {
            Some(GenericArgument::Type(inner)) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

fn is_u8_vec(segment: &syn::PathSegment) -> bool {
    segment.ident == "Vec"
        && first_type_argument(&segment.arguments)
            .and_then(last_segment)
            .is_some_and(|inner| inner.ident == "u8")
}

/// 判断参数类型能否直接转换为 `Arg`
fn has_direct_conversion(ty: &Type) -> bool {
    match ty {
        Type::Reference(reference) => match last_segment(&reference.elem) {
            Some(segment) => ["str", "String", "CancelToken"].contains(&segment.ident.to_string().as_str()),
            None => false,
        },
        Type::Paren(paren) => has_direct_conversion(&paren.elem),
        _ => match last_segment(ty) {
            Some(segment) if segment.ident == "Option" => {
                first_type_argument(&segment.arguments).is_some_and(has_direct_conversion)
            }
            Some(segment) => {
                is_u8_vec(segment) || DIRECT_ARG_TYPES.contains(&segment.ident.to_string().as_str())
            }
            None => false,
        },
    }
}

/// 生成把调用参数转换为 `Arg` 的表达式
///
/// 已知类型使用 `Arg::from`，其余类型按 `serde::Serialize` 序列化为 JSON。
pub fn generate_arg_conversion(name: &Ident, ty: &Type) -> TokenStream {
    if has_direct_conversion(ty) {
        quote! { ::rcp_common::Arg::from(#name) }
    } else if matches!(ty, Type::Reference(_)) {
        quote! { ::rcp_common::Arg::json(#name) }
    } else {
        quote! { ::rcp_common::Arg::json(&#name) }
    }
}

/// 生成类型转换代码
///
/// 根据返回类型从 `CallOutput` 取出结果：
/// - 配置了映射函数时取映射结果
/// - `Response`: 原始响应
/// - `String`: 响应体文本
/// - `Vec<u8>`: 响应体字节
/// - `()`: 丢弃结果
/// - 其他类型: 按 JSON 反序列化
pub fn generate_type_conversion(ok_type: &Type, mapped: bool) -> TokenStream {
    if mapped {
        return quote! { output.downcast::<#ok_type>() };
    }

    if let Type::Tuple(tuple) = ok_type {
        if tuple.elems.is_empty() {
            return quote! { ::std::result::Result::<(), ::rcp_common::RcpError>::Ok(()) };
        }
    }

    let default_conversion = quote! { output.into_json::<#ok_type>() };
    match last_segment(ok_type) {
        Some(segment) if segment.ident == "Response" => quote! { output.into_response() },
        Some(segment) if segment.ident == "CallOutput" => {
            quote! { ::std::result::Result::<_, ::rcp_common::RcpError>::Ok(output) }
        }
        Some(segment) if segment.ident == "String" => quote! { output.into_text() },
        Some(segment) if is_u8_vec(segment) => quote! { output.into_bytes() },
        _ => default_conversion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proc_macro2::Span;
    use syn::parse_quote;

    fn arg(ty: Type) -> String {
        generate_arg_conversion(&Ident::new("value", Span::call_site()), &ty).to_string()
    }

    #[test]
    fn test_direct_arg_conversions() {
        let expected = quote! { ::rcp_common::Arg::from(value) }.to_string();
        assert_eq!(arg(parse_quote! { u32 }), expected);
        assert_eq!(arg(parse_quote! { &str }), expected);
        assert_eq!(arg(parse_quote! { String }), expected);
        assert_eq!(arg(parse_quote! { Option<String> }), expected);
        assert_eq!(arg(parse_quote! { Vec<u8> }), expected);
        assert_eq!(arg(parse_quote! { rcp_common::CancelToken }), expected);
        assert_eq!(arg(parse_quote! { serde_json::Value }), expected);
    }

    #[test]
    fn test_serialized_arg_conversions() {
        assert_eq!(
            arg(parse_quote! { NewUser }),
            quote! { ::rcp_common::Arg::json(&value) }.to_string()
        );
        assert_eq!(
            arg(parse_quote! { &NewUser }),
            quote! { ::rcp_common::Arg::json(value) }.to_string()
        );
        assert_eq!(
            arg(parse_quote! { Option<NewUser> }),
            quote! { ::rcp_common::Arg::json(&value) }.to_string()
        );
        assert_eq!(
            arg(parse_quote! { Vec<String> }),
            quote! { ::rcp_common::Arg::json(&value) }.to_string()
        );
    }

    #[test]
    fn test_string_type_conversion() {
        let ok_type: Type = parse_quote! { String };
        let expected = quote! { output.into_text() };
        assert_eq!(generate_type_conversion(&ok_type, false).to_string(), expected.to_string());
    }

    #[test]
    fn test_vec_u8_type_conversion() {
        let ok_type: Type = parse_quote! { Vec<u8> };
        let expected = quote! { output.into_bytes() };
        assert_eq!(generate_type_conversion(&ok_type, false).to_string(), expected.to_string());
    }

    #[test]
    fn test_custom_type_conversion() {
        let ok_type: Type = parse_quote! { MyCustomType };
        let expected = quote! { output.into_json::<MyCustomType>() };
        assert_eq!(generate_type_conversion(&ok_type, false).to_string(), expected.to_string());
    }

    #[test]
    fn test_mapped_conversion_downcasts() {
        let ok_type: Type = parse_quote! { String };
        let expected = quote! { output.downcast::<String>() };
        assert_eq!(generate_type_conversion(&ok_type, true).to_string(), expected.to_string());
    }

    #[test]
    fn test_unit_and_response_conversion() {
        let unit: Type = parse_quote! { () };
        assert!(generate_type_conversion(&unit, false).to_string().contains("Ok (())"));
        let response: Type = parse_quote! { rcp_common::Response };
        assert_eq!(
            generate_type_conversion(&response, false).to_string(),
            quote! { output.into_response() }.to_string()
        );
    }
}
