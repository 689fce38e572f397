use syn::{FnArg, GenericArgument, PathArguments, ReturnType, Signature, Type};

/// 错误处理器
///
/// 负责校验路由方法与拦截器方法的签名。
pub struct ErrorHandler;

impl ErrorHandler {
    /// 验证并解析返回类型
    ///
    /// 返回类型必须是 `Result<T>` 或 `Result<T, E>`，返回 Ok 类型 `T`。
    pub fn validate_and_extract_ok_type(output: &ReturnType) -> Result<&Type, syn::Error> {
        let ty = match output {
            ReturnType::Type(_, ty) => ty,
            _ => {
                return Err(syn::Error::new_spanned(
                    output,
                    "route method must return rcp_common::Result<T>",
                ));
            }
        };

        let type_path = match &**ty {
            Type::Path(type_path) => type_path,
            _ => return Err(syn::Error::new_spanned(ty, "Return type must be Result<T>")),
        };

        let last_segment = type_path
            .path
            .segments
            .last()
            .ok_or_else(|| syn::Error::new_spanned(type_path, "Return type path must not be empty"))?;

        if last_segment.ident != "Result" {
            return Err(syn::Error::new_spanned(type_path, "Return type must be Result<T>"));
        }

        let args = match &last_segment.arguments {
            PathArguments::AngleBracketed(args) => args,
            _ => {
                return Err(syn::Error::new_spanned(
                    ty,
                    "Result<T> must have generic arguments",
                ));
            }
        };

        match args.args.first() {
            Some(GenericArgument::Type(ok_type)) if args.args.len() <= 2 => Ok(ok_type),
            _ => Err(syn::Error::new_spanned(
                ty,
                "Result<T> must have a success type parameter",
            )),
        }
    }

    /// 路由方法必须是 `async fn(&self, ..)`
    pub fn validate_route_signature(sig: &Signature) -> Result<(), syn::Error> {
        if sig.asyncness.is_none() {
            return Err(syn::Error::new_spanned(sig.fn_token, "route method must be async"));
        }
        if !sig.generics.params.is_empty() {
            return Err(syn::Error::new_spanned(
                &sig.generics,
                "route method must not be generic",
            ));
        }
        Self::validate_receiver(sig)
    }

    /// 第一个参数必须是 `&self`
    pub fn validate_receiver(sig: &Signature) -> Result<(), syn::Error> {
        match sig.inputs.first() {
            Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() && receiver.mutability.is_none() => Ok(()),
            Some(other) => Err(syn::Error::new_spanned(other, "first parameter must be '&self'")),
            None => Err(syn::Error::new_spanned(
                &sig.ident,
                "method must have at least '&self' parameter",
            )),
        }
    }

    /// 拦截器方法必须是 `async fn(&self, context, next) -> Result<Response>`
    pub fn validate_interceptor_signature(sig: &Signature) -> Result<(), syn::Error> {
        Self::validate_route_signature(sig)?;
        if sig.inputs.len() != 3 {
            return Err(syn::Error::new_spanned(
                &sig.inputs,
                "interceptor method must take (&self, context: &mut RequestContext<'_>, next: Next<'_>)",
            ));
        }
        Self::validate_and_extract_ok_type(&sig.output).map(|_| ())
    }

    /// 判断方法是否满足默认路由推断的条件
    pub fn is_route_candidate(sig: &Signature) -> bool {
        sig.asyncness.is_some() && Self::validate_receiver(sig).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::{ReturnType, parse_quote};

    #[test]
    fn test_validate_correct_return_type() {
        let return_type: ReturnType = parse_quote! { -> rcp_common::Result<String> };
        let ok_type = ErrorHandler::validate_and_extract_ok_type(&return_type).unwrap();
        let expected: Type = parse_quote! { String };
        assert_eq!(ok_type, &expected);

        let with_error: ReturnType = parse_quote! { -> std::result::Result<Vec<u8>, anyhow::Error> };
        assert!(ErrorHandler::validate_and_extract_ok_type(&with_error).is_ok());
    }

    #[test]
    fn test_validate_incorrect_return_type() {
        let return_type: ReturnType = parse_quote! { -> Option<String> };
        assert!(ErrorHandler::validate_and_extract_ok_type(&return_type).is_err());
        let bare: ReturnType = parse_quote! { -> Result };
        assert!(ErrorHandler::validate_and_extract_ok_type(&bare).is_err());
    }

    #[test]
    fn test_validate_no_return_type() {
        let return_type = ReturnType::Default;
        assert!(ErrorHandler::validate_and_extract_ok_type(&return_type).is_err());
    }

    #[test]
    fn test_route_signature() {
        let ok: Signature = parse_quote! { async fn users(&self, page: u32) -> Result<String> };
        assert!(ErrorHandler::validate_route_signature(&ok).is_ok());

        let not_async: Signature = parse_quote! { fn users(&self) -> Result<String> };
        assert!(ErrorHandler::validate_route_signature(&not_async).is_err());

        let by_value: Signature = parse_quote! { async fn users(self) -> Result<String> };
        assert!(ErrorHandler::validate_route_signature(&by_value).is_err());

        let mutable: Signature = parse_quote! { async fn users(&mut self) -> Result<String> };
        assert!(ErrorHandler::validate_route_signature(&mutable).is_err());

        let no_self: Signature = parse_quote! { async fn users(page: u32) -> Result<String> };
        assert!(ErrorHandler::validate_route_signature(&no_self).is_err());
        assert!(!ErrorHandler::is_route_candidate(&no_self));
    }

    #[test]
    fn test_interceptor_signature() {
        let ok: Signature = parse_quote! {
            async fn sign(&self, context: &mut RequestContext<'_>, next: Next<'_>) -> Result<Response>
        };
        assert!(ErrorHandler::validate_interceptor_signature(&ok).is_ok());

        let missing_next: Signature = parse_quote! {
            async fn sign(&self, context: &mut RequestContext<'_>) -> Result<Response>
        };
        assert!(ErrorHandler::validate_interceptor_signature(&missing_next).is_err());
    }
}
