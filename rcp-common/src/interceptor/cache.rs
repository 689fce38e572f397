use std::any::TypeId;
use std::sync::Arc;

use dashmap::DashMap;

use crate::interceptor::Interceptor;

/// 拦截器实例缓存
///
/// 同一注册表内按类型只创建一个 `Default` 实例，
/// 因而多次声明同一拦截器类型时会话配置能按实例去重。
#[derive(Default)]
pub struct InterceptorCache {
    /// 按类型ID索引
    interceptors: DashMap<TypeId, Arc<dyn Interceptor>>,
}

impl InterceptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取或创建拦截器
    pub fn get_or_create<T>(&self) -> Arc<dyn Interceptor>
    where
        T: Interceptor + Default + 'static,
    {
        self.interceptors
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(T::default()))
            .clone()
    }

    /// 获取缓存大小
    pub fn size(&self) -> usize {
        self.interceptors.len()
    }

    #[cfg(test)]
    pub fn clear(&self) {
        self.interceptors.clear();
    }
}
