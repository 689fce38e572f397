use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

/// 声明类型的标识
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 配置的声明位置：类型本身，或类型的某个成员
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Site {
    pub ty: TypeKey,
    pub member: Option<String>,
}

impl Site {
    pub fn class(ty: TypeKey) -> Self {
        Self { ty, member: None }
    }

    pub fn member(ty: TypeKey, member: impl Into<String>) -> Self {
        Self {
            ty,
            member: Some(member.into()),
        }
    }
}

/// 可按字段策略合并的配置片段
pub trait Fragment: Default + Clone {
    fn merge(&mut self, delta: Self);
}

/// 声明位置到配置片段的映射
///
/// 写入只发生在声明阶段，读取总是返回副本。
pub struct ConfigStore<F> {
    entries: RwLock<HashMap<Site, F>>,
}

impl<F: Fragment> ConfigStore<F> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// 不存在时返回空片段，不会写入
    pub fn get(&self, site: &Site) -> F {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(site)
            .cloned()
            .unwrap_or_default()
    }

    pub fn contains(&self, site: &Site) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(site)
    }

    pub fn set(&self, site: Site, fragment: F) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(site, fragment);
    }

    pub fn merge(&self, site: Site, delta: F) {
        self.update(site, |stored| stored.merge(delta));
    }

    pub fn update<R>(&self, site: Site, f: impl FnOnce(&mut F) -> R) -> R {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        f(entries.entry(site).or_default())
    }

    /// 某个类型下所有已配置的成员名
    pub fn members(&self, ty: TypeKey) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|site| site.ty == ty)
            .filter_map(|site| site.member.clone())
            .collect()
    }
}

impl<F: Fragment> Default for ConfigStore<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Tags(Vec<&'static str>);

    impl Fragment for Tags {
        fn merge(&mut self, delta: Self) {
            self.0.extend(delta.0);
        }
    }

    struct Owner;
    struct Other;

    #[test]
    fn test_get_missing_returns_empty_without_writing() {
        let store = ConfigStore::<Tags>::new();
        let site = Site::class(TypeKey::of::<Owner>());
        assert_eq!(store.get(&site), Tags::default());
        assert!(!store.contains(&site));
    }

    #[test]
    fn test_merge_appends_and_set_replaces() {
        let store = ConfigStore::<Tags>::new();
        let site = Site::member(TypeKey::of::<Owner>(), "load");

        store.merge(site.clone(), Tags(vec!["a"]));
        store.merge(site.clone(), Tags(vec!["b", "c"]));
        assert_eq!(store.get(&site), Tags(vec!["a", "b", "c"]));

        store.set(site.clone(), Tags(vec!["z"]));
        assert_eq!(store.get(&site), Tags(vec!["z"]));
    }

    #[test]
    fn test_sites_are_isolated_per_type_and_member() {
        let store = ConfigStore::<Tags>::new();
        store.merge(Site::member(TypeKey::of::<Owner>(), "a"), Tags(vec!["owner"]));
        store.merge(Site::member(TypeKey::of::<Other>(), "a"), Tags(vec!["other"]));
        store.merge(Site::class(TypeKey::of::<Owner>()), Tags(vec!["class"]));

        assert_eq!(
            store.get(&Site::member(TypeKey::of::<Owner>(), "a")),
            Tags(vec!["owner"])
        );
        assert_eq!(store.members(TypeKey::of::<Owner>()), vec!["a".to_string()]);
    }

    #[test]
    fn test_type_key_name() {
        assert!(TypeKey::of::<Owner>().name().ends_with("Owner"));
        assert_ne!(TypeKey::of::<Owner>(), TypeKey::of::<Other>());
    }
}
