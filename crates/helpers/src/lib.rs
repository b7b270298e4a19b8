use std::hash::BuildHasherDefault;

/// Insertion-order-preserving map, used wherever iteration order must match
/// the order callers added entries in (the table registry, a schema's
/// name -> index lookup).
pub type IndexMap<K, V> = indexmap::IndexMap<K, V, BuildHasherDefault<ahash::AHasher>>;
pub type IndexSet<V> = indexmap::IndexSet<V, BuildHasherDefault<ahash::AHasher>>;

/// Builder-style mutation: `Thing::default().config(|t| t.field = x)`.
pub trait Config: Sized {
    fn config(mut self, f: impl FnOnce(&mut Self)) -> Self {
        f(&mut self);
        self
    }
}

impl<T> Config for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Widget {
        name: String,
    }

    #[test]
    fn config_applies_mutation() {
        let w = Widget::default().config(|w| w.name = "a".into());
        assert_eq!(w.name, "a");
    }

    #[test]
    fn index_map_preserves_insertion_order() {
        let mut m: IndexMap<&str, i32> = IndexMap::default();
        m.insert("b", 2);
        m.insert("a", 1);
        assert_eq!(m.keys().collect::<Vec<_>>(), vec![&"b", &"a"]);
    }
}
