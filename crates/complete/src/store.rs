//! The type store: one node per known symbol.
//!
//! A store holds the symbol's own properties (child stores), the set of
//! atomic types hypothesised for it, a ranking weight, and, for anything
//! typed `Function`, the stores describing what the function does:
//!
//! | index | meaning                                   |
//! |-------|-------------------------------------------|
//! | 0     | properties assigned through `this`        |
//! | 1     | properties of the return value            |
//! | 2 + N | what the body does with parameter N       |
//!
//! Stores form a tree. Shapes are copied between nodes with
//! [`TypeStore::merge`], never shared.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

pub const THIS_PROPERTIES: usize = 0;
pub const RETURN_PROPERTIES: usize = 1;
pub const FIRST_PARAMETER: usize = 2;

/// Origin name given to every function-typed symbol.
pub const FUNCTION: &str = "Function";

/// One hypothesis about where a value's shape comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AtomicType {
    /// Dotted path of the producing function or constructor.
    pub origin: String,
    /// Which facet of the origin supplies properties.
    pub index: usize,
}

impl AtomicType {
    pub fn new(origin: impl Into<String>, index: usize) -> Self {
        AtomicType {
            origin: origin.into(),
            index,
        }
    }

    /// `{origin, 0}`: an instance constructed by `origin`.
    pub fn instance_of(origin: impl Into<String>) -> Self {
        Self::new(origin, THIS_PROPERTIES)
    }

    pub fn function() -> Self {
        Self::instance_of(FUNCTION)
    }

    /// The origin split into the path segments used to find it.
    pub fn origin_path(&self) -> Vec<String> {
        self.origin.split('.').map(str::to_owned).collect()
    }
}

/// All hypotheses for one symbol: origin name to source indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CompoundType(IndexMap<String, IndexSet<usize>>);

impl CompoundType {
    pub fn insert(&mut self, ty: AtomicType) -> bool {
        self.0.entry(ty.origin).or_default().insert(ty.index)
    }

    pub fn contains_origin(&self, origin: &str) -> bool {
        self.0.contains_key(origin)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn union(&mut self, other: &CompoundType) {
        for (origin, indices) in &other.0 {
            self.0
                .entry(origin.clone())
                .or_default()
                .extend(indices.iter().copied());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = AtomicType> + '_ {
        self.0.iter().flat_map(|(origin, indices)| {
            indices
                .iter()
                .map(move |&index| AtomicType::new(origin.clone(), index))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypeStore {
    pub properties: IndexMap<String, TypeStore>,
    #[serde(rename = "type")]
    pub ty: CompoundType,
    pub weight: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<TypeStore>>,
}

impl TypeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weight(weight: u32) -> Self {
        TypeStore {
            weight,
            ..Self::default()
        }
    }

    /// A store typed `Function` with empty `this` and return slots.
    pub fn function(weight: u32) -> Self {
        let mut store = Self::with_weight(weight);
        store.add_type(AtomicType::function());
        store
    }

    /// No type and no properties: nothing to complete from here.
    pub fn is_leaf(&self) -> bool {
        self.ty.is_empty() && self.properties.is_empty()
    }

    pub fn is_function(&self) -> bool {
        self.ty.contains_origin(FUNCTION)
    }

    /// Add a type hypothesis. Becoming a function allocates the `this`
    /// and return slots.
    pub fn add_type(&mut self, ty: AtomicType) {
        let is_function = ty.origin == FUNCTION;
        self.ty.insert(ty);
        if is_function && self.sources.is_none() {
            self.sources = Some(vec![TypeStore::new(), TypeStore::new()]);
        }
    }

    /// Declare (or re-declare) a property. A repeated declaration raises
    /// the weight to at least one above its previous value.
    pub fn add_property(
        &mut self,
        name: &str,
        ty: Option<AtomicType>,
        weight: u32,
    ) -> &mut TypeStore {
        let child = match self.properties.get_index_of(name) {
            Some(idx) => {
                let child = &mut self.properties[idx];
                child.weight = child.weight.saturating_add(1).max(weight);
                child
            }
            None => self
                .properties
                .entry(name.to_owned())
                .or_insert_with(|| TypeStore::with_weight(weight)),
        };
        if let Some(ty) = ty {
            child.add_type(ty);
        }
        child
    }

    /// Walk `path`, declaring every segment on the way, and return the
    /// last store.
    pub fn materialize(&mut self, path: &[String], weight: u32) -> &mut TypeStore {
        let mut store = self;
        for segment in path {
            store = store.add_property(segment, None, weight);
        }
        store
    }

    pub fn get(&self, path: &[String]) -> Option<&TypeStore> {
        let mut store = self;
        for segment in path {
            store = store.properties.get(segment)?;
        }
        Some(store)
    }

    pub fn source(&self, index: usize) -> Option<&TypeStore> {
        self.sources.as_ref()?.get(index)
    }

    /// The store at `sources[index]`, typing this store `Function` and
    /// growing the parameter slots as needed.
    pub fn source_mut(&mut self, index: usize) -> &mut TypeStore {
        if self.sources.is_none() {
            self.add_type(AtomicType::function());
        }
        let sources = self.sources.get_or_insert_with(Vec::new);
        if sources.len() <= index {
            sources.resize_with(index + 1, TypeStore::new);
        }
        &mut sources[index]
    }

    /// Deep-merge `other` into this store: properties recursively, types
    /// unioned, the larger weight kept, sources merged slot by slot.
    pub fn merge(&mut self, other: &TypeStore) {
        let mut pending = vec![(self, other)];
        while let Some((ours, theirs)) = pending.pop() {
            ours.weight = ours.weight.max(theirs.weight);
            for ty in theirs.ty.iter() {
                ours.add_type(ty);
            }
            if let Some(len) = theirs.sources.as_ref().map(Vec::len).filter(|&n| n > 0) {
                ours.source_mut(len - 1);
            }
            // new names are appended, so the first `existing` entries are
            // the ones that still need merging
            let existing = ours.properties.len();
            for (name, child) in &theirs.properties {
                if !ours.properties.contains_key(name) {
                    ours.properties.insert(name.clone(), child.clone());
                }
            }

            let TypeStore {
                properties,
                sources,
                ..
            } = ours;
            for (name, child) in properties.iter_mut().take(existing) {
                if let Some(their_child) = theirs.properties.get(name) {
                    pending.push((child, their_child));
                }
            }
            if let (Some(our_sources), Some(their_sources)) =
                (sources.as_mut(), theirs.sources.as_ref())
            {
                pending.extend(our_sources.iter_mut().zip(their_sources));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn redeclaration_weight_is_monotonic() {
        let mut root = TypeStore::new();
        root.add_property("a", None, 3);
        assert_eq!(root.properties["a"].weight, 3);
        root.add_property("a", None, 0);
        assert_eq!(root.properties["a"].weight, 4);
        root.add_property("a", None, 9);
        assert_eq!(root.properties["a"].weight, 9);
    }

    #[test]
    fn function_type_allocates_sources() {
        let mut store = TypeStore::new();
        assert!(store.sources.is_none());
        store.add_type(AtomicType::function());
        assert_eq!(store.sources.as_ref().map(Vec::len), Some(2));
        store.source_mut(FIRST_PARAMETER + 1);
        assert_eq!(store.sources.as_ref().map(Vec::len), Some(4));
    }

    #[test]
    fn materialize_creates_intermediate_stores() {
        let mut root = TypeStore::new();
        root.materialize(&path(&["foo", "bar", "baz"]), 1)
            .add_type(AtomicType::instance_of("Array"));
        let baz = root.get(&path(&["foo", "bar", "baz"])).unwrap();
        assert!(baz.ty.contains_origin("Array"));
        assert!(root.get(&path(&["foo", "qux"])).is_none());
        assert!(root.get(&[]).is_some());
    }

    #[test]
    fn merge_is_deep_and_copies() {
        let mut a = TypeStore::new();
        a.materialize(&path(&["x", "y"]), 0);
        let mut b = TypeStore::function(2);
        b.materialize(&path(&["x", "z"]), 0);
        b.source_mut(THIS_PROPERTIES).add_property("w", None, 0);

        a.merge(&b);
        assert!(a.is_function());
        assert_eq!(a.weight, 2);
        let x = &a.properties["x"];
        assert!(x.properties.contains_key("y") && x.properties.contains_key("z"));
        assert!(a.source(THIS_PROPERTIES).unwrap().properties.contains_key("w"));

        // b is untouched by later changes to a
        a.source_mut(THIS_PROPERTIES).add_property("v", None, 0);
        assert!(!b.source(THIS_PROPERTIES).unwrap().properties.contains_key("v"));
    }

    #[test]
    fn merge_handles_very_deep_stores() {
        let depth = 1000;
        let mut spine = vec!["p".to_owned(); depth];
        let mut a = TypeStore::new();
        a.materialize(&spine, 0);
        let mut b = TypeStore::new();
        b.materialize(&spine, 0)
            .add_type(AtomicType::instance_of("Array"));
        spine.push("leaf".to_owned());
        b.materialize(&spine, 3);

        a.merge(&b);
        let end = a.get(&spine[..depth]).unwrap();
        assert!(end.ty.contains_origin("Array"));
        assert_eq!(end.properties["leaf"].weight, 3);
    }

    #[test]
    fn empty_store_is_a_leaf() {
        assert!(TypeStore::new().is_leaf());
        assert!(!TypeStore::function(0).is_leaf());
    }

    #[test]
    fn atomic_types_iterate_in_insertion_order() {
        let mut ty = CompoundType::default();
        ty.insert(AtomicType::new("bar", RETURN_PROPERTIES));
        ty.insert(AtomicType::instance_of("Array"));
        ty.insert(AtomicType::new("bar", FIRST_PARAMETER));
        let all: Vec<_> = ty.iter().collect();
        assert_eq!(
            all,
            [
                AtomicType::new("bar", 1),
                AtomicType::new("bar", 2),
                AtomicType::new("Array", 0)
            ]
        );
    }
}
