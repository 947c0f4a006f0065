//! Dynamic completion against a live object graph.
//!
//! The host runtime is reached through [`Reflect`]. Lookups follow data
//! properties only; an accessor ends the walk for that branch so no getter
//! is ever run.

use indexmap::{IndexMap, IndexSet};

use crate::candidate::{Candidate, CompletionSet};
use crate::config::AnalysisLimits;
use crate::context::{Intent, IntentKind};

/// Score for every sandbox candidate: after all static matches, before
/// keywords.
pub const SANDBOX_SCORE: i64 = -1;

/// Opaque handle to an object in the host runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef(pub usize);

/// An own property as seen without running any code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// A data property; `None` when the value is a primitive.
    Value(Option<ObjectRef>),
    /// A getter and/or setter.
    Accessor,
}

/// Reflection over the host's object graph.
pub trait Reflect {
    fn global(&self) -> ObjectRef;
    fn own_property_names(&self, obj: ObjectRef) -> Vec<String>;
    /// Own property only; inherited properties are found by the caller.
    fn property(&self, obj: ObjectRef, name: &str) -> Option<Slot>;
    fn prototype_of(&self, obj: ObjectRef) -> Option<ObjectRef>;
}

/// Read `obj[name]` through the prototype chain. `None` for a missing
/// property, a primitive, or an accessor anywhere on the way.
pub fn get(
    reflect: &dyn Reflect,
    obj: ObjectRef,
    name: &str,
    limits: &AnalysisLimits,
) -> Option<ObjectRef> {
    let mut current = Some(obj);
    for _ in 0..=limits.max_prototype_depth {
        let holder = current?;
        match reflect.property(holder, name) {
            Some(Slot::Value(value)) => return value,
            Some(Slot::Accessor) => return None,
            None => current = reflect.prototype_of(holder),
        }
    }
    None
}

/// Own and inherited property names, nearest first, without duplicates.
pub fn property_names(
    reflect: &dyn Reflect,
    obj: ObjectRef,
    limits: &AnalysisLimits,
) -> IndexSet<String> {
    let mut names = IndexSet::new();
    let mut current = Some(obj);
    let mut seen = Vec::new();
    for _ in 0..=limits.max_prototype_depth {
        let Some(holder) = current else { break };
        if seen.contains(&holder) {
            break;
        }
        seen.push(holder);
        names.extend(reflect.own_property_names(holder));
        current = reflect.prototype_of(holder);
    }
    names
}

/// `Origin.prototype` for a global constructor.
pub fn builtin_prototype(
    reflect: &dyn Reflect,
    origin: &str,
    limits: &AnalysisLimits,
) -> Option<ObjectRef> {
    let ctor = get(reflect, reflect.global(), origin, limits)?;
    get(reflect, ctor, "prototype", limits)
}

/// Resolve all but the last segment of `chain` starting from `obj`.
pub fn resolve(
    reflect: &dyn Reflect,
    obj: ObjectRef,
    chain: &[String],
    limits: &AnalysisLimits,
) -> Option<ObjectRef> {
    let (_, parents) = chain.split_last()?;
    let mut current = obj;
    for segment in parents {
        current = get(reflect, current, segment, limits)?;
    }
    Some(current)
}

/// Names on `obj` completing `prefix`, as sandbox candidates.
pub fn candidates_on(
    reflect: &dyn Reflect,
    obj: ObjectRef,
    prefix: &str,
    limits: &AnalysisLimits,
) -> CompletionSet {
    property_names(reflect, obj, limits)
        .into_iter()
        .filter(|name| {
            name.len() > prefix.len()
                && name.starts_with(prefix)
                && augur_core::is_identifier_name(name)
        })
        .map(|name| Candidate::new(name, prefix, SANDBOX_SCORE))
        .collect()
}

/// Complete `intent` against the sandbox's global object.
pub fn sandbox_completions(
    reflect: &dyn Reflect,
    intent: &Intent,
    limits: &AnalysisLimits,
) -> CompletionSet {
    let start = match intent.kind {
        IntentKind::Identifier | IntentKind::Property => Some(reflect.global()),
        IntentKind::String => builtin_prototype(reflect, "String", limits),
        IntentKind::Regex => builtin_prototype(reflect, "RegExp", limits),
    };
    let chain = intent.lookup_chain();
    match start.and_then(|obj| resolve(reflect, obj, &chain, limits)) {
        Some(obj) => candidates_on(reflect, obj, intent.prefix(), limits),
        None => CompletionSet::new(),
    }
}

// ──────────────────────────────────────────────
// In-memory object graph
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct Object {
    properties: IndexMap<String, Slot>,
    prototype: Option<ObjectRef>,
}

/// An arena of objects implementing [`Reflect`]. Object 0 is the global
/// object.
#[derive(Debug, Clone)]
pub struct ObjectGraph {
    objects: Vec<Object>,
}

impl Default for ObjectGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectGraph {
    /// A graph holding only an empty global object.
    pub fn new() -> Self {
        ObjectGraph {
            objects: vec![Object::default()],
        }
    }

    pub fn object(&mut self, prototype: Option<ObjectRef>) -> ObjectRef {
        self.objects.push(Object {
            properties: IndexMap::new(),
            prototype,
        });
        ObjectRef(self.objects.len() - 1)
    }

    pub fn set(&mut self, obj: ObjectRef, name: &str, slot: Slot) {
        if let Some(object) = self.objects.get_mut(obj.0) {
            object.properties.insert(name.to_owned(), slot);
        }
    }

    pub fn set_object(&mut self, obj: ObjectRef, name: &str, value: ObjectRef) {
        self.set(obj, name, Slot::Value(Some(value)));
    }

    pub fn set_primitive(&mut self, obj: ObjectRef, name: &str) {
        self.set(obj, name, Slot::Value(None));
    }

    pub fn set_accessor(&mut self, obj: ObjectRef, name: &str) {
        self.set(obj, name, Slot::Accessor);
    }

    /// Look up a global by name.
    pub fn global_object(&self, name: &str) -> Option<ObjectRef> {
        match self.objects[0].properties.get(name)? {
            Slot::Value(value) => *value,
            Slot::Accessor => None,
        }
    }

    /// The standard ECMAScript global environment: constructors with
    /// their static and prototype members, `Math`, `JSON` and the global
    /// functions.
    pub fn ecmascript() -> Self {
        let mut g = EcmaBuilder::new();
        g.build();
        g.graph
    }
}

impl Reflect for ObjectGraph {
    fn global(&self) -> ObjectRef {
        ObjectRef(0)
    }

    fn own_property_names(&self, obj: ObjectRef) -> Vec<String> {
        self.objects
            .get(obj.0)
            .map(|o| o.properties.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn property(&self, obj: ObjectRef, name: &str) -> Option<Slot> {
        self.objects.get(obj.0)?.properties.get(name).copied()
    }

    fn prototype_of(&self, obj: ObjectRef) -> Option<ObjectRef> {
        self.objects.get(obj.0)?.prototype
    }
}

// ──────────────────────────────────────────────
// ECMAScript globals
// ──────────────────────────────────────────────

/// Members of a built-in: methods become function objects, values are
/// primitives, accessors are never followed.
struct Members<'m> {
    methods: &'m [&'m str],
    values: &'m [&'m str],
    accessors: &'m [&'m str],
}

const NONE: Members<'static> = Members {
    methods: &[],
    values: &[],
    accessors: &[],
};

struct EcmaBuilder {
    graph: ObjectGraph,
    object_prototype: ObjectRef,
    function_prototype: ObjectRef,
}

impl EcmaBuilder {
    fn new() -> Self {
        let mut graph = ObjectGraph::new();
        let object_prototype = graph.object(None);
        let function_prototype = graph.object(Some(object_prototype));
        graph.objects[0].prototype = Some(object_prototype);
        EcmaBuilder {
            graph,
            object_prototype,
            function_prototype,
        }
    }

    fn function(&mut self) -> ObjectRef {
        self.graph.object(Some(self.function_prototype))
    }

    fn fill(&mut self, obj: ObjectRef, members: &Members<'_>) {
        for name in members.methods {
            let f = self.function();
            self.graph.set_object(obj, name, f);
        }
        for name in members.values {
            self.graph.set_primitive(obj, name);
        }
        for name in members.accessors {
            self.graph.set_accessor(obj, name);
        }
    }

    /// Install a global constructor whose prototype is `prototype`
    /// (created when `None`) inheriting from `parent`.
    fn constructor(
        &mut self,
        name: &str,
        prototype: Option<ObjectRef>,
        parent: ObjectRef,
        statics: &Members<'_>,
        proto: &Members<'_>,
    ) -> ObjectRef {
        let ctor = self.function();
        let prototype = prototype.unwrap_or_else(|| self.graph.object(Some(parent)));
        self.graph.set_object(ctor, "prototype", prototype);
        self.graph.set_primitive(ctor, "length");
        self.graph.set_primitive(ctor, "name");
        self.graph.set_object(prototype, "constructor", ctor);
        self.fill(ctor, statics);
        self.fill(prototype, proto);
        let global = self.graph.global();
        self.graph.set_object(global, name, ctor);
        prototype
    }

    fn namespace(&mut self, name: &str, members: &Members<'_>) {
        let obj = self.graph.object(Some(self.object_prototype));
        self.fill(obj, members);
        let global = self.graph.global();
        self.graph.set_object(global, name, obj);
    }

    fn build(&mut self) {
        let object_prototype = self.object_prototype;
        let function_prototype = self.function_prototype;

        self.constructor(
            "Object",
            Some(object_prototype),
            object_prototype,
            &Members {
                methods: &[
                    "assign",
                    "create",
                    "defineProperties",
                    "defineProperty",
                    "entries",
                    "freeze",
                    "getOwnPropertyDescriptor",
                    "getOwnPropertyNames",
                    "getPrototypeOf",
                    "isExtensible",
                    "isFrozen",
                    "isSealed",
                    "keys",
                    "preventExtensions",
                    "seal",
                    "values",
                ],
                ..NONE
            },
            &Members {
                methods: &[
                    "hasOwnProperty",
                    "isPrototypeOf",
                    "propertyIsEnumerable",
                    "toLocaleString",
                    "toString",
                    "valueOf",
                ],
                ..NONE
            },
        );

        self.constructor(
            "Function",
            Some(function_prototype),
            object_prototype,
            &NONE,
            &Members {
                methods: &["apply", "bind", "call", "toString"],
                values: &["length", "name"],
                ..NONE
            },
        );

        self.constructor(
            "Array",
            None,
            object_prototype,
            &Members {
                methods: &["from", "isArray", "of"],
                ..NONE
            },
            &Members {
                methods: &[
                    "concat",
                    "entries",
                    "every",
                    "fill",
                    "filter",
                    "find",
                    "findIndex",
                    "forEach",
                    "includes",
                    "indexOf",
                    "join",
                    "keys",
                    "lastIndexOf",
                    "map",
                    "pop",
                    "push",
                    "reduce",
                    "reduceRight",
                    "reverse",
                    "shift",
                    "slice",
                    "some",
                    "sort",
                    "splice",
                    "unshift",
                ],
                values: &["length"],
                ..NONE
            },
        );

        self.constructor(
            "String",
            None,
            object_prototype,
            &Members {
                methods: &["fromCharCode", "fromCodePoint", "raw"],
                ..NONE
            },
            &Members {
                methods: &[
                    "charAt",
                    "charCodeAt",
                    "codePointAt",
                    "concat",
                    "endsWith",
                    "includes",
                    "indexOf",
                    "lastIndexOf",
                    "localeCompare",
                    "match",
                    "padEnd",
                    "padStart",
                    "repeat",
                    "replace",
                    "search",
                    "slice",
                    "split",
                    "startsWith",
                    "substr",
                    "substring",
                    "toLocaleLowerCase",
                    "toLocaleUpperCase",
                    "toLowerCase",
                    "toUpperCase",
                    "trim",
                ],
                values: &["length"],
                ..NONE
            },
        );

        self.constructor(
            "Number",
            None,
            object_prototype,
            &Members {
                methods: &["isFinite", "isInteger", "isNaN", "parseFloat", "parseInt"],
                values: &[
                    "MAX_VALUE",
                    "MIN_VALUE",
                    "NaN",
                    "NEGATIVE_INFINITY",
                    "POSITIVE_INFINITY",
                    "EPSILON",
                ],
                ..NONE
            },
            &Members {
                methods: &[
                    "toExponential",
                    "toFixed",
                    "toLocaleString",
                    "toPrecision",
                    "toString",
                    "valueOf",
                ],
                ..NONE
            },
        );

        self.constructor(
            "Boolean",
            None,
            object_prototype,
            &NONE,
            &Members {
                methods: &["toString", "valueOf"],
                ..NONE
            },
        );

        self.constructor(
            "RegExp",
            None,
            object_prototype,
            &NONE,
            &Members {
                methods: &["exec", "test", "toString"],
                accessors: &["flags", "global", "ignoreCase", "multiline", "source", "sticky"],
                ..NONE
            },
        );

        self.constructor(
            "Date",
            None,
            object_prototype,
            &Members {
                methods: &["now", "parse", "UTC"],
                ..NONE
            },
            &Members {
                methods: &[
                    "getDate",
                    "getDay",
                    "getFullYear",
                    "getHours",
                    "getMilliseconds",
                    "getMinutes",
                    "getMonth",
                    "getSeconds",
                    "getTime",
                    "getTimezoneOffset",
                    "setDate",
                    "setFullYear",
                    "setHours",
                    "setMilliseconds",
                    "setMinutes",
                    "setMonth",
                    "setSeconds",
                    "setTime",
                    "toDateString",
                    "toISOString",
                    "toJSON",
                    "toLocaleDateString",
                    "toLocaleTimeString",
                    "toTimeString",
                    "toUTCString",
                ],
                ..NONE
            },
        );

        let error_members = Members {
            methods: &["toString"],
            values: &["message", "name"],
            ..NONE
        };
        let error_prototype =
            self.constructor("Error", None, object_prototype, &NONE, &error_members);
        for name in [
            "EvalError",
            "RangeError",
            "ReferenceError",
            "SyntaxError",
            "TypeError",
            "URIError",
        ] {
            self.constructor(
                name,
                None,
                error_prototype,
                &NONE,
                &Members {
                    values: &["message", "name"],
                    ..NONE
                },
            );
        }

        self.namespace(
            "Math",
            &Members {
                methods: &[
                    "abs", "acos", "asin", "atan", "atan2", "ceil", "cos", "exp", "floor", "log",
                    "max", "min", "pow", "random", "round", "sign", "sin", "sqrt", "tan", "trunc",
                ],
                values: &["E", "LN10", "LN2", "LOG10E", "LOG2E", "PI", "SQRT1_2", "SQRT2"],
                ..NONE
            },
        );
        self.namespace(
            "JSON",
            &Members {
                methods: &["parse", "stringify"],
                ..NONE
            },
        );

        let global = self.graph.global();
        self.fill(
            global,
            &Members {
                methods: &[
                    "decodeURI",
                    "decodeURIComponent",
                    "encodeURI",
                    "encodeURIComponent",
                    "eval",
                    "isFinite",
                    "isNaN",
                    "parseFloat",
                    "parseInt",
                ],
                values: &["Infinity", "NaN", "undefined"],
                ..NONE
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> AnalysisLimits {
        AnalysisLimits::default()
    }

    fn intent(kind: IntentKind, chain: &[&str]) -> Intent {
        Intent::new(kind, chain.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn global_identifiers() {
        let graph = ObjectGraph::ecmascript();
        let set = sandbox_completions(&graph, &intent(IntentKind::Identifier, &["par"]), &limits());
        assert_eq!(set.displays(), ["parseFloat", "parseInt"]);
        assert!(set.iter().all(|c| c.score == SANDBOX_SCORE));
    }

    #[test]
    fn inherited_members_are_listed() {
        let graph = ObjectGraph::ecmascript();
        let set = sandbox_completions(&graph, &intent(IntentKind::Property, &["Math"]), &limits());
        assert!(set.contains("floor"));
        // from Object.prototype
        assert!(set.contains("hasOwnProperty"));
    }

    #[test]
    fn string_intents_start_at_string_prototype() {
        let graph = ObjectGraph::ecmascript();
        let set = sandbox_completions(&graph, &intent(IntentKind::String, &["toU"]), &limits());
        assert_eq!(set.displays(), ["toUpperCase"]);
    }

    #[test]
    fn accessors_are_listed_but_never_followed() {
        let graph = ObjectGraph::ecmascript();
        let set = sandbox_completions(&graph, &intent(IntentKind::Regex, &[]), &limits());
        assert!(set.contains("source"));
        assert!(set.contains("test"));

        let regexp = builtin_prototype(&graph, "RegExp", &limits()).unwrap();
        assert_eq!(get(&graph, regexp, "source", &limits()), None);
        let set = sandbox_completions(&graph, &intent(IntentKind::Regex, &["source", ""]), &limits());
        assert!(set.is_empty());
    }

    #[test]
    fn custom_graph_stops_at_accessor_branches() {
        let mut graph = ObjectGraph::new();
        let global = graph.global();
        let app = graph.object(None);
        let config = graph.object(None);
        graph.set_object(global, "app", app);
        graph.set_accessor(app, "lazy");
        graph.set_object(app, "config", config);
        graph.set_primitive(config, "debug");

        let set = sandbox_completions(&graph, &intent(IntentKind::Property, &["app"]), &limits());
        assert_eq!(set.displays(), ["lazy", "config"]);
        let set = sandbox_completions(&graph, &intent(IntentKind::Property, &["app", "lazy"]), &limits());
        assert!(set.is_empty());
        let set = sandbox_completions(&graph, &intent(IntentKind::Identifier, &["app", "config", "d"]), &limits());
        assert_eq!(set.displays(), ["debug"]);
    }

    #[test]
    fn prototype_cycles_terminate() {
        let mut graph = ObjectGraph::new();
        let a = graph.object(None);
        let b = graph.object(Some(a));
        graph.objects[a.0].prototype = Some(b);
        graph.set_primitive(a, "x");
        let names = property_names(&graph, b, &limits());
        assert_eq!(names.len(), 1);
        assert_eq!(get(&graph, b, "missing", &limits()), None);
    }
}
