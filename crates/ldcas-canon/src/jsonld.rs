//! JSON-LD to RDF conversion feeding the graph canonicalizer.
//!
//! Covers the JSON-LD 1.0 toRdf surface that documents in this store use:
//! inline, array and remote contexts, `@vocab`, `@language`, term
//! definitions with `@id`, `@type` and `@container: @list`, compact IRIs,
//! keyword aliases, `@id`, `@type`, value objects, `@list`, `@set` and
//! `@graph`. Relative IRIs resolve against no base and are dropped, as the
//! toRdf algorithm does when the document has no base IRI.
//!
//! Features that would change the dataset but are not handled here
//! (`@reverse`, `@nest`, `@included`, scoped contexts, `@import`) fail with
//! [`GraphError::Algorithm`] rather than produce a different graph.

use std::collections::{BTreeMap, HashMap, HashSet};

use oxrdf::vocab::{rdf, xsd};
use oxrdf::{BlankNode, Dataset, GraphName, Literal, NamedNode, Quad, Subject, Term};
use serde_json::{Map, Value};

use crate::graph::GraphError;

/// Nested remote context loads allowed before giving up.
const MAX_CONTEXT_LOADS: usize = 16;

/// Resolves remote `@context` IRIs to context documents.
///
/// Loaders may block. The returned document is either a JSON-LD document
/// with a top-level `@context` member or the context value itself.
pub trait ContextLoader: Send + Sync {
    fn load(&self, iri: &str) -> Result<Value, GraphError>;
}

/// Contexts served from memory.
///
/// [`BundledContexts::new`] knows schema.org under its common IRIs, mapped to
/// `@vocab: http://schema.org/` with the `id`/`type` keyword aliases the
/// published context declares.
#[derive(Clone, Debug, Default)]
pub struct BundledContexts {
    contexts: BTreeMap<String, Value>,
}

impl BundledContexts {
    pub fn new() -> Self {
        let schema_org = serde_json::json!({
            "@vocab": "http://schema.org/",
            "schema": "http://schema.org/",
            "id": "@id",
            "type": "@type",
        });
        let mut bundled = Self::empty();
        for iri in [
            "https://schema.org",
            "https://schema.org/",
            "http://schema.org",
            "http://schema.org/",
            "https://schema.org/docs/jsonldcontext.json",
            "https://schema.org/docs/jsonldcontext.jsonld",
        ] {
            bundled.contexts.insert(iri.to_string(), schema_org.clone());
        }
        bundled
    }

    /// A loader that knows no contexts.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Serve `context` for `iri`.
    pub fn with_context(mut self, iri: impl Into<String>, context: Value) -> Self {
        self.contexts.insert(iri.into(), context);
        self
    }

    pub fn contains(&self, iri: &str) -> bool {
        self.contexts.contains_key(iri)
    }
}

impl ContextLoader for BundledContexts {
    fn load(&self, iri: &str) -> Result<Value, GraphError> {
        self.contexts
            .get(iri)
            .cloned()
            .ok_or_else(|| GraphError::Context(format!("no context available for {iri}")))
    }
}

/// Convert a parsed JSON-LD document into an RDF dataset.
///
/// Returns `Ok(None)` when the document is neither an object nor an array
/// and so has no graph reading at all.
pub fn to_dataset(doc: &Value, loader: &dyn ContextLoader) -> Result<Option<Dataset>, GraphError> {
    let mut conv = Converter {
        loader,
        dataset: Dataset::new(),
        blanks: HashMap::new(),
        loads: 0,
    };
    let root = Context::default();
    match doc {
        Value::Object(map) => {
            let ctx = conv.local_context(&root, map)?;
            if is_bare_graph_container(map, &ctx) {
                if let Some(graph) = keyword_value(map, &ctx, "@graph") {
                    conv.nodes(&ctx, graph, &GraphName::DefaultGraph)?;
                }
            } else {
                conv.node_in(&ctx, map, &GraphName::DefaultGraph)?;
            }
        }
        Value::Array(_) => conv.nodes(&root, doc, &GraphName::DefaultGraph)?,
        _ => return Ok(None),
    }
    Ok(Some(conv.dataset))
}

/// The active context.
#[derive(Clone, Debug, Default)]
struct Context {
    vocab: Option<String>,
    language: Option<String>,
    terms: HashMap<String, Option<TermDef>>,
}

/// A term definition. `None` in [`Context::terms`] marks a term explicitly
/// mapped to null.
#[derive(Clone, Debug, PartialEq, Eq)]
struct TermDef {
    iri: String,
    coerce: Option<Coerce>,
    list: bool,
    language: Option<Option<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Coerce {
    Id,
    Vocab,
    Datatype(String),
}

/// What an object key expands to.
enum Key {
    Keyword(String),
    Property(NamedNode, Option<TermDef>),
    Dropped,
}

struct Converter<'a> {
    loader: &'a dyn ContextLoader,
    dataset: Dataset,
    blanks: HashMap<String, BlankNode>,
    loads: usize,
}

impl Converter<'_> {
    /// The context in effect inside `map`.
    fn local_context(&mut self, active: &Context, map: &Map<String, Value>) -> Result<Context, GraphError> {
        match map.get("@context") {
            Some(local) => self.process_context(active, local),
            None => Ok(active.clone()),
        }
    }

    fn process_context(&mut self, active: &Context, local: &Value) -> Result<Context, GraphError> {
        match local {
            Value::Null => Ok(Context::default()),
            Value::Array(items) => {
                let mut ctx = active.clone();
                for item in items {
                    ctx = self.process_context(&ctx, item)?;
                }
                Ok(ctx)
            }
            Value::String(iri) => {
                self.loads += 1;
                if self.loads > MAX_CONTEXT_LOADS {
                    return Err(GraphError::Context(format!(
                        "more than {MAX_CONTEXT_LOADS} remote contexts while loading {iri}"
                    )));
                }
                let loaded = self.loader.load(iri)?;
                let inner = match &loaded {
                    Value::Object(map) if map.contains_key("@context") => &map["@context"],
                    other => other,
                };
                self.process_context(active, inner)
            }
            Value::Object(defs) => self.define_terms(active, defs),
            other => Err(GraphError::Context(format!("invalid local context: {other}"))),
        }
    }

    fn define_terms(&mut self, active: &Context, defs: &Map<String, Value>) -> Result<Context, GraphError> {
        let mut ctx = active.clone();
        for keyword in ["@import", "@propagate"] {
            if defs.contains_key(keyword) {
                return Err(GraphError::Algorithm(format!("{keyword} is not supported")));
            }
        }
        if defs.get("@base").is_some_and(|base| !base.is_null()) {
            return Err(GraphError::Algorithm("@base is not supported".into()));
        }
        match defs.get("@vocab") {
            Some(Value::Null) => ctx.vocab = None,
            Some(Value::String(v)) => {
                ctx.vocab = Some(if v.contains(':') {
                    v.clone()
                } else {
                    expand_iri(&ctx, v, true).ok_or_else(|| {
                        GraphError::Context(format!("@vocab {v:?} is not an absolute IRI"))
                    })?
                });
            }
            Some(other) => return Err(GraphError::Context(format!("invalid @vocab: {other}"))),
            None => {}
        }
        match defs.get("@language") {
            Some(Value::Null) => ctx.language = None,
            Some(Value::String(tag)) => ctx.language = Some(tag.to_lowercase()),
            Some(other) => return Err(GraphError::Context(format!("invalid @language: {other}"))),
            None => {}
        }

        let mut defining = HashSet::new();
        for term in defs.keys() {
            if !term.starts_with('@') {
                define_term(&mut ctx, defs, term, &mut defining)?;
            }
        }
        Ok(ctx)
    }

    fn blank(&mut self, label: &str) -> BlankNode {
        let next = self.blanks.len();
        self.blanks
            .entry(label.to_string())
            .or_insert_with(|| BlankNode::new_unchecked(format!("b{next}")))
            .clone()
    }

    fn fresh_blank(&mut self) -> BlankNode {
        let label = format!("\u{0}generated{}", self.blanks.len());
        self.blank(&label)
    }

    /// A node reference from an `@id` or an IRI-coerced string.
    fn reference(&mut self, ctx: &Context, value: &str, vocab: bool) -> Option<Subject> {
        let iri = expand_iri(ctx, value, vocab)?;
        if let Some(label) = iri.strip_prefix("_:") {
            return Some(self.blank(label).into());
        }
        NamedNode::new(iri).ok().map(Subject::from)
    }

    fn nodes(&mut self, ctx: &Context, value: &Value, graph: &GraphName) -> Result<(), GraphError> {
        match value {
            Value::Array(items) => {
                for item in items {
                    self.nodes(ctx, item, graph)?;
                }
                Ok(())
            }
            Value::Object(map) => self.node(ctx, map, graph).map(|_| ()),
            _ => Ok(()),
        }
    }

    /// Emit the quads of one node object and return its subject.
    ///
    /// A subject that does not expand to an IRI or blank node yields `None`;
    /// its own triples are skipped but embedded nodes are still emitted.
    fn node(
        &mut self,
        active: &Context,
        map: &Map<String, Value>,
        graph: &GraphName,
    ) -> Result<Option<Subject>, GraphError> {
        let ctx = self.local_context(active, map)?;
        self.node_in(&ctx, map, graph)
    }

    /// [`Converter::node`] with the node's own context already applied.
    fn node_in(
        &mut self,
        ctx: &Context,
        map: &Map<String, Value>,
        graph: &GraphName,
    ) -> Result<Option<Subject>, GraphError> {
        let keys: Vec<(Key, &Value)> = map
            .iter()
            .filter(|(k, _)| k.as_str() != "@context")
            .map(|(k, v)| (expand_key(ctx, k), v))
            .collect();

        let subject = match keys.iter().find_map(|(k, v)| match k {
            Key::Keyword(kw) if kw == "@id" => Some(*v),
            _ => None,
        }) {
            Some(Value::String(id)) => self.reference(ctx, id, false),
            Some(other) => return Err(GraphError::Algorithm(format!("invalid @id: {other}"))),
            None => Some(self.fresh_blank().into()),
        };

        for (key, value) in &keys {
            match key {
                Key::Keyword(kw) => match kw.as_str() {
                    "@id" | "@index" | "@context" => {}
                    "@type" => {
                        for ty in as_list(value) {
                            let Value::String(ty) = ty else {
                                return Err(GraphError::Algorithm(format!("invalid @type: {ty}")));
                            };
                            if let (Some(s), Some(object)) = (&subject, self.reference(ctx, ty, true)) {
                                self.emit(s.clone(), rdf::TYPE.into(), object.into(), graph);
                            }
                        }
                    }
                    "@graph" => {
                        let name = match &subject {
                            Some(Subject::NamedNode(n)) => GraphName::NamedNode(n.clone()),
                            Some(Subject::BlankNode(b)) => GraphName::BlankNode(b.clone()),
                            _ => continue,
                        };
                        self.nodes(ctx, value, &name)?;
                    }
                    "@reverse" | "@nest" | "@included" => {
                        return Err(GraphError::Algorithm(format!("{kw} is not supported")));
                    }
                    "@value" | "@list" | "@set" | "@language" => {
                        return Err(GraphError::Algorithm(format!("{kw} is not valid in a node object")));
                    }
                    _ => {}
                },
                Key::Property(predicate, term) => {
                    self.property(ctx, subject.as_ref(), predicate, term.as_ref(), value, graph)?;
                }
                Key::Dropped => {}
            }
        }
        Ok(subject)
    }

    fn property(
        &mut self,
        ctx: &Context,
        subject: Option<&Subject>,
        predicate: &NamedNode,
        term: Option<&TermDef>,
        value: &Value,
        graph: &GraphName,
    ) -> Result<(), GraphError> {
        if term.is_some_and(|t| t.list) {
            let items = match value {
                Value::Object(map) if map.contains_key("@list") => as_list(&map["@list"]),
                other => as_list(other),
            };
            let head = self.list(ctx, term, &items, graph)?;
            if let Some(s) = subject {
                self.emit(s.clone(), predicate.clone(), head, graph);
            }
            return Ok(());
        }
        for item in flatten(value) {
            if let Some(object) = self.object(ctx, term, item, graph)? {
                if let Some(s) = subject {
                    self.emit(s.clone(), predicate.clone(), object, graph);
                }
            }
        }
        Ok(())
    }

    /// The RDF term for one property value, emitting any quads it implies.
    fn object(
        &mut self,
        ctx: &Context,
        term: Option<&TermDef>,
        value: &Value,
        graph: &GraphName,
    ) -> Result<Option<Term>, GraphError> {
        let coerce = term.and_then(|t| t.coerce.as_ref());
        match value {
            Value::Null => Ok(None),
            Value::Object(map) => {
                let value_ctx = self.local_context(ctx, map)?;
                if let Some(inner) = keyword_value(map, &value_ctx, "@value") {
                    return value_object(&value_ctx, map, inner);
                }
                if let Some(items) = keyword_value(map, &value_ctx, "@list") {
                    let items = as_list(items);
                    return self.list(ctx, term, &items, graph).map(Some);
                }
                Ok(self.node(ctx, map, graph)?.map(Term::from))
            }
            Value::String(s) => match coerce {
                Some(Coerce::Id) => Ok(self.reference(ctx, s, false).map(Term::from)),
                Some(Coerce::Vocab) => Ok(self.reference(ctx, s, true).map(Term::from)),
                Some(Coerce::Datatype(dt)) => typed(s, dt).map(Some),
                None => {
                    let language = match term.and_then(|t| t.language.clone()) {
                        Some(explicit) => explicit,
                        None => ctx.language.clone(),
                    };
                    match language {
                        Some(tag) => Literal::new_language_tagged_literal(s.as_str(), tag)
                            .map(|l| Some(l.into()))
                            .map_err(|e| GraphError::Algorithm(e.to_string())),
                        None => Ok(Some(Literal::new_simple_literal(s.as_str()).into())),
                    }
                }
            },
            Value::Bool(b) => {
                let dt = datatype_or(coerce, xsd::BOOLEAN.as_str());
                typed(if *b { "true" } else { "false" }, &dt).map(Some)
            }
            Value::Number(n) => {
                let (lexical, natural) = number_lexical(n);
                let dt = datatype_or(coerce, natural);
                typed(&lexical, &dt).map(Some)
            }
            Value::Array(_) => Err(GraphError::Algorithm("nested array outside @list".into())),
        }
    }

    /// Emit an RDF collection and return its head.
    fn list(
        &mut self,
        ctx: &Context,
        term: Option<&TermDef>,
        items: &[&Value],
        graph: &GraphName,
    ) -> Result<Term, GraphError> {
        let item_term = term.map(without_list);
        let mut objects = Vec::new();
        for item in items {
            if let Some(object) = self.object(ctx, item_term.as_ref(), item, graph)? {
                objects.push(object);
            }
        }
        let cells: Vec<BlankNode> = objects.iter().map(|_| self.fresh_blank()).collect();
        for (i, (cell, object)) in cells.iter().zip(objects).enumerate() {
            self.emit(cell.clone().into(), rdf::FIRST.into(), object, graph);
            let rest: Term = match cells.get(i + 1) {
                Some(next) => next.clone().into(),
                None => rdf::NIL.into_owned().into(),
            };
            self.emit(cell.clone().into(), rdf::REST.into(), rest, graph);
        }
        Ok(match cells.first() {
            Some(head) => head.clone().into(),
            None => rdf::NIL.into_owned().into(),
        })
    }

    fn emit(&mut self, subject: Subject, predicate: NamedNode, object: Term, graph: &GraphName) {
        self.dataset
            .insert(&Quad::new(subject, predicate, object, graph.clone()));
    }
}

/// Create the definition for `term` in `ctx`, defining its dependencies
/// from the same local context first.
fn define_term(
    ctx: &mut Context,
    defs: &Map<String, Value>,
    term: &str,
    defining: &mut HashSet<String>,
) -> Result<(), GraphError> {
    if !defining.insert(term.to_string()) {
        // Already defined in this pass, or a cycle; cycles surface below as
        // an IRI that never becomes absolute.
        return Ok(());
    }
    let definition = &defs[term];
    let (raw_id, coerce, list, language) = match definition {
        Value::Null => {
            ctx.terms.insert(term.to_string(), None);
            return Ok(());
        }
        Value::String(id) => (Some(id.as_str()), None, false, None),
        Value::Object(def) => {
            if def.contains_key("@context") || def.contains_key("@reverse") {
                return Err(GraphError::Algorithm(format!(
                    "term {term:?} uses an unsupported definition"
                )));
            }
            let raw_id = match def.get("@id") {
                Some(Value::String(id)) => Some(id.as_str()),
                Some(Value::Null) => {
                    ctx.terms.insert(term.to_string(), None);
                    return Ok(());
                }
                None => None,
                Some(other) => {
                    return Err(GraphError::Context(format!("invalid @id for {term:?}: {other}")))
                }
            };
            let coerce = match def.get("@type") {
                None => None,
                Some(Value::String(ty)) if ty == "@id" => Some(Coerce::Id),
                Some(Value::String(ty)) if ty == "@vocab" => Some(Coerce::Vocab),
                Some(Value::String(ty)) => {
                    depend_on_prefix(ctx, defs, ty, defining)?;
                    let dt = expand_iri(ctx, ty, true).filter(|iri| is_absolute(iri)).ok_or_else(|| {
                        GraphError::Context(format!("invalid @type for {term:?}: {ty:?}"))
                    })?;
                    Some(Coerce::Datatype(dt))
                }
                Some(other) => {
                    return Err(GraphError::Context(format!("invalid @type for {term:?}: {other}")))
                }
            };
            let list = match def.get("@container") {
                Some(Value::String(c)) if c == "@list" => true,
                Some(Value::String(c)) if c == "@set" || c == "@index" || c == "@language" => false,
                None | Some(Value::Null) => false,
                Some(other) => {
                    return Err(GraphError::Algorithm(format!(
                        "container {other} on {term:?} is not supported"
                    )))
                }
            };
            let language = match def.get("@language") {
                None => None,
                Some(Value::Null) => Some(None),
                Some(Value::String(tag)) => Some(Some(tag.to_lowercase())),
                Some(other) => {
                    return Err(GraphError::Context(format!("invalid @language for {term:?}: {other}")))
                }
            };
            (raw_id, coerce, list, language)
        }
        other => return Err(GraphError::Context(format!("invalid definition for {term:?}: {other}"))),
    };

    let iri = match raw_id {
        Some(id) if id.starts_with('@') => id.to_string(),
        Some(id) => {
            depend_on_prefix(ctx, defs, id, defining)?;
            expand_iri(ctx, id, true).unwrap_or_else(|| id.to_string())
        }
        None => {
            depend_on_prefix(ctx, defs, term, defining)?;
            match expand_iri(ctx, term, true) {
                Some(iri) if iri != term || term.contains(':') => iri,
                _ => {
                    return Err(GraphError::Context(format!(
                        "term {term:?} has no @id and no @vocab to expand it"
                    )))
                }
            }
        }
    };
    ctx.terms.insert(
        term.to_string(),
        Some(TermDef {
            iri,
            coerce,
            list,
            language,
        }),
    );
    Ok(())
}

/// Define the prefix of a compact IRI first when the same local context
/// declares it.
fn depend_on_prefix(
    ctx: &mut Context,
    defs: &Map<String, Value>,
    value: &str,
    defining: &mut HashSet<String>,
) -> Result<(), GraphError> {
    if let Some((prefix, _)) = value.split_once(':') {
        if defs.contains_key(prefix) {
            define_term(ctx, defs, prefix, defining)?;
        }
    } else if defs.contains_key(value) {
        define_term(ctx, defs, value, defining)?;
    }
    Ok(())
}

/// IRI expansion against the active context.
///
/// Returns keywords unchanged, `_:` labels unchanged, and `None` for values
/// that stay relative or are mapped to null.
fn expand_iri(ctx: &Context, value: &str, vocab: bool) -> Option<String> {
    if value.starts_with('@') {
        return Some(value.to_string());
    }
    if vocab {
        if let Some(def) = ctx.terms.get(value) {
            return def.as_ref().map(|t| t.iri.clone());
        }
    }
    if let Some((prefix, suffix)) = value.split_once(':') {
        if prefix == "_" || suffix.starts_with("//") {
            return Some(value.to_string());
        }
        if let Some(Some(def)) = ctx.terms.get(prefix) {
            return Some(format!("{}{suffix}", def.iri));
        }
        return Some(value.to_string());
    }
    match (&ctx.vocab, vocab) {
        (Some(base), true) => Some(format!("{base}{value}")),
        _ => None,
    }
}

fn is_absolute(iri: &str) -> bool {
    iri.contains(':') && !iri.starts_with("_:")
}

fn expand_key(ctx: &Context, key: &str) -> Key {
    match expand_iri(ctx, key, true) {
        Some(iri) if iri.starts_with('@') => Key::Keyword(iri),
        Some(iri) if is_absolute(&iri) => match NamedNode::new(iri) {
            Ok(node) => Key::Property(node, ctx.terms.get(key).cloned().flatten()),
            Err(_) => Key::Dropped,
        },
        _ => Key::Dropped,
    }
}

/// The value under `keyword` or any alias of it.
fn keyword_value<'v>(map: &'v Map<String, Value>, ctx: &Context, keyword: &str) -> Option<&'v Value> {
    map.iter()
        .find(|(k, _)| k.as_str() == keyword || expand_iri(ctx, k, true).as_deref() == Some(keyword))
        .map(|(_, v)| v)
}

/// A top-level object holding only `@context` and `@graph` describes the
/// default graph rather than a node.
fn is_bare_graph_container(map: &Map<String, Value>, ctx: &Context) -> bool {
    keyword_value(map, ctx, "@graph").is_some()
        && map.keys().all(|k| {
            matches!(
                expand_iri(ctx, k, true).as_deref(),
                Some("@context" | "@graph")
            ) || k == "@context"
        })
}

fn value_object(ctx: &Context, map: &Map<String, Value>, inner: &Value) -> Result<Option<Term>, GraphError> {
    let datatype = keyword_value(map, ctx, "@type")
        .and_then(Value::as_str)
        .and_then(|ty| expand_iri(ctx, ty, true))
        .filter(|iri| is_absolute(iri));
    let language = keyword_value(map, ctx, "@language").and_then(Value::as_str);
    let literal = match (inner, datatype, language) {
        (Value::Null, _, _) => return Ok(None),
        (Value::String(s), None, Some(tag)) => {
            Literal::new_language_tagged_literal(s.as_str(), tag.to_lowercase())
                .map_err(|e| GraphError::Algorithm(e.to_string()))?
        }
        (Value::String(s), Some(dt), _) => return typed(s, &dt).map(Some),
        (Value::String(s), None, None) => Literal::new_simple_literal(s.as_str()),
        (Value::Bool(b), dt, _) => {
            let dt = dt.unwrap_or_else(|| xsd::BOOLEAN.as_str().to_string());
            return typed(if *b { "true" } else { "false" }, &dt).map(Some);
        }
        (Value::Number(n), dt, _) => {
            let (lexical, natural) = number_lexical(n);
            let dt = dt.unwrap_or_else(|| natural.to_string());
            return typed(&lexical, &dt).map(Some);
        }
        (other, _, _) => {
            return Err(GraphError::Algorithm(format!("invalid @value: {other}")));
        }
    };
    Ok(Some(literal.into()))
}

fn typed(lexical: &str, datatype: &str) -> Result<Term, GraphError> {
    let dt = NamedNode::new(datatype).map_err(|e| GraphError::Algorithm(e.to_string()))?;
    Ok(Literal::new_typed_literal(lexical, dt).into())
}

fn datatype_or(coerce: Option<&Coerce>, natural: &str) -> String {
    match coerce {
        Some(Coerce::Datatype(dt)) => dt.clone(),
        _ => natural.to_string(),
    }
}

/// Lexical form and natural datatype of a JSON number.
///
/// Integral values below 10^21 are `xsd:integer`; everything else is
/// `xsd:double` in canonical `1.5E0` form.
fn number_lexical(n: &serde_json::Number) -> (String, &'static str) {
    if let Some(i) = n.as_i64() {
        return (i.to_string(), xsd::INTEGER.as_str());
    }
    if let Some(u) = n.as_u64() {
        return (u.to_string(), xsd::INTEGER.as_str());
    }
    let f = n.as_f64().unwrap_or(0.0);
    if f == 0.0 {
        return ("0".to_string(), xsd::INTEGER.as_str());
    }
    if f.fract() == 0.0 && f.abs() < 1e21 {
        return (format!("{f:.0}"), xsd::INTEGER.as_str());
    }
    let text = format!("{f:E}");
    let text = match text.split_once('E') {
        Some((mantissa, exp)) if !mantissa.contains('.') => format!("{mantissa}.0E{exp}"),
        _ => text,
    };
    (text, xsd::DOUBLE.as_str())
}

fn without_list(term: &TermDef) -> TermDef {
    TermDef {
        list: false,
        ..term.clone()
    }
}

fn as_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// Property values with arrays and `@set` objects flattened, nulls skipped.
fn flatten(value: &Value) -> Vec<&Value> {
    let mut out = Vec::new();
    let mut stack = vec![value];
    while let Some(v) = stack.pop() {
        match v {
            Value::Array(items) => stack.extend(items.iter().rev()),
            Value::Object(map) if map.len() == 1 && map.contains_key("@set") => {
                stack.push(&map["@set"]);
            }
            Value::Null => {}
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn quads(doc: Value) -> Vec<String> {
        let dataset = to_dataset(&doc, &BundledContexts::new()).unwrap().unwrap();
        let mut lines: Vec<String> = dataset.iter().map(|q| q.to_string()).collect();
        lines.sort();
        lines
    }

    #[test]
    fn schema_org_terms_expand_under_vocab() {
        let lines = quads(json!({"@context": "https://schema.org", "@id": "http://ex.org/a", "name": "Test"}));
        assert_eq!(lines, vec![r#"<http://ex.org/a> <http://schema.org/name> "Test""#]);
    }

    #[test]
    fn inline_terms_and_coercion() {
        let lines = quads(json!({
            "@context": {
                "foaf": "http://xmlns.com/foaf/0.1/",
                "knows": {"@id": "foaf:knows", "@type": "@id"},
                "age": {"@id": "foaf:age", "@type": "http://www.w3.org/2001/XMLSchema#integer"}
            },
            "@id": "http://ex.org/a",
            "knows": "http://ex.org/b",
            "age": "42",
            "foaf:nick": "ann"
        }));
        assert_eq!(
            lines,
            vec![
                r#"<http://ex.org/a> <http://xmlns.com/foaf/0.1/age> "42"^^<http://www.w3.org/2001/XMLSchema#integer>"#,
                r#"<http://ex.org/a> <http://xmlns.com/foaf/0.1/knows> <http://ex.org/b>"#,
                r#"<http://ex.org/a> <http://xmlns.com/foaf/0.1/nick> "ann""#,
            ]
        );
    }

    #[test]
    fn undefined_terms_are_dropped() {
        let doc = json!({"@context": {"name": "http://schema.org/name"}, "name": "x", "other": "y"});
        let dataset = to_dataset(&doc, &BundledContexts::empty()).unwrap().unwrap();
        assert_eq!(dataset.len(), 1);
    }

    #[test]
    fn null_context_yields_an_empty_dataset() {
        let doc = json!({"@context": null, "name": "x"});
        let dataset = to_dataset(&doc, &BundledContexts::new()).unwrap().unwrap();
        assert!(dataset.is_empty());
    }

    #[test]
    fn native_types_get_xsd_datatypes() {
        let lines = quads(json!({
            "@context": {"@vocab": "http://ex.org/"},
            "@id": "http://ex.org/s",
            "i": 5,
            "d": 2.5,
            "b": true
        }));
        assert_eq!(
            lines,
            vec![
                r#"<http://ex.org/s> <http://ex.org/b> "true"^^<http://www.w3.org/2001/XMLSchema#boolean>"#,
                r#"<http://ex.org/s> <http://ex.org/d> "2.5E0"^^<http://www.w3.org/2001/XMLSchema#double>"#,
                r#"<http://ex.org/s> <http://ex.org/i> "5"^^<http://www.w3.org/2001/XMLSchema#integer>"#,
            ]
        );
    }

    #[test]
    fn keyword_aliases_and_types() {
        let lines = quads(json!({
            "@context": "https://schema.org",
            "id": "http://ex.org/p",
            "type": "Person"
        }));
        assert_eq!(
            lines,
            vec![r#"<http://ex.org/p> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://schema.org/Person>"#]
        );
    }

    #[test]
    fn lists_become_collections() {
        let doc = json!({
            "@context": {"items": {"@id": "http://ex.org/items", "@container": "@list"}},
            "@id": "http://ex.org/s",
            "items": ["a", "b"]
        });
        let dataset = to_dataset(&doc, &BundledContexts::empty()).unwrap().unwrap();
        // One link, then first/rest per cell.
        assert_eq!(dataset.len(), 5);
    }

    #[test]
    fn graph_container_at_top_level_is_the_default_graph() {
        let lines = quads(json!({
            "@context": {"@vocab": "http://ex.org/"},
            "@graph": [
                {"@id": "http://ex.org/a", "p": "1"},
                {"@id": "http://ex.org/b", "p": "2"}
            ]
        }));
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.matches('<').count() == 2));
    }

    #[test]
    fn named_graphs_use_the_node_id() {
        let doc = json!({
            "@context": {"@vocab": "http://ex.org/"},
            "@id": "http://ex.org/g",
            "label": "g",
            "@graph": {"@id": "http://ex.org/a", "p": "1"}
        });
        let dataset = to_dataset(&doc, &BundledContexts::empty()).unwrap().unwrap();
        let named = dataset
            .iter()
            .filter(|q| q.graph_name.to_string() == "<http://ex.org/g>")
            .count();
        assert_eq!(named, 1);
        assert_eq!(dataset.len(), 2);
    }

    #[test]
    fn blank_labels_are_shared_within_a_document() {
        let doc = json!({
            "@context": {"@vocab": "http://ex.org/", "knows": {"@id": "http://ex.org/knows", "@type": "@id"}},
            "@graph": [
                {"@id": "_:a", "knows": "_:b"},
                {"@id": "_:b", "knows": "_:a"}
            ]
        });
        let dataset = to_dataset(&doc, &BundledContexts::empty()).unwrap().unwrap();
        let subjects: HashSet<String> = dataset.iter().map(|q| q.subject.to_string()).collect();
        assert_eq!(dataset.len(), 2);
        assert_eq!(subjects.len(), 2);
    }

    #[test]
    fn unknown_remote_context_fails() {
        let doc = json!({"@context": "https://unreachable.example/ctx", "name": "x"});
        let err = to_dataset(&doc, &BundledContexts::new()).unwrap_err();
        assert!(matches!(err, GraphError::Context(_)));
    }

    #[test]
    fn registered_contexts_load() {
        let loader = BundledContexts::empty().with_context(
            "https://example.org/ctx",
            json!({"@context": {"title": "http://purl.org/dc/terms/title"}}),
        );
        assert!(loader.contains("https://example.org/ctx"));
        let doc = json!({"@context": "https://example.org/ctx", "title": "x"});
        let dataset = to_dataset(&doc, &loader).unwrap().unwrap();
        assert_eq!(dataset.len(), 1);
    }

    #[test]
    fn self_referencing_contexts_stop() {
        struct Looping;
        impl ContextLoader for Looping {
            fn load(&self, iri: &str) -> Result<Value, GraphError> {
                Ok(json!({"@context": iri}))
            }
        }
        let doc = json!({"@context": "https://loop.example/", "a": 1});
        assert!(matches!(to_dataset(&doc, &Looping), Err(GraphError::Context(_))));
    }

    #[test]
    fn unsupported_keywords_fail_loudly() {
        let doc = json!({"@context": {"@vocab": "http://ex.org/"}, "@reverse": {"p": {"@id": "http://ex.org/x"}}});
        assert!(matches!(
            to_dataset(&doc, &BundledContexts::empty()),
            Err(GraphError::Algorithm(_))
        ));
    }

    #[test]
    fn scalars_have_no_graph() {
        assert!(to_dataset(&json!("text"), &BundledContexts::empty()).unwrap().is_none());
    }

    #[test]
    fn double_lexical_forms() {
        let n = |f: f64| number_lexical(&serde_json::Number::from_f64(f).unwrap()).0;
        assert_eq!(n(2.5), "2.5E0");
        assert_eq!(n(-0.001), "-1.0E-3");
        assert_eq!(n(1e21), "1.0E21");
        assert_eq!(n(3.0), "3");
    }
}
