//! Cache key derivation.
//!
//! Every cached value lives in a hash *name* scoping one entity
//! (`<prefix>:entry:<model>:<id>`) under a hash *field* encoding the
//! operation and its parameters (`op`, or `op?a=1&b=2` with parameters
//! sorted by name). The field encoding is canonical: equivalent calls map
//! to the same field regardless of the order parameters were supplied in.

use herd_core::{HerdError, HerdResult};
use std::collections::BTreeMap;
use std::fmt;

/// Parameter map feeding the field encoding. Ordered, so the canonical
/// sorted rendering falls out of iteration order.
pub type Params = BTreeMap<String, String>;

/// Implemented by persisted entities that know their own cache identity.
pub trait CacheEntity {
    /// Logical entity-type name (typically the table or resource name).
    fn cache_model(&self) -> &str;

    /// Unique id of this instance, rendered for key composition.
    fn cache_id(&self) -> String;
}

/// Key builder scoped to a namespace prefix.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    prefix: String,
}

impl KeyBuilder {
    /// Create a new key builder with the given namespace prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Hash name holding every cached operation for one entity.
    pub fn entity(&self, model: &str, id: &str) -> HerdResult<String> {
        ensure_component(model, "entity model")?;
        ensure_component(id, "entity id")?;
        Ok(format!("{}:entry:{}:{}", self.prefix, model, id))
    }

    /// Lock resource guarding recomputation of one memo key.
    ///
    /// Locks live beside the entries, not under them, so clearing the
    /// namespace never deletes a lock someone is holding.
    pub fn lock(&self, model: &str, id: &str, field: &str) -> HerdResult<String> {
        ensure_component(model, "entity model")?;
        ensure_component(id, "entity id")?;
        ensure_component(field, "cache field")?;
        Ok(format!("{}:lock:{}:{}:{}", self.prefix, model, id, field))
    }

    /// SCAN pattern covering every entry under this namespace.
    #[must_use]
    pub fn namespace_pattern(&self) -> String {
        format!("{}:entry:*", self.prefix)
    }
}

impl Default for KeyBuilder {
    fn default() -> Self {
        Self::new("herd:cache")
    }
}

fn ensure_component(value: &str, what: &str) -> HerdResult<()> {
    if value.is_empty() {
        return Err(HerdError::invalid_key(format!("{} is empty", what)));
    }
    Ok(())
}

/// Canonical hash field for an operation and its parameters.
pub fn encode_field(op: &str, params: &Params) -> HerdResult<String> {
    ensure_component(op, "operation name")?;
    if params.is_empty() {
        return Ok(op.to_string());
    }
    let joined = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    Ok(format!("{}?{}", op, joined))
}

/// Keeps only the allow-listed parameter names.
///
/// A missing allow-listed name is a caller bug and fails immediately.
pub fn select_params(params: &Params, allow: &[&str]) -> HerdResult<Params> {
    let mut selected = Params::new();
    for name in allow {
        match params.get(*name) {
            Some(value) => {
                selected.insert((*name).to_string(), value.clone());
            }
            None => return Err(HerdError::missing_param(*name)),
        }
    }
    Ok(selected)
}

/// Fully-derived identity of one memoized value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoKey {
    /// Entity-type name.
    pub model: String,
    /// Entity id.
    pub id: String,
    /// Operation name.
    pub op: String,
    /// Parameters participating in the field encoding.
    pub params: Params,
}

impl MemoKey {
    /// Create a memo key for an explicit entity-type and id.
    pub fn new(model: impl Into<String>, id: impl ToString, op: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            id: id.to_string(),
            op: op.into(),
            params: Params::new(),
        }
    }

    /// Create a memo key from an entity that knows its own identity.
    pub fn for_entity<E: CacheEntity + ?Sized>(entity: &E, op: impl Into<String>) -> Self {
        Self::new(entity.cache_model(), entity.cache_id(), op)
    }

    /// Create a memo key only when an entity id could be determined.
    ///
    /// `None` means the call cannot be cached and executes directly.
    pub fn maybe(
        model: impl Into<String>,
        id: Option<impl ToString>,
        op: impl Into<String>,
    ) -> Option<Self> {
        id.map(|id| Self::new(model, id, op))
    }

    /// Add one parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(name.into(), value.to_string());
        self
    }

    /// Merge a parameter map into this key (sub-mappings flatten here).
    #[must_use]
    pub fn params(mut self, params: Params) -> Self {
        self.params.extend(params);
        self
    }

    /// Restrict the parameter set to an allow-list.
    pub fn select_params(mut self, allow: &[&str]) -> HerdResult<Self> {
        self.params = select_params(&self.params, allow)?;
        Ok(self)
    }

    /// Canonical hash field for this key.
    pub fn field(&self) -> HerdResult<String> {
        encode_field(&self.op, &self.params)
    }
}

impl fmt::Display for MemoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.model, self.id, self.op)
    }
}
