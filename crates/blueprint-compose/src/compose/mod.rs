//! Composition of a Specification into a Definition.
//!
//! # Models
//!
//! Members are composed by a fixed-point loop over string keys. Each pass
//! tries every member that is not in the cache yet. A member whose
//! composition needs a peer that is not composed yet fails with
//! [`ComposeError::CacheMiss`], which defers only that member to the next
//! pass. The loop ends when a pass leaves nothing pending. A pass that adds
//! nothing while members are still pending is an
//! [`ComposeError::InfiniteLoop`].
//!
//! # APIs and populators
//!
//! Composed after every model, against the complete cache, so lookups there
//! never miss.

mod changeset;
mod endpoints;
mod fieldset;
mod globals;
mod models;
mod populators;
mod query;
mod select;

#[cfg(test)]
mod tests;

use blueprint_ast::spec::{ModelSpec, Specification};
use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::definition::{Definition, MemberDefRef};
use crate::error::{ComposeError, ComposeResult};
use crate::path::MemberLookup;

use models::MemberDef;

/// Knobs that change the shape of the Definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeOptions {
    /// Page size of pageable list endpoints
    pub default_page_size: u32,
    /// Give endpoints without a `response` block a select of every field
    pub emit_default_response: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            emit_default_response: true,
        }
    }
}

/// Compose `spec` with a fresh session.
pub fn compose(spec: &Specification, options: &ComposeOptions) -> ComposeResult<Definition> {
    ComposeSession::new(spec, options.clone()).compose()
}

/// State of one composition: the member cache and pass statistics.
///
/// Sessions are never shared; every compilation creates its own.
pub struct ComposeSession<'s> {
    spec: &'s Specification,
    options: ComposeOptions,
    cache: IndexMap<String, MemberDef>,
    passes: usize,
}

impl<'s> ComposeSession<'s> {
    pub fn new(spec: &'s Specification, options: ComposeOptions) -> Self {
        Self {
            spec,
            options,
            cache: IndexMap::new(),
            passes: 0,
        }
    }

    /// Number of model passes the last [`Self::compose_models`] needed.
    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn compose(mut self) -> ComposeResult<Definition> {
        debug!(models = self.spec.models.len(), "composing definition");
        self.compose_models()?;

        let definition = Definition {
            models: self
                .spec
                .models
                .iter()
                .map(|model| self.model_def(model))
                .collect::<ComposeResult<_>>()?,
            apis: self
                .spec
                .apis
                .iter()
                .map(|api| self.api(api))
                .collect::<ComposeResult<_>>()?,
            populators: self
                .spec
                .populators
                .iter()
                .map(|populator| self.populator(populator))
                .collect::<ComposeResult<_>>()?,
            runtimes: self.runtimes(),
            authenticator: self.authenticator()?,
            generators: self.generators(),
            validators: self.validators(),
        };

        debug!(
            passes = self.passes,
            members = self.cache.len(),
            apis = definition.apis.len(),
            "definition composed"
        );
        Ok(definition)
    }

    /// Run model passes until every member is cached.
    pub fn compose_models(&mut self) -> ComposeResult<()> {
        let spec = self.spec;
        let keys: Vec<(&'s str, &'s str)> = spec
            .models
            .iter()
            .flat_map(|model| {
                member_names(model).map(move |member| (model.name.as_str(), member))
            })
            .collect();

        loop {
            self.passes += 1;
            let mut added = 0usize;
            let mut pending = Vec::new();

            for (model, member) in &keys {
                let key = format!("{model}.{member}");
                if self.cache.contains_key(&key) {
                    continue;
                }
                match self.compose_member(model, member) {
                    Ok(def) => {
                        self.cache.insert(key, def);
                        added += 1;
                    }
                    Err(ComposeError::CacheMiss(missing)) => {
                        trace!(member = %key, %missing, "cache miss, deferring");
                        pending.push(key);
                    }
                    Err(err) => return Err(err),
                }
            }

            debug!(pass = self.passes, added, pending = pending.len(), "model pass");
            if pending.is_empty() {
                return Ok(());
            }
            if added == 0 {
                return Err(ComposeError::InfiniteLoop { pending });
            }
        }
    }

    fn model_spec(&self, name: &str) -> ComposeResult<&'s ModelSpec> {
        self.spec
            .model(name)
            .ok_or_else(|| ComposeError::UnknownModel(name.to_string()))
    }

    fn cached(&self, key: &str) -> ComposeResult<MemberDefRef<'_>> {
        self.cache
            .get(key)
            .map(MemberDef::borrowed)
            .ok_or_else(|| ComposeError::CacheMiss(key.to_string()))
    }
}

impl MemberLookup for ComposeSession<'_> {
    fn lookup_member(&self, model: &str, member: &str) -> ComposeResult<MemberDefRef<'_>> {
        let spec = self.model_spec(model)?;
        if !member_names(spec).any(|name| name == member) {
            return Err(ComposeError::UnknownMember(format!("{model}.{member}")));
        }
        self.cached(&format!("{model}.{member}"))
    }
}

/// Every member name of a model spec, in composition order.
fn member_names(model: &ModelSpec) -> impl Iterator<Item = &str> {
    model
        .fields
        .iter()
        .map(|f| f.name.as_str())
        .chain(model.references.iter().map(|r| r.name.as_str()))
        .chain(model.relations.iter().map(|r| r.name.as_str()))
        .chain(model.queries.iter().map(|q| q.name.as_str()))
        .chain(model.computeds.iter().map(|c| c.name.as_str()))
        .chain(model.hooks.iter().map(|h| h.name.as_str()))
}
