//! # Expression Evaluator
//!
//! Every node is reduced to a [`Membership`] over catalog positions; only the
//! final set is materialized, in one pass, into track ids. Results are
//! therefore duplicate-free and always in catalog order whatever the operand
//! order was.
//!
//! Named collections are resolved through the [`CollectionStore`]. The names
//! currently being resolved are kept on an explicit stack so a cycle that got
//! into the definitions file by hand is reported as
//! [`StoreError::Cycle`] instead of recursing forever.

use std::collections::HashMap;

use super::ast::{AstNode, ALL};
use super::membership::Membership;
use super::parse_expression;
use crate::catalog::Catalog;
use crate::collections::{Collection, CollectionStore};
use crate::error::{EvalError, StoreError};

/// Evaluates `ast` against `catalog`, resolving collections from `store`.
///
/// # Errors
///
/// - [`EvalError::UnknownReference`] when a name is neither `all`, a stored
///   playlist nor a collection
/// - [`EvalError::Store`] for collection cycles and unparsable stored
///   expressions
pub fn evaluate(
    ast: &AstNode,
    catalog: &Catalog,
    store: &CollectionStore,
) -> Result<Vec<String>, EvalError> {
    Evaluator::new(catalog, store).evaluate(ast)
}

/// Evaluation state for one resolution request.
pub struct Evaluator<'a> {
    catalog: &'a Catalog,
    store: &'a CollectionStore,
    /// Collections on the current resolution path, outermost first.
    in_progress: Vec<String>,
    /// Collections already resolved during this request.
    resolved: HashMap<String, Membership>,
}

impl<'a> Evaluator<'a> {
    pub fn new(catalog: &'a Catalog, store: &'a CollectionStore) -> Self {
        Self {
            catalog,
            store,
            in_progress: Vec::new(),
            resolved: HashMap::new(),
        }
    }

    pub fn evaluate(&mut self, ast: &AstNode) -> Result<Vec<String>, EvalError> {
        let set = self.membership(ast)?;
        Ok(self.materialize(&set))
    }

    /// Resolves the named collection.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the store has no such collection, plus
    /// everything [`evaluate`] can return.
    pub fn resolve_collection(&mut self, name: &str) -> Result<Vec<String>, EvalError> {
        let store = self.store;
        let collection = store
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let set = self.collection(collection)?;
        Ok(self.materialize(&set))
    }

    fn materialize(&self, set: &Membership) -> Vec<String> {
        set.iter()
            .filter_map(|position| self.catalog.track(position))
            .map(|track| track.file.clone())
            .collect()
    }

    fn membership(&mut self, node: &AstNode) -> Result<Membership, EvalError> {
        let len = self.catalog.len();
        match node {
            AstNode::Reference(name) => self.reference(name),
            AstNode::TagFilter { tag, pattern } => Ok(Membership::from_positions(
                len,
                self.catalog
                    .tracks()
                    .iter()
                    .enumerate()
                    .filter(|(_, track)| tag.matches(track, pattern))
                    .map(|(position, _)| position),
            )),
            AstNode::Not(child) => {
                let mut set = self.membership(child)?;
                set.complement();
                Ok(set)
            }
            AstNode::And(left, right) => {
                let mut set = self.membership(left)?;
                set.intersect_with(&self.membership(right)?);
                Ok(set)
            }
            AstNode::Or(left, right) => {
                let mut set = self.membership(left)?;
                set.union_with(&self.membership(right)?);
                Ok(set)
            }
            AstNode::Group(inner) => self.membership(inner),
        }
    }

    fn reference(&mut self, name: &str) -> Result<Membership, EvalError> {
        let len = self.catalog.len();

        if name == ALL {
            return Ok(Membership::full(len));
        }

        if let Some(files) = self.catalog.playlist(name) {
            log::debug!("`{name}` resolved as stored playlist ({} tracks)", files.len());
            return Ok(self.positions_of(files));
        }

        let store = self.store;
        if let Some(collection) = store.get(name) {
            return self.collection(collection);
        }

        Err(EvalError::UnknownReference(name.to_string()))
    }

    fn collection(&mut self, collection: &'a Collection) -> Result<Membership, EvalError> {
        let name = collection.name();

        if let Some(set) = self.resolved.get(name) {
            return Ok(set.clone());
        }

        if let Some(start) = self.in_progress.iter().position(|n| n == name) {
            let mut path = self.in_progress[start..].to_vec();
            path.push(name.to_string());
            return Err(StoreError::Cycle { path }.into());
        }

        let set = if let Some(files) = collection.cached_result() {
            self.positions_of(files)
        } else {
            let parsed;
            let ast = match collection.ast() {
                Some(ast) => ast,
                None => {
                    parsed = parse_expression(collection.expression()).map_err(|source| {
                        StoreError::InvalidExpression { name: name.to_string(), source }
                    })?;
                    &parsed
                }
            };

            self.in_progress.push(name.to_string());
            let result = self.membership(ast);
            self.in_progress.pop();
            result?
        };

        self.resolved.insert(name.to_string(), set.clone());
        Ok(set)
    }

    /// Track ids the catalog does not know are dropped.
    fn positions_of(&self, files: &[String]) -> Membership {
        Membership::from_positions(
            self.catalog.len(),
            files.iter().filter_map(|file| self.catalog.position(file)),
        )
    }
}
