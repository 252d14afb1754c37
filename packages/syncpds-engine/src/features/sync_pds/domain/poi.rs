/*
 * Points of Indirection
 *
 * A POI is keyed by (location, base, kind) and collects the origin nodes
 * that met it. Resolutions are recorded in `fired`; delivering a
 * resolution a second time is a no-op.
 *
 * - FieldWrite(f): backward query met `base.f = v` through another base
 * - FieldRead(f):  forward query met `x = base.f` through another base
 * - CallSite:      virtual call on `base` with no known callee
 */

use super::successor::Successor;
use crate::shared::models::{Field, Method, Node, Statement, Val};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PoiKind {
    FieldWrite(Field),
    FieldRead(Field),
    CallSite,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoiKey {
    pub location: Statement,
    pub base: Val,
    pub kind: PoiKind,
}

impl PoiKey {
    pub fn field_write(location: Statement, base: Val, field: Field) -> Self {
        Self {
            location,
            base,
            kind: PoiKind::FieldWrite(field),
        }
    }

    pub fn field_read(location: Statement, base: Val, field: Field) -> Self {
        Self {
            location,
            base,
            kind: PoiKind::FieldRead(field),
        }
    }

    pub fn call_site(location: Statement, receiver: Val) -> Self {
        Self {
            location,
            base: receiver,
            kind: PoiKind::CallSite,
        }
    }

    pub fn is_call_site(&self) -> bool {
        self.kind == PoiKind::CallSite
    }
}

impl fmt::Display for PoiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PoiKind::FieldWrite(field) => write!(f, "write {}.{} @ {}", self.base, field, self.location),
            PoiKind::FieldRead(field) => write!(f, "read {}.{} @ {}", self.base, field, self.location),
            PoiKind::CallSite => write!(f, "call on {} @ {}", self.base, self.location),
        }
    }
}

/// Resolving event delivered to a POI
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
    /// The origin's fact aliases the POI base
    Alias(Node),
    /// The call site dispatches to this method
    Callee(Method),
}

/// Pending obligation plus its delivery record
#[derive(Debug, Clone)]
pub struct PointOfIndirection<W> {
    key: PoiKey,
    waiting: BTreeMap<Node, Vec<Successor<W>>>,
    fired: BTreeSet<Resolution>,
}

impl<W: Clone + PartialEq> PointOfIndirection<W> {
    pub fn new(key: PoiKey) -> Self {
        Self {
            key,
            waiting: BTreeMap::new(),
            fired: BTreeSet::new(),
        }
    }

    pub fn key(&self) -> &PoiKey {
        &self.key
    }

    /// Register `origin`; returns true when the origin is new
    pub fn add_waiting(&mut self, origin: Node, successors: Vec<Successor<W>>) -> bool {
        let is_new = !self.waiting.contains_key(&origin);
        let pending = self.waiting.entry(origin).or_default();
        for successor in successors {
            if !pending.contains(&successor) {
                pending.push(successor);
            }
        }
        is_new
    }

    pub fn origins(&self) -> impl Iterator<Item = &Node> {
        self.waiting.keys()
    }

    pub fn successors_of(&self, origin: &Node) -> &[Successor<W>] {
        self.waiting.get(origin).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Record `resolution`; false when it was already delivered
    pub fn mark_fired(&mut self, resolution: Resolution) -> bool {
        self.fired.insert(resolution)
    }

    pub fn has_fired(&self, resolution: &Resolution) -> bool {
        self.fired.contains(resolution)
    }

    pub fn fired(&self) -> &BTreeSet<Resolution> {
        &self.fired
    }

    /// Origins whose alias resolution is still outstanding
    pub fn unresolved_origins(&self) -> Vec<Node> {
        self.waiting
            .keys()
            .filter(|origin| !self.fired.contains(&Resolution::Alias((*origin).clone())))
            .cloned()
            .collect()
    }
}
