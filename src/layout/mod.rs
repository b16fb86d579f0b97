//! The external layout client protocol: a namespace registry binding
//! `(output, namespace)` pairs to external layout processes, and the
//! per-client tunable values they expose.
//!
//! [`tracker`] holds the transport-agnostic serial/count bookkeeping;
//! [`protocol`] adapts it to the generated `mosaic_layout_v1` wire objects.

pub mod protocol;
pub mod tracker;

use std::collections::HashMap;

use slotmap::SlotMap;

use crate::geometry::Rect;
use crate::ids::{LayoutClientId, OutputId};
use crate::tags::Tags;
pub use tracker::{CommitOutcome, LayoutDemandTracker, ProtocolError};

/// One view as advertised to a layout client: its tags and `app_id`, in
/// the same order the demand's geometries must come back in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewDescriptor {
    pub tags: Tags,
    pub app_id: Option<String>,
}

/// Named per-client tunables. Strings are boxed separately from the
/// `Copy` numeric variants to keep lookups cheap for the common int/fixed
/// case.
#[derive(Debug, Clone, Default)]
pub struct Tunables {
    ints: HashMap<String, i32>,
    fixed: HashMap<String, f64>,
    strings: HashMap<String, String>,
}

impl Tunables {
    pub fn set_int(&mut self, name: &str, value: i32) {
        self.ints.insert(name.to_string(), value);
    }

    pub fn mod_int(&mut self, name: &str, delta: i32) {
        let entry = self.ints.entry(name.to_string()).or_insert(0);
        *entry = entry.wrapping_add(delta);
    }

    pub fn set_fixed(&mut self, name: &str, value: f64) {
        self.fixed.insert(name.to_string(), value);
    }

    pub fn mod_fixed(&mut self, name: &str, delta: f64) {
        let entry = self.fixed.entry(name.to_string()).or_insert(0.0);
        *entry += delta;
    }

    pub fn set_string(&mut self, name: &str, value: String) {
        self.strings.insert(name.to_string(), value);
    }

    pub fn int(&self, name: &str) -> Option<i32> {
        self.ints.get(name).copied()
    }

    pub fn fixed(&self, name: &str) -> Option<f64> {
        self.fixed.get(name).copied()
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.strings.get(name).map(String::as_str)
    }
}

struct LayoutClientEntry {
    output: OutputId,
    namespace: String,
    tracker: LayoutDemandTracker,
    tunables: Tunables,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterError {
    NamespaceInUse,
}

/// Global registry of bound layout clients, keyed by `(output, namespace)`
/// with a cross-output namespace-uniqueness rule: initialized once at
/// compositor start, torn down at exit, like the input-inhibitor gate and
/// cursor-theme environment.
#[derive(Default)]
pub struct LayoutRegistry {
    clients: SlotMap<LayoutClientId, LayoutClientEntry>,
    by_output_namespace: HashMap<(OutputId, String), LayoutClientId>,
    namespace_owner: HashMap<String, LayoutClientId>,
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `get_layout(output, namespace)`. Refuses (returns
    /// `Err(NamespaceInUse)`) if `(output, namespace)` is already bound, or
    /// the namespace is already used by a *different* client on any other
    /// output.
    pub fn register(
        &mut self,
        output: OutputId,
        namespace: String,
    ) -> Result<LayoutClientId, RegisterError> {
        if self
            .by_output_namespace
            .contains_key(&(output, namespace.clone()))
        {
            return Err(RegisterError::NamespaceInUse);
        }
        if self.namespace_owner.contains_key(&namespace) {
            return Err(RegisterError::NamespaceInUse);
        }

        let id = self.clients.insert(LayoutClientEntry {
            output,
            namespace: namespace.clone(),
            tracker: LayoutDemandTracker::new(),
            tunables: Tunables::default(),
        });
        self.by_output_namespace.insert((output, namespace.clone()), id);
        self.namespace_owner.insert(namespace, id);
        Ok(id)
    }

    pub fn unregister(&mut self, id: LayoutClientId) {
        if let Some(entry) = self.clients.remove(id) {
            self.by_output_namespace
                .remove(&(entry.output, entry.namespace.clone()));
            self.namespace_owner.remove(&entry.namespace);
        }
    }

    /// `Output::getLayoutByName`: the bound client for this output and
    /// namespace, if any.
    pub fn get_layout_by_name(&self, output: OutputId, namespace: &str) -> Option<LayoutClientId> {
        self.by_output_namespace
            .get(&(output, namespace.to_string()))
            .copied()
    }

    pub fn tracker_mut(&mut self, id: LayoutClientId) -> Option<&mut LayoutDemandTracker> {
        self.clients.get_mut(id).map(|e| &mut e.tracker)
    }

    pub fn tunables_mut(&mut self, id: LayoutClientId) -> Option<&mut Tunables> {
        self.clients.get_mut(id).map(|e| &mut e.tunables)
    }

    pub fn tunables(&self, id: LayoutClientId) -> Option<&Tunables> {
        self.clients.get(id).map(|e| &e.tunables)
    }

    pub fn namespace_of(&self, id: LayoutClientId) -> Option<&str> {
        self.clients.get(id).map(|e| e.namespace.as_str())
    }

    pub fn output_of(&self, id: LayoutClientId) -> Option<OutputId> {
        self.clients.get(id).map(|e| e.output)
    }
}

/// The simple fallback used when an output's active layout namespace has
/// no bound client: equal-width columns, left to right. A minimal
/// built-in reference layout — never used once a real client is bound.
pub fn fallback_layout(count: usize, usable: Rect) -> Vec<Rect> {
    if count == 0 {
        return Vec::new();
    }
    let width = usable.width / count as i32;
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let x = usable.x + width * i as i32;
        let w = if i + 1 == count {
            usable.right() - x
        } else {
            width
        };
        out.push(Rect::new(x, usable.y, w, usable.height));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_same_namespace_same_output_twice_fails() {
        let mut reg = LayoutRegistry::new();
        let output = OutputId::default();
        reg.register(output, "tall".into()).unwrap();
        assert_eq!(
            reg.register(output, "tall".into()),
            Err(RegisterError::NamespaceInUse)
        );
    }

    #[test]
    fn register_same_namespace_different_output_fails() {
        let mut reg = LayoutRegistry::new();
        let a = OutputId::default();
        let b = {
            let mut clients: SlotMap<OutputId, ()> = SlotMap::with_key();
            clients.insert(());
            clients.insert(());
            clients.keys().last().unwrap()
        };
        reg.register(a, "tall".into()).unwrap();
        assert_eq!(
            reg.register(b, "tall".into()),
            Err(RegisterError::NamespaceInUse)
        );
    }

    #[test]
    fn different_namespaces_same_output_both_succeed() {
        let mut reg = LayoutRegistry::new();
        let output = OutputId::default();
        assert!(reg.register(output, "tall".into()).is_ok());
        assert!(reg.register(output, "grid".into()).is_ok());
    }

    #[test]
    fn fallback_layout_splits_evenly() {
        let usable = Rect::new(0, 0, 800, 600);
        let cols = fallback_layout(2, usable);
        assert_eq!(cols, vec![Rect::new(0, 0, 400, 600), Rect::new(400, 0, 400, 600)]);
    }

    #[test]
    fn fallback_layout_last_column_absorbs_remainder() {
        let usable = Rect::new(0, 0, 10, 100);
        let cols = fallback_layout(3, usable);
        assert_eq!(cols.len(), 3);
        assert_eq!(cols.iter().map(|r| r.width).sum::<i32>(), 10);
    }
}
