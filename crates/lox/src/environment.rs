//! Slot-addressed environments with an enclosing-scope chain.
//!
//! Generalizes the teacher's flat, `NamespaceId`-indexed bytecode frame
//! (`namespace.rs`) into a linked chain of scopes: tree-walking needs a fresh scope per
//! block and function call rather than one flat frame per bytecode call, but the
//! underlying idea — integer-indexed slots assigned ahead of time instead of name
//! lookups at runtime — is the same one the teacher's VM relies on. Grounded directly on
//! cpplox's `Environment` (`environment.cpp`): `define` appends and returns the new
//! index, `get`/`assign` walk the enclosing chain by hand-count distance.

use std::{cell::RefCell, rc::Rc};

use crate::value::Value;

/// One lexical scope's storage: an append-only slot array plus a fixed enclosing link.
///
/// The enclosing pointer is set once at construction and never reassigned, matching the
/// spec's `new_child(parent)` contract — environments never get re-parented after birth.
#[derive(Debug)]
pub struct Environment {
    slots: RefCell<Vec<Value>>,
    enclosing: Option<Rc<Self>>,
}

impl Environment {
    /// Builds a new environment chained onto `enclosing` (`None` for the global scope).
    #[must_use]
    pub fn new(enclosing: Option<Rc<Self>>) -> Rc<Self> {
        Rc::new(Self {
            slots: RefCell::new(Vec::new()),
            enclosing,
        })
    }

    /// Appends `value` as a new slot and returns its index.
    pub fn define(&self, value: Value) -> usize {
        let mut slots = self.slots.borrow_mut();
        slots.push(value);
        slots.len() - 1
    }

    /// Reads slot `slot` in this environment.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range — a resolver bug, since every slot it emits is
    /// guaranteed to exist in the environment chain present at the use site.
    pub fn get(&self, slot: usize) -> Value {
        self.slots
            .borrow()
            .get(slot)
            .cloned()
            .expect("resolver-assigned slot is in range")
    }

    /// Reads slot `slot` after walking `depth` enclosing links.
    pub fn get_at(self: &Rc<Self>, slot: usize, depth: usize) -> Value {
        self.ancestor(depth).get(slot)
    }

    /// Writes `value` into slot `slot` in this environment.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range — a resolver bug, since every slot it emits is
    /// guaranteed to exist in the environment chain present at the use site.
    pub fn assign(&self, slot: usize, value: Value) {
        let mut slots = self.slots.borrow_mut();
        let cell = slots
            .get_mut(slot)
            .expect("resolver-assigned slot is in range");
        *cell = value;
    }

    /// Writes `value` into slot `slot` after walking `depth` enclosing links.
    pub fn assign_at(self: &Rc<Self>, slot: usize, value: Value, depth: usize) {
        self.ancestor(depth).assign(slot, value);
    }

    fn ancestor(self: &Rc<Self>, depth: usize) -> &Rc<Self> {
        let mut env = self;
        for _ in 0..depth {
            env = env
                .enclosing
                .as_ref()
                .expect("resolver-assigned depth is in range");
        }
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_returns_sequential_slot_indices() {
        let env = Environment::new(None);
        assert_eq!(env.define(Value::Number(1.0)), 0);
        assert_eq!(env.define(Value::Number(2.0)), 1);
    }

    #[test]
    fn get_at_walks_the_enclosing_chain_by_depth() {
        let global = Environment::new(None);
        global.define(Value::Number(1.0));
        let child = Environment::new(Some(Rc::clone(&global)));
        child.define(Value::Number(2.0));
        let grandchild = Environment::new(Some(Rc::clone(&child)));

        assert_eq!(
            grandchild
                .get_at(0, 2)
                .stringify(crate::value::NumberFormat::Fixed),
            "1.000000"
        );
        assert_eq!(
            grandchild
                .get_at(0, 1)
                .stringify(crate::value::NumberFormat::Fixed),
            "2.000000"
        );
    }

    #[test]
    fn assign_at_writes_through_to_the_target_ancestor() {
        let global = Environment::new(None);
        global.define(Value::Number(1.0));
        let child = Environment::new(Some(Rc::clone(&global)));

        child.assign_at(0, Value::Number(9.0), 1);
        assert_eq!(
            global.get(0).stringify(crate::value::NumberFormat::Fixed),
            "9.000000"
        );
    }
}
