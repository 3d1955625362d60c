//! Lexically-scoped symbol table.
//!
//! A chain of frames; `get` searches innermost-to-outermost, `set` writes
//! into the current (innermost) frame. Generic over the stored value so the
//! same structure backs both the type checker (`SymTab<Type>`) and the IR
//! generator (`SymTab<IRVar>`).

use std::collections::HashMap;

pub struct SymTab<V> {
    frames: Vec<HashMap<String, V>>,
}

impl<V: Clone> SymTab<V> {
    pub fn new() -> Self {
        SymTab { frames: vec![HashMap::new()] }
    }

    /// Seed a fresh top-level table from an initial set of bindings.
    pub fn with_root(root: HashMap<String, V>) -> Self {
        SymTab { frames: vec![root] }
    }

    /// Enter a new lexical scope.
    pub fn push_frame(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Leave the innermost lexical scope.
    pub fn pop_frame(&mut self) {
        self.frames.pop();
        debug_assert!(!self.frames.is_empty(), "popped the root frame");
    }

    /// Look up `name`, searching from the innermost frame outward.
    pub fn get(&self, name: &str) -> Option<&V> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Bind `name` in the current (innermost) frame, overwriting any
    /// existing binding for it in that frame.
    pub fn set(&mut self, name: impl Into<String>, value: V) {
        self.frames.last_mut().expect("root frame always present").insert(name.into(), value);
    }

    /// True if `name` is already bound in the current frame (used to detect
    /// redeclaration within the same scope).
    pub fn declared_in_current_frame(&self, name: &str) -> bool {
        self.frames.last().expect("root frame always present").contains_key(name)
    }
}

impl<V: Clone> Default for SymTab<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_scope_shadows_outer() {
        let mut st: SymTab<i32> = SymTab::new();
        st.set("x", 1);
        st.push_frame();
        st.set("x", 2);
        assert_eq!(st.get("x"), Some(&2));
        st.pop_frame();
        assert_eq!(st.get("x"), Some(&1));
    }

    #[test]
    fn lookup_searches_outward() {
        let mut st: SymTab<i32> = SymTab::new();
        st.set("y", 10);
        st.push_frame();
        assert_eq!(st.get("y"), Some(&10));
    }

    #[test]
    fn redeclaration_detected_only_in_current_frame() {
        let mut st: SymTab<i32> = SymTab::new();
        st.set("x", 1);
        assert!(st.declared_in_current_frame("x"));
        st.push_frame();
        assert!(!st.declared_in_current_frame("x"));
    }

    #[test]
    fn unknown_name_is_none() {
        let st: SymTab<i32> = SymTab::new();
        assert_eq!(st.get("nope"), None);
    }
}
