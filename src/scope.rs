//! Lexical environments shared by the type checker and the interpreter.
//!
//! Frames live in an arena and link to their parent, so a frame can be
//! re-entered later through its [`EnvId`]. Declarations pin the frame they
//! were made in; every other frame is recycled once popped.

use rustc_hash::FxHashMap;

/// Stable handle to a frame of a [`ScopeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvId(usize);

#[derive(Debug)]
struct Frame<T> {
    parent: Option<EnvId>,
    names: FxHashMap<String, T>,
    pinned: bool,
}

impl<T> Frame<T> {
    fn new(parent: Option<EnvId>) -> Self {
        Self {
            parent,
            names: FxHashMap::default(),
            pinned: false,
        }
    }
}

#[derive(Debug)]
pub struct ScopeTable<T> {
    frames: Vec<Frame<T>>,
    free: Vec<usize>,
    current: EnvId,
}

impl<T> ScopeTable<T> {
    /// A table holding only the root frame, which can never be popped.
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::new(None)],
            free: Vec::new(),
            current: EnvId(0),
        }
    }

    pub fn push_environment(&mut self) -> EnvId {
        let frame = Frame::new(Some(self.current));
        let index = match self.free.pop() {
            Some(index) => {
                self.frames[index] = frame;
                index
            }
            None => {
                self.frames.push(frame);
                self.frames.len() - 1
            }
        };
        self.current = EnvId(index);
        self.current
    }

    /// Leaves the innermost frame and moves the cursor to its parent.
    pub fn pop_environment(&mut self) {
        let EnvId(index) = self.current;
        let frame = &mut self.frames[index];
        let Some(parent) = frame.parent else {
            return;
        };
        if !frame.pinned {
            frame.names.clear();
            self.free.push(index);
        }
        self.current = parent;
    }

    /// Binds `name` in the innermost frame, replacing any binding it had there.
    pub fn add_name(&mut self, name: impl Into<String>, info: T) {
        let EnvId(index) = self.current;
        self.frames[index].names.insert(name.into(), info);
    }

    /// Overwrites the nearest visible binding of `name`. Returns `false` when
    /// the name is not visible.
    pub fn set_info(&mut self, name: &str, info: T) -> bool {
        match self.get_info_mut(name) {
            Some(slot) => {
                *slot = info;
                true
            }
            None => false,
        }
    }

    pub fn get_info(&self, name: &str) -> Option<&T> {
        let index = self.find(name)?;
        self.frames[index].names.get(name)
    }

    pub fn get_info_mut(&mut self, name: &str) -> Option<&mut T> {
        let index = self.find(name)?;
        self.frames[index].names.get_mut(name)
    }

    pub fn name_exists(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn name_exists_in_current_env(&self, name: &str) -> bool {
        let EnvId(index) = self.current;
        self.frames[index].names.contains_key(name)
    }

    pub fn environment_id(&self) -> EnvId {
        self.current
    }

    /// Moves the cursor to a frame obtained earlier from this table. The next
    /// push creates a child of that frame.
    pub fn set_environment_id(&mut self, id: EnvId) {
        self.current = id;
    }

    /// Keeps the current frame and its ancestors alive after they are popped,
    /// so the returned id can be re-entered later.
    pub fn pin_environment(&mut self) -> EnvId {
        let mut cursor = Some(self.current);
        while let Some(EnvId(index)) = cursor {
            let frame = &mut self.frames[index];
            if frame.pinned {
                break;
            }
            frame.pinned = true;
            cursor = frame.parent;
        }
        self.current
    }

    fn find(&self, name: &str) -> Option<usize> {
        let mut cursor = Some(self.current);
        while let Some(EnvId(index)) = cursor {
            let frame = &self.frames[index];
            if frame.names.contains_key(name) {
                return Some(index);
            }
            cursor = frame.parent;
        }
        None
    }

    #[cfg(test)]
    pub(crate) fn allocated_frames(&self) -> usize {
        self.frames.len()
    }
}

impl<T> Default for ScopeTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_frames_shadow_outer_names() {
        let mut table = ScopeTable::new();
        table.add_name("x", 1);
        table.push_environment();
        assert!(table.name_exists("x"));
        assert!(!table.name_exists_in_current_env("x"));

        table.add_name("x", 2);
        assert_eq!(table.get_info("x"), Some(&2));
        table.pop_environment();
        assert_eq!(table.get_info("x"), Some(&1));
    }

    #[test]
    fn set_info_writes_nearest_binding() {
        let mut table = ScopeTable::new();
        table.add_name("x", 1);
        table.push_environment();
        assert!(table.set_info("x", 5));
        assert!(!table.set_info("y", 5));
        table.pop_environment();
        assert_eq!(table.get_info("x"), Some(&5));
    }

    #[test]
    fn popped_names_disappear() {
        let mut table = ScopeTable::new();
        table.push_environment();
        table.add_name("local", 'a');
        table.pop_environment();
        assert!(!table.name_exists("local"));
    }

    #[test]
    fn root_frame_cannot_be_popped() {
        let mut table = ScopeTable::new();
        table.add_name("global", 0);
        table.pop_environment();
        assert_eq!(table.get_info("global"), Some(&0));
    }

    #[test]
    fn reentering_declaration_frame_resolves_statically() {
        let mut table = ScopeTable::new();
        table.push_environment();
        table.add_name("x", "declared");
        let declared = table.pin_environment();
        table.push_environment();
        table.add_name("x", "caller");
        table.push_environment();
        table.pop_environment();
        table.pop_environment();
        table.pop_environment();

        // A distant caller with its own `x` jumps back into the pinned frame.
        table.push_environment();
        table.add_name("x", "other caller");
        let saved = table.environment_id();
        table.set_environment_id(declared);
        table.push_environment();
        assert_eq!(table.get_info("x"), Some(&"declared"));
        table.pop_environment();
        assert_eq!(table.environment_id(), declared);
        table.set_environment_id(saved);
        assert_eq!(table.get_info("x"), Some(&"other caller"));
    }

    #[test]
    fn unpinned_frames_are_recycled() {
        let mut table: ScopeTable<i32> = ScopeTable::new();
        for _ in 0..100 {
            table.push_environment();
            table.add_name("i", 0);
            table.pop_environment();
        }
        assert_eq!(table.allocated_frames(), 2);

        let pinned = {
            table.push_environment();
            let id = table.pin_environment();
            table.pop_environment();
            id
        };
        table.push_environment();
        assert_ne!(table.environment_id(), pinned);
    }
}
