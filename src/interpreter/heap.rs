use rustc_hash::FxHashMap;

use super::value::Value;

/// Handle to a heap object. Ids are handed out in allocation order and never
/// reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Arena of record instances. An object's field set is fixed when it is
/// allocated; only field values change afterwards.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<FxHashMap<String, Value>>,
}

impl Heap {
    pub fn allocate(&mut self, fields: FxHashMap<String, Value>) -> ObjectId {
        self.objects.push(fields);
        ObjectId(self.objects.len() - 1)
    }

    pub fn field(&self, id: ObjectId, name: &str) -> Option<&Value> {
        self.objects.get(id.0)?.get(name)
    }

    pub fn field_mut(&mut self, id: ObjectId, name: &str) -> Option<&mut Value> {
        self.objects.get_mut(id.0)?.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
