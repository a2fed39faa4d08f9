use serde::{Serialize, Deserialize};

/// Allocates document-unique integer ids. Ids start at 1 and are never
/// reused within a session, even after the owning entity is deleted.
///
/// When loading a persisted document, every existing id must be fed
/// through `import` before any call to `unique_id`, so later allocations
/// cannot collide with loaded entities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct IdAllocator {
    highest :usize,
    used :im::OrdSet<usize>,
}

impl IdAllocator {
    pub fn new() -> Self { Default::default() }

    pub fn unique_id(&mut self) -> usize {
        let mut id = self.highest + 1;
        while self.used.contains(&id) { id += 1; }
        self.used.insert(id);
        self.highest = id;
        id
    }

    /// Record an externally assigned id as used. Importing the same id
    /// twice is accepted silently.
    pub fn import(&mut self, id :usize) -> usize {
        self.used.insert(id);
        if id > self.highest { self.highest = id; }
        id
    }

    pub fn unique_name(&mut self, prefix :&str) -> String {
        format!("{}_{}", prefix, self.unique_id())
    }

    pub fn import_name(&mut self, prefix :&str, id :usize) -> String {
        format!("{}_{}", prefix, self.import(id))
    }

    pub fn is_used(&self, id :usize) -> bool {
        self.used.contains(&id)
    }

    /// Forget all allocations, e.g. when starting a new document.
    pub fn reset(&mut self) {
        *self = Default::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_count_up_from_one() {
        let mut ids = IdAllocator::new();
        let allocated :Vec<usize> = (0..5).map(|_| ids.unique_id()).collect();
        assert_eq!(allocated, vec![1,2,3,4,5]);
    }

    #[test]
    fn import_advances_watermark() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.import(5), 5);
        let next = ids.unique_id();
        assert!(next >= 6);
        assert_ne!(next, 5);
    }

    #[test]
    fn duplicate_import_is_accepted() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.import(3), 3);
        assert_eq!(ids.import(3), 3);
        assert!(ids.is_used(3));
    }

    #[test]
    fn import_below_watermark_does_not_lower_it() {
        let mut ids = IdAllocator::new();
        ids.import(10);
        ids.import(2);
        assert_eq!(ids.unique_id(), 11);
    }

    #[test]
    fn reset_starts_over() {
        let mut ids = IdAllocator::new();
        ids.unique_id();
        ids.import(99);
        ids.reset();
        assert_eq!(ids.unique_id(), 1);
    }

    #[test]
    fn names_compose_prefix_and_id() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.unique_name("road"), "road_1");
        assert_eq!(ids.import_name("road", 7), "road_7");
        assert_eq!(ids.unique_name("road"), "road_8");
    }
}
