//! Rebuild-on-demand cache slots with build counters.

/// A lazily rebuilt cached value.
///
/// Invalidation clears the slot; the next access rebuilds it and bumps the
/// build counter, which tests use to verify what a given mutation threw away.
#[derive(Debug)]
pub struct Slot<T> {
    value: Option<T>,
    builds: u32,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            value: None,
            builds: 0,
        }
    }
}

impl<T> Slot<T> {
    pub fn clear(&mut self) {
        self.value = None;
    }

    pub fn is_built(&self) -> bool {
        self.value.is_some()
    }

    /// Number of times this slot has been (re)built.
    pub fn builds(&self) -> u32 {
        self.builds
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn get_or_insert_with(&mut self, build: impl FnOnce() -> T) -> &mut T {
        if self.value.is_none() {
            self.value = Some(build());
            self.builds += 1;
        }
        // Slot was just filled above if it was empty.
        match self.value.as_mut() {
            Some(value) => value,
            None => unreachable!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebuild_only_after_clear() {
        let mut slot: Slot<u32> = Slot::default();
        assert!(!slot.is_built());

        assert_eq!(*slot.get_or_insert_with(|| 7), 7);
        assert_eq!(*slot.get_or_insert_with(|| 99), 7);
        assert_eq!(slot.builds(), 1);

        slot.clear();
        assert_eq!(*slot.get_or_insert_with(|| 99), 99);
        assert_eq!(slot.builds(), 2);
    }
}
