//! Structural id allocation.

/// Floor of the reserved id range.
///
/// Slide master and layout ids live at or above this value; ids below it
/// are native (assigned by whatever produced the file) and are never
/// touched. On save of a slide master, every id at or above the floor is
/// reissued so that re-importing the same subtree cannot mint a collision.
pub const RESERVED_ID_BASE: u32 = 0x8000_0000;

/// Monotonic source of structural ids for one package.
///
/// Each package owns its own allocator, seeded while loading from the
/// highest reserved-range id observed, so two packages opened from the same
/// bytes allocate independently and never collide with native ids.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next: RESERVED_ID_BASE,
        }
    }

    /// Raise the starting point to one past an observed id. Ids below the
    /// reserved floor are ignored; the allocator never issues native ids.
    /// An observed `u32::MAX` is schema-valid and pins the allocator at
    /// the top of the id space.
    pub fn seed(&mut self, observed: u32) {
        if observed >= RESERVED_ID_BASE && observed >= self.next {
            self.next = observed.saturating_add(1);
        }
    }

    /// Issue the next id. Never decreases; saturates at `u32::MAX` once
    /// the id space is exhausted.
    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next = self.next.saturating_add(1);
        id
    }

    /// The id the next call to `next_id` would return.
    #[inline]
    pub fn peek(&self) -> u32 {
        self.next
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_reserved_base() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next_id(), RESERVED_ID_BASE);
        assert_eq!(ids.next_id(), RESERVED_ID_BASE + 1);
    }

    #[test]
    fn test_seed_skips_observed_range() {
        let mut ids = IdAllocator::new();
        ids.seed(RESERVED_ID_BASE + 7);
        ids.seed(RESERVED_ID_BASE + 2);
        assert_eq!(ids.next_id(), RESERVED_ID_BASE + 8);
    }

    #[test]
    fn test_seed_ignores_native_ids() {
        let mut ids = IdAllocator::new();
        ids.seed(256);
        ids.seed(2000);
        assert_eq!(ids.next_id(), RESERVED_ID_BASE);
    }

    #[test]
    fn test_allocators_are_independent() {
        let mut a = IdAllocator::new();
        let mut b = IdAllocator::new();
        a.next_id();
        a.next_id();
        assert_eq!(b.next_id(), RESERVED_ID_BASE);
    }

    #[test]
    fn test_seed_saturates_at_top_of_id_space() {
        let mut ids = IdAllocator::new();
        ids.seed(u32::MAX);
        assert_eq!(ids.next_id(), u32::MAX);
        assert_eq!(ids.next_id(), u32::MAX);
        assert_eq!(ids.peek(), u32::MAX);
    }
}
