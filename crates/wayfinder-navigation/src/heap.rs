//! Binary min-heap over grid cell indices with membership tests and
//! decrease-key, used as the A* open set.

/// Priority of an open cell. Ordered by `f_cost`, ties broken by `h_cost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct SearchKey {
    /// Estimated total cost through the cell (`g + h`).
    pub f_cost: u32,
    /// Heuristic estimate from the cell to the goal.
    pub h_cost: u32,
}

impl SearchKey {
    /// Key for a cell with cost-so-far `g_cost` and heuristic `h_cost`.
    pub fn new(g_cost: u32, h_cost: u32) -> Self {
        Self {
            f_cost: g_cost.saturating_add(h_cost),
            h_cost,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    item: usize,
    key: SearchKey,
}

/// Fixed-capacity min-heap of item indices in `0..capacity`.
///
/// `slots[item]` records where each queued item currently sits in `heap`,
/// which makes [`contains`](Self::contains) O(1) and
/// [`decrease_key`](Self::decrease_key) O(log n).
#[derive(Debug, Clone)]
pub struct PriorityQueue {
    /// Heap storage
    heap: Vec<HeapEntry>,
    /// Item -> heap slot
    slots: Vec<Option<usize>>,
}

impl PriorityQueue {
    /// Creates an empty queue for items `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            slots: vec![None; capacity],
        }
    }

    /// Adds `item` with priority `key`.
    ///
    /// # Panics
    /// Panics if the queue is full or `item` is outside `0..capacity`. The
    /// queue is sized to the grid, so either means a caller bug.
    pub fn insert(&mut self, item: usize, key: SearchKey) {
        assert!(
            self.heap.len() < self.slots.len(),
            "priority queue full: capacity {}",
            self.slots.len()
        );
        assert!(item < self.slots.len(), "item {} outside queue capacity {}", item, self.slots.len());
        debug_assert!(self.slots[item].is_none(), "item {} inserted twice", item);

        self.heap.push(HeapEntry { item, key });
        self.bubble_up(self.heap.len() - 1);
    }

    /// Removes and returns the item with the smallest key.
    pub fn extract_min(&mut self) -> Option<usize> {
        if self.heap.is_empty() {
            return None;
        }
        let top = self.heap.swap_remove(0);
        self.slots[top.item] = None;
        if !self.heap.is_empty() {
            self.trickle_down(0);
        }
        Some(top.item)
    }

    /// Whether `item` is currently queued.
    pub fn contains(&self, item: usize) -> bool {
        matches!(self.slots.get(item), Some(Some(_)))
    }

    /// Current key of a queued item.
    pub fn key_of(&self, item: usize) -> Option<SearchKey> {
        self.slots.get(item).copied().flatten().map(|slot| self.heap[slot].key)
    }

    /// Lowers the key of a queued item and restores heap order.
    ///
    /// Only valid when `item` is queued and `key` is not larger than its
    /// current key; other calls are ignored in release builds.
    pub fn decrease_key(&mut self, item: usize, key: SearchKey) {
        let Some(slot) = self.slots.get(item).copied().flatten() else {
            debug_assert!(false, "decrease_key on item {} that is not queued", item);
            return;
        };
        debug_assert!(key <= self.heap[slot].key, "decrease_key would raise the key of item {}", item);
        self.heap[slot].key = key;
        self.bubble_up(slot);
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Largest number of items the queue can hold.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Removes every item.
    pub fn clear(&mut self) {
        for entry in self.heap.drain(..) {
            self.slots[entry.item] = None;
        }
    }

    /// Moves the entry at `i` toward the root until its parent is not larger.
    fn bubble_up(&mut self, mut i: usize) {
        let entry = self.heap[i];
        while i > 0 {
            let parent = (i - 1) / 2;
            if entry.key >= self.heap[parent].key {
                break;
            }
            self.heap[i] = self.heap[parent];
            self.slots[self.heap[i].item] = Some(i);
            i = parent;
        }
        self.heap[i] = entry;
        self.slots[entry.item] = Some(i);
    }

    /// Moves the entry at `i` toward the leaves until no child is smaller.
    fn trickle_down(&mut self, mut i: usize) {
        let entry = self.heap[i];
        let size = self.heap.len();
        loop {
            let child1 = 2 * i + 1;
            if child1 >= size {
                break;
            }
            let child2 = child1 + 1;
            let min_child = if child2 < size && self.heap[child2].key < self.heap[child1].key {
                child2
            } else {
                child1
            };
            if entry.key <= self.heap[min_child].key {
                break;
            }
            self.heap[i] = self.heap[min_child];
            self.slots[self.heap[i].item] = Some(i);
            i = min_child;
        }
        self.heap[i] = entry;
        self.slots[entry.item] = Some(i);
    }

    #[cfg(test)]
    fn assert_invariants(&self) {
        for (slot, entry) in self.heap.iter().enumerate() {
            assert_eq!(self.slots[entry.item], Some(slot), "slot map out of sync for item {}", entry.item);
            if slot > 0 {
                assert!(self.heap[(slot - 1) / 2].key <= entry.key, "heap order violated at slot {}", slot);
            }
        }
        assert_eq!(self.slots.iter().filter(|s| s.is_some()).count(), self.heap.len());
    }
}
