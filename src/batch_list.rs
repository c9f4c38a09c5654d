//! Bounded doubly-linked list over a fixed arena.
//!
//! Scan results and connection attempts are produced by the radio faster than
//! they can be paged out to the service. They queue here, the head is offered
//! to the next page, and whatever does not fit stays at the front for the one
//! after that.
//!
//! Slots are recycled through a free list. Every slot carries a generation
//! that is bumped on release, so a [`BatchHandle`] held past the removal of
//! its value is detected instead of aliasing the slot's next occupant.

use crate::error::{FfsError, FfsResult};

type SlotIndex = u16;

/// Stable reference to a queued value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BatchHandle {
    slot: SlotIndex,
    generation: u32,
}

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    generation: u32,
    prev: Option<SlotIndex>,
    next: Option<SlotIndex>,
}

#[derive(Debug)]
pub struct BatchList<T, const N: usize> {
    slots: heapless::Vec<Slot<T>, N>,
    free: Option<SlotIndex>,
    head: Option<SlotIndex>,
    tail: Option<SlotIndex>,
    count: usize,
}

impl<T, const N: usize> Default for BatchList<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> BatchList<T, N> {
    pub const fn new() -> Self {
        Self {
            slots: heapless::Vec::new(),
            free: None,
            head: None,
            tail: None,
            count: 0,
        }
    }

    pub const fn count(&self) -> usize {
        self.count
    }

    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub const fn is_full(&self) -> bool {
        self.count == N
    }

    pub fn push_back(&mut self, value: T) -> FfsResult<BatchHandle> {
        let slot = self.allocate(value)?;
        self.link_after(self.tail, slot);
        Ok(self.handle(slot))
    }

    pub fn push_front(&mut self, value: T) -> FfsResult<BatchHandle> {
        let slot = self.allocate(value)?;
        self.link_after(None, slot);
        Ok(self.handle(slot))
    }

    /// Inserts so that the value ends up at `index`; `index == count()`
    /// appends.
    pub fn insert_at(&mut self, index: usize, value: T) -> FfsResult<BatchHandle> {
        if index > self.count {
            return Err(FfsError::Error);
        }
        let prev = match index {
            0 => None,
            _ => Some(self.slot_at(index - 1)?),
        };
        let slot = self.allocate(value)?;
        self.link_after(prev, slot);
        Ok(self.handle(slot))
    }

    pub fn pop_front(&mut self) -> FfsResult<T> {
        let slot = self.head.ok_or(FfsError::Error)?;
        self.release(slot)
    }

    pub fn pop_back(&mut self) -> FfsResult<T> {
        let slot = self.tail.ok_or(FfsError::Error)?;
        self.release(slot)
    }

    pub fn pop_at(&mut self, index: usize) -> FfsResult<T> {
        let slot = self.slot_at(index)?;
        self.release(slot)
    }

    pub fn peek_front(&self) -> FfsResult<&T> {
        self.value(self.head.ok_or(FfsError::Error)?)
    }

    pub fn peek_back(&self) -> FfsResult<&T> {
        self.value(self.tail.ok_or(FfsError::Error)?)
    }

    pub fn peek_at(&self, index: usize) -> FfsResult<&T> {
        self.value(self.slot_at(index)?)
    }

    pub fn get(&self, handle: BatchHandle) -> FfsResult<&T> {
        self.value(self.live_slot(handle)?)
    }

    pub fn remove(&mut self, handle: BatchHandle) -> FfsResult<T> {
        let slot = self.live_slot(handle)?;
        self.release(slot)
    }

    pub fn clear(&mut self) {
        while self.pop_front().is_ok() {}
    }

    /// Front to back.
    pub fn iter(&self) -> Iter<'_, T, N> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    fn allocate(&mut self, value: T) -> FfsResult<SlotIndex> {
        if let Some(slot) = self.free {
            let entry = &mut self.slots[slot as usize];
            self.free = entry.next;
            entry.value = Some(value);
            entry.prev = None;
            entry.next = None;
            return Ok(slot);
        }
        let slot = SlotIndex::try_from(self.slots.len()).map_err(|_| FfsError::Overrun)?;
        self.slots
            .push(Slot {
                value: Some(value),
                generation: 0,
                prev: None,
                next: None,
            })
            .map_err(|_| FfsError::Overrun)?;
        Ok(slot)
    }

    fn link_after(&mut self, prev: Option<SlotIndex>, slot: SlotIndex) {
        let next = match prev {
            Some(prev) => self.slots[prev as usize].next,
            None => self.head,
        };
        {
            let entry = &mut self.slots[slot as usize];
            entry.prev = prev;
            entry.next = next;
        }
        match prev {
            Some(prev) => self.slots[prev as usize].next = Some(slot),
            None => self.head = Some(slot),
        }
        match next {
            Some(next) => self.slots[next as usize].prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.count += 1;
    }

    fn release(&mut self, slot: SlotIndex) -> FfsResult<T> {
        let entry = &mut self.slots[slot as usize];
        let value = entry.value.take().ok_or(FfsError::Error)?;
        let (prev, next) = (entry.prev, entry.next);
        entry.generation = entry.generation.wrapping_add(1);
        entry.prev = None;
        entry.next = self.free;
        self.free = Some(slot);

        match prev {
            Some(prev) => self.slots[prev as usize].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.slots[next as usize].prev = prev,
            None => self.tail = prev,
        }
        self.count -= 1;
        Ok(value)
    }

    fn slot_at(&self, index: usize) -> FfsResult<SlotIndex> {
        if index >= self.count {
            return Err(FfsError::Error);
        }
        let mut cursor = self.head;
        for _ in 0..index {
            cursor = cursor.and_then(|slot| self.slots[slot as usize].next);
        }
        cursor.ok_or(FfsError::Error)
    }

    fn live_slot(&self, handle: BatchHandle) -> FfsResult<SlotIndex> {
        match self.slots.get(handle.slot as usize) {
            Some(entry) if entry.generation == handle.generation && entry.value.is_some() => {
                Ok(handle.slot)
            }
            _ => {
                log::debug!("batch_list: stale handle slot={}", handle.slot);
                Err(FfsError::Error)
            }
        }
    }

    fn value(&self, slot: SlotIndex) -> FfsResult<&T> {
        self.slots[slot as usize].value.as_ref().ok_or(FfsError::Error)
    }

    fn handle(&self, slot: SlotIndex) -> BatchHandle {
        BatchHandle {
            slot,
            generation: self.slots[slot as usize].generation,
        }
    }
}

pub struct Iter<'l, T, const N: usize> {
    list: &'l BatchList<T, N>,
    cursor: Option<SlotIndex>,
}

impl<'l, T, const N: usize> Iterator for Iter<'l, T, N> {
    type Item = &'l T;

    fn next(&mut self) -> Option<Self::Item> {
        let list = self.list;
        let entry = &list.slots[self.cursor? as usize];
        self.cursor = entry.next;
        entry.value.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    fn contents<const N: usize>(list: &BatchList<u32, N>) -> Vec<u32> {
        list.iter().copied().collect()
    }

    #[test]
    fn pops_in_fifo_order_with_decreasing_count() {
        let mut list = BatchList::<u32, 4>::new();
        for value in 1..=3 {
            list.push_back(value).unwrap();
        }
        for (expected, remaining) in [(1, 2), (2, 1), (3, 0)] {
            assert_eq!(list.pop_front(), Ok(expected));
            assert_eq!(list.count(), remaining);
        }
        assert!(list.is_empty());
    }

    #[test]
    fn empty_list_rejects_pop_and_peek() {
        let mut list = BatchList::<u32, 2>::new();
        assert_eq!(list.pop_front(), Err(FfsError::Error));
        assert_eq!(list.pop_back(), Err(FfsError::Error));
        assert_eq!(list.peek_front(), Err(FfsError::Error));
        assert_eq!(list.peek_back(), Err(FfsError::Error));
        assert_eq!(list.peek_at(0), Err(FfsError::Error));
        assert_eq!(list.pop_at(0), Err(FfsError::Error));
    }

    #[test]
    fn push_front_on_empty_list_is_also_the_back() {
        let mut list = BatchList::<u32, 2>::new();
        list.push_front(7).unwrap();
        assert_eq!(list.peek_back(), Ok(&7));
        list.push_front(6).unwrap();
        assert_eq!(list.peek_back(), Ok(&7));
        assert_eq!(list.peek_front(), Ok(&6));
    }

    #[test]
    fn full_arena_reports_overrun() {
        let mut list = BatchList::<u32, 2>::new();
        list.push_back(1).unwrap();
        list.push_back(2).unwrap();
        assert!(list.is_full());
        assert_eq!(list.push_back(3), Err(FfsError::Overrun));
        assert_eq!(list.push_front(3), Err(FfsError::Overrun));
        assert_eq!(contents(&list), [1, 2]);
    }

    #[test]
    fn positional_insert_and_pop() {
        let mut list = BatchList::<u32, 5>::new();
        list.push_back(1).unwrap();
        list.push_back(4).unwrap();
        list.insert_at(1, 2).unwrap();
        list.insert_at(2, 3).unwrap();
        list.insert_at(4, 5).unwrap();
        assert_eq!(contents(&list), [1, 2, 3, 4, 5]);
        assert_eq!(list.peek_at(3), Ok(&4));

        assert_eq!(list.pop_at(2), Ok(3));
        assert_eq!(list.pop_back(), Ok(5));
        assert_eq!(contents(&list), [1, 2, 4]);
        assert_eq!(list.insert_at(4, 9), Err(FfsError::Error));
        assert_eq!(list.peek_at(3), Err(FfsError::Error));
    }

    #[test]
    fn recycled_slot_invalidates_old_handle() {
        let mut list = BatchList::<u32, 1>::new();
        let first = list.push_back(10).unwrap();
        assert_eq!(list.get(first), Ok(&10));
        assert_eq!(list.pop_front(), Ok(10));

        let second = list.push_back(20).unwrap();
        assert_ne!(first, second);
        assert_eq!(list.get(first), Err(FfsError::Error));
        assert_eq!(list.remove(first), Err(FfsError::Error));
        assert_eq!(list.remove(second), Ok(20));
        assert!(list.is_empty());
    }

    #[test]
    fn slots_are_reused_after_clear() {
        let mut list = BatchList::<u32, 3>::new();
        for round in 0..4 {
            for value in 0..3 {
                list.push_back(round * 10 + value).unwrap();
            }
            assert_eq!(list.peek_front(), Ok(&(round * 10)));
            list.clear();
            assert!(list.is_empty());
        }
    }
}
