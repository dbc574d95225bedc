use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::simulation::id::serializable_type::StableTypeId;
use crate::simulation::id::Id;

pub trait EndTime {
    fn end_time(&self, now: u32) -> u32;
}

pub trait Identifiable<I: StableTypeId> {
    fn id(&self) -> &Id<I>;
}

struct Entry<T>
where
    T: EndTime,
{
    end_time: u32,
    order: usize,
    value: T,
}

impl<T> PartialEq<Self> for Entry<T>
where
    T: EndTime,
{
    fn eq(&self, other: &Self) -> bool {
        self.end_time == other.end_time && self.order == other.order
    }
}

impl<T> Eq for Entry<T> where T: EndTime {}

impl<T> PartialOrd<Self> for Entry<T>
where
    T: EndTime,
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T>
where
    T: EndTime,
{
    fn cmp(&self, other: &Self) -> Ordering {
        // min heap on end time, FIFO within the same end time
        other
            .end_time
            .cmp(&self.end_time)
            .then_with(|| other.order.cmp(&self.order))
    }
}

/// Queue of values which wake up at their end time. Values with the same end time come out in
/// the order they were added.
pub struct TimeQueue<T>
where
    T: EndTime,
{
    q: BinaryHeap<Entry<T>>,
    counter: usize,
}

impl<T> Default for TimeQueue<T>
where
    T: EndTime,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimeQueue<T>
where
    T: EndTime,
{
    pub fn new() -> Self {
        TimeQueue {
            q: BinaryHeap::new(),
            counter: 0,
        }
    }

    pub fn add(&mut self, value: T, now: u32) {
        let end_time = value.end_time(now);
        let order = self.counter;
        self.counter += 1;
        self.q.push(Entry {
            end_time,
            order,
            value,
        });
    }

    /// Removes all values with an end time up to and including `now`.
    pub fn pop(&mut self, now: u32) -> Vec<T> {
        let mut result: Vec<T> = Vec::new();

        while let Some(entry_ref) = self.q.peek() {
            if entry_ref.end_time <= now {
                if let Some(entry) = self.q.pop() {
                    result.push(entry.value);
                }
            } else {
                break;
            }
        }

        result
    }

    /// The earliest end time in the queue.
    pub fn next_time(&self) -> Option<u32> {
        self.q.peek().map(|e| e.end_time)
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct TestItem {
        id: u32,
        end: u32,
    }

    impl EndTime for TestItem {
        fn end_time(&self, _now: u32) -> u32 {
            self.end
        }
    }

    #[test]
    fn stable_ordering() {
        let mut queue: TimeQueue<TestItem> = TimeQueue::new();

        queue.add(TestItem { id: 1, end: 10 }, 0);
        queue.add(TestItem { id: 2, end: 10 }, 0);
        queue.add(TestItem { id: 3, end: 10 }, 0);

        let results = queue.pop(10);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, 1);
        assert_eq!(results[1].id, 2);
        assert_eq!(results[2].id, 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn time_ordering_first() {
        let mut queue: TimeQueue<TestItem> = TimeQueue::new();

        queue.add(TestItem { id: 1, end: 15 }, 0);
        queue.add(TestItem { id: 2, end: 10 }, 0);
        queue.add(TestItem { id: 3, end: 20 }, 0);
        queue.add(TestItem { id: 4, end: 10 }, 0);
        assert_eq!(Some(10), queue.next_time());

        let results = queue.pop(10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 2);
        assert_eq!(results[1].id, 4);
        assert_eq!(Some(15), queue.next_time());

        assert!(queue.pop(14).is_empty());
        assert_eq!(queue.pop(15)[0].id, 1);
        assert_eq!(queue.pop(20)[0].id, 3);
        assert_eq!(None, queue.next_time());
    }
}
