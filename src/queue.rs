//! A plain FIFO queue whose drain loop observes live mutation.

use core::fmt;

use alloc::collections::vec_deque::{self, VecDeque};

/// A first-in, first-out queue.
///
/// A thin wrapper over [`VecDeque`] with the enqueue/dequeue vocabulary and
/// one extra: [`dequeue_each`](Fifo::dequeue_each), a drain loop that keeps
/// going until the queue is empty *at that moment*, so elements enqueued by
/// the callback itself are drained in the same call.
///
/// # Examples
///
/// ```
/// use tagmap::Fifo;
///
/// let mut q = Fifo::new();
/// q.enqueue(1);
/// q.enqueue(2);
/// assert_eq!(q.dequeue(), Some(1));
/// assert_eq!(q.dequeue(), Some(2));
/// assert_eq!(q.dequeue(), None);
/// ```
pub struct Fifo<T> {
    items: VecDeque<T>,
}

impl<T> Fifo<T> {
    /// Creates an empty queue.
    #[inline]
    pub fn new() -> Self {
        Self { items: VecDeque::new() }
    }

    /// Creates an empty queue holding at least `n` elements without
    /// reallocating.
    #[inline]
    pub fn with_capacity(n: usize) -> Self {
        Self { items: VecDeque::with_capacity(n) }
    }

    /// Number of queued elements.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the queue is empty.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Appends `item` at the back.
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn enqueue(&mut self, item: T) {
        self.items.push_back(item);
    }

    /// Removes and returns the oldest element, or `None` if empty.
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn dequeue(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Returns the oldest element without removing it.
    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.items.front()
    }

    /// Drains the queue in FIFO order, calling `f` once per element.
    ///
    /// The callback receives the queue itself alongside each element, so it
    /// may enqueue further work; anything enqueued mid-drain is dequeued
    /// before the call returns.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagmap::Fifo;
    ///
    /// let mut q = Fifo::new();
    /// q.enqueue(3);
    /// let mut seen = Vec::new();
    /// q.dequeue_each(|q, n| {
    ///     seen.push(n);
    ///     if n > 1 {
    ///         q.enqueue(n - 1); // drained by this same call
    ///     }
    /// });
    /// assert_eq!(seen, vec![3, 2, 1]);
    /// assert!(q.is_empty());
    /// ```
    pub fn dequeue_each<F: FnMut(&mut Self, T)>(&mut self, mut f: F) {
        while let Some(item) = self.dequeue() {
            f(self, item);
        }
    }

    /// Removes every element.
    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterates the queued elements front to back without removing them.
    #[inline]
    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> Default for Fifo<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for Fifo<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self { items: self.items.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for Fifo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for Fifo<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Eq> Eq for Fifo<T> {}

impl<T> FromIterator<T> for Fifo<T> {
    #[inline]
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self { items: VecDeque::from_iter(iter) }
    }
}

impl<T> Extend<T> for Fifo<T> {
    #[inline]
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl<T> IntoIterator for Fifo<T> {
    type Item = T;
    type IntoIter = vec_deque::IntoIter<T>;

    /// Consumes the queue, yielding elements in FIFO order.
    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Fifo<T> {
    type Item = &'a T;
    type IntoIter = vec_deque::Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
