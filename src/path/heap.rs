/// Array-backed min-heap ordered by a caller-supplied score.
///
/// Unlike `std::collections::BinaryHeap`, elements can be removed or
/// re-positioned after their score changes, which A* needs when it finds a
/// cheaper route to a node already in the open set. Lookups for `remove` and
/// `rescore_element` are linear and use `PartialEq`.
pub struct BinaryHeap<T, F> {
    content: Vec<T>,
    score: F,
}

impl<T: PartialEq, F: Fn(&T) -> f32> BinaryHeap<T, F> {
    pub fn new(score: F) -> Self {
        Self {
            content: Vec::new(),
            score,
        }
    }

    pub fn push(&mut self, element: T) {
        self.content.push(element);
        let last = self.content.len() - 1;
        self.sift_up(last);
    }

    /// Remove and return the lowest-scored element.
    pub fn pop(&mut self) -> Option<T> {
        let last = self.content.pop()?;
        if self.content.is_empty() {
            return Some(last);
        }
        let top = std::mem::replace(&mut self.content[0], last);
        self.sift_down(0);
        Some(top)
    }

    /// Remove the element equal to `element`. Returns false if it was not queued.
    pub fn remove(&mut self, element: &T) -> bool {
        let Some(i) = self.position(element) else {
            return false;
        };
        let Some(end) = self.content.pop() else {
            return false;
        };
        if i == self.content.len() {
            return true;
        }
        let removed_score = (self.score)(&self.content[i]);
        let end_score = (self.score)(&end);
        self.content[i] = end;
        if end_score < removed_score {
            self.sift_up(i);
        } else {
            self.sift_down(i);
        }
        true
    }

    /// Replace the queued element equal to `element` and restore heap order.
    ///
    /// Returns false if no equal element is queued.
    pub fn rescore_element(&mut self, element: T) -> bool {
        let Some(i) = self.position(&element) else {
            return false;
        };
        self.content[i] = element;
        let i = self.sift_up(i);
        self.sift_down(i);
        true
    }

    pub fn peek(&self) -> Option<&T> {
        self.content.first()
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    fn position(&self, element: &T) -> Option<usize> {
        self.content.iter().position(|e| e == element)
    }

    /// Move the element at `n` toward the root; returns its final index.
    fn sift_up(&mut self, mut n: usize) -> usize {
        let score = (self.score)(&self.content[n]);
        while n > 0 {
            let parent = (n - 1) / 2;
            if score < (self.score)(&self.content[parent]) {
                self.content.swap(n, parent);
                n = parent;
            } else {
                break;
            }
        }
        n
    }

    /// Move the element at `n` toward the leaves, swapping with the smaller child.
    fn sift_down(&mut self, mut n: usize) {
        let len = self.content.len();
        let score = (self.score)(&self.content[n]);
        loop {
            let left = 2 * n + 1;
            let right = left + 1;
            let mut swap = None;
            let mut best = score;
            if left < len {
                let s = (self.score)(&self.content[left]);
                if s < best {
                    swap = Some(left);
                    best = s;
                }
            }
            if right < len && (self.score)(&self.content[right]) < best {
                swap = Some(right);
            }
            match swap {
                Some(child) => {
                    self.content.swap(n, child);
                    n = child;
                }
                None => break,
            }
        }
    }
}
