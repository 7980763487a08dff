/// Binary min-heap whose ordering key is evaluated on demand rather than stored per element.
/// Keys may change between operations as long as the change happens before the next
/// re-heapification touches the element.
#[derive(Clone, Debug)]
pub struct MinHeap<T> {
    items: Vec<T>,
}

impl<T> Default for MinHeap<T> {
    fn default() -> MinHeap<T> {
        MinHeap { items: Vec::new() }
    }
}

impl<T> MinHeap<T> {
    pub fn new() -> MinHeap<T> {
        MinHeap::default()
    }

    pub fn with_capacity(capacity: usize) -> MinHeap<T> {
        MinHeap {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn peek_min(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn insert_by<K, F>(&mut self, item: T, key: F)
    where
        K: PartialOrd,
        F: Fn(&T) -> K,
    {
        self.items.push(item);

        let last = self.items.len() - 1;

        self.sift_up(last, &key);
    }

    pub fn remove_min_by<K, F>(&mut self, key: F) -> Option<T>
    where
        K: PartialOrd,
        F: Fn(&T) -> K,
    {
        self.remove_at(0, &key)
    }

    /// Removes the first element matching `predicate`, restoring heap order afterwards.
    pub fn remove_where<K, F, P>(&mut self, predicate: P, key: F) -> Option<T>
    where
        K: PartialOrd,
        F: Fn(&T) -> K,
        P: Fn(&T) -> bool,
    {
        let index = self.items.iter().position(predicate)?;

        self.remove_at(index, &key)
    }

    /// Element with the largest key. Linear scan.
    pub fn peek_max_by<K, F>(&self, key: F) -> Option<&T>
    where
        K: PartialOrd,
        F: Fn(&T) -> K,
    {
        let mut best: Option<(&T, K)> = None;

        for item in self.items.iter() {
            let item_key = key(item);

            let replace = match &best {
                Some((_, best_key)) => item_key > *best_key,
                None => true,
            };

            if replace {
                best = Some((item, item_key));
            }
        }

        best.map(|(item, _)| item)
    }

    fn remove_at<K, F>(&mut self, index: usize, key: &F) -> Option<T>
    where
        K: PartialOrd,
        F: Fn(&T) -> K,
    {
        if index >= self.items.len() {
            return None;
        }

        let item = self.items.swap_remove(index);

        if index < self.items.len() {
            self.sift_down(index, key);
            self.sift_up(index, key);
        }

        Some(item)
    }

    fn sift_up<K, F>(&mut self, mut index: usize, key: &F)
    where
        K: PartialOrd,
        F: Fn(&T) -> K,
    {
        while index > 0 {
            let parent = (index - 1) / 2;

            if key(&self.items[index]) < key(&self.items[parent]) {
                self.items.swap(index, parent);
                index = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down<K, F>(&mut self, mut index: usize, key: &F)
    where
        K: PartialOrd,
        F: Fn(&T) -> K,
    {
        let len = self.items.len();

        loop {
            let left = index * 2 + 1;
            let right = left + 1;
            let mut smallest = index;

            if left < len && key(&self.items[left]) < key(&self.items[smallest]) {
                smallest = left;
            }

            if right < len && key(&self.items[right]) < key(&self.items[smallest]) {
                smallest = right;
            }

            if smallest == index {
                break;
            }

            self.items.swap(index, smallest);
            index = smallest;
        }
    }
}

impl<T: PartialEq> MinHeap<T> {
    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }
}

/// `MinHeap` that owns its key function.
pub struct KeyedMinHeap<T, F> {
    heap: MinHeap<T>,
    key: F,
}

impl<T, K, F> KeyedMinHeap<T, F>
where
    K: PartialOrd,
    F: Fn(&T) -> K,
{
    pub fn new(key: F) -> KeyedMinHeap<T, F> {
        KeyedMinHeap { heap: MinHeap::new(), key }
    }

    pub fn from_items<I>(items: I, key: F) -> KeyedMinHeap<T, F>
    where
        I: IntoIterator<Item = T>,
    {
        let mut heap = KeyedMinHeap::new(key);

        for item in items {
            heap.insert(item);
        }

        heap
    }

    pub fn insert(&mut self, item: T) {
        self.heap.insert_by(item, &self.key);
    }

    pub fn remove_min(&mut self) -> Option<T> {
        self.heap.remove_min_by(&self.key)
    }

    pub fn peek_min(&self) -> Option<&T> {
        self.heap.peek_min()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<T: PartialEq, K, F> KeyedMinHeap<T, F>
where
    K: PartialOrd,
    F: Fn(&T) -> K,
{
    pub fn contains(&self, item: &T) -> bool {
        self.heap.contains(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_heap_returns_none() {
        let mut heap = KeyedMinHeap::new(|v: &u32| *v);

        assert!(heap.remove_min().is_none());
        assert!(heap.peek_min().is_none());
        assert_eq!(heap.len(), 0);
    }

    #[test]
    fn orders_by_external_key() {
        let distances = [7.5f32, 1.0, 3.25, 9.0];
        let mut heap = KeyedMinHeap::from_items(0..distances.len(), |i: &usize| distances[*i]);

        assert!(heap.contains(&2));
        assert_eq!(heap.remove_min(), Some(1));
        assert_eq!(heap.remove_min(), Some(2));
        assert_eq!(heap.remove_min(), Some(0));
        assert_eq!(heap.remove_min(), Some(3));
        assert_eq!(heap.remove_min(), None);
    }

    #[test]
    fn remove_where_keeps_order() {
        let mut heap = MinHeap::new();

        for v in [5, 3, 8, 1, 9, 2] {
            heap.insert_by(v, |v: &i32| *v);
        }

        assert_eq!(heap.peek_max_by(|v: &i32| *v), Some(&9));
        assert_eq!(heap.remove_where(|v| *v == 3, |v: &i32| *v), Some(3));
        assert_eq!(heap.remove_where(|v| *v == 42, |v: &i32| *v), None);

        let mut drained = Vec::new();

        while let Some(v) = heap.remove_min_by(|v: &i32| *v) {
            drained.push(v);
        }

        assert_eq!(drained, vec![1, 2, 5, 8, 9]);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(i32),
        Remove,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![(-100i32..100).prop_map(Op::Insert), Just(Op::Remove)]
    }

    proptest! {
        #[test]
        fn remove_min_returns_minimum(ops in proptest::collection::vec(op(), 0..200)) {
            let mut heap = MinHeap::new();
            let mut model: Vec<i32> = Vec::new();

            for op in ops {
                match op {
                    Op::Insert(v) => {
                        heap.insert_by(v, |v: &i32| *v);
                        model.push(v);
                    }
                    Op::Remove => {
                        let expected = model.iter().copied().min();

                        if let Some(min) = expected {
                            let index = model.iter().position(|v| *v == min).unwrap();
                            model.swap_remove(index);
                        }

                        prop_assert_eq!(heap.remove_min_by(|v: &i32| *v), expected);
                    }
                }

                prop_assert_eq!(heap.len(), model.len());
            }
        }
    }
}
