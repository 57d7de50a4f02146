//! Disposal list: beans with a destroy hook, in construction completion order.

use parking_lot::Mutex;

/// Beans are destroyed in reverse of the order they were pushed.
#[derive(Debug, Default)]
pub(crate) struct DisposeBag {
    beans: Mutex<Vec<usize>>,
}

impl DisposeBag {
    pub(crate) fn push(&self, id: usize) {
        self.beans.lock().push(id);
    }

    /// Forgets a bean that no longer needs destroying.
    pub(crate) fn remove(&self, id: usize) {
        self.beans.lock().retain(|bean| *bean != id);
    }

    /// Takes every entry, last pushed first.
    pub(crate) fn drain_reverse(&self) -> Vec<usize> {
        let mut beans = std::mem::take(&mut *self.beans.lock());
        beans.reverse();
        beans
    }

    pub(crate) fn len(&self) -> usize {
        self.beans.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.beans.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_lifo_once() {
        let bag = DisposeBag::default();
        bag.push(3);
        bag.push(1);
        bag.push(2);
        assert_eq!(bag.len(), 3);
        assert_eq!(bag.drain_reverse(), vec![2, 1, 3]);
        assert!(bag.is_empty());
        assert!(bag.drain_reverse().is_empty());
    }

    #[test]
    fn removed_entries_are_not_drained() {
        let bag = DisposeBag::default();
        bag.push(4);
        bag.push(7);
        bag.remove(4);
        bag.remove(9);
        assert_eq!(bag.drain_reverse(), vec![7]);
    }
}
