/*! Ranking measured regions into fixed capacity output slots. */

/// Order items by a size metric, largest first, and keep at most `capacity` of them.
///
/// Returns indices into `items` for the kept entries, in storage order. Ties keep their
/// discovery order so the result is deterministic. The caller records the true item count
/// separately, truncation here is silent.
pub fn rank_and_bound<T, F>(items: &[T], capacity: usize, size: F) -> Vec<usize>
where
    F: Fn(&T) -> usize,
{
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| size(&items[b]).cmp(&size(&items[a])).then(a.cmp(&b)));
    order.truncate(capacity);
    order
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ranks_descending_and_truncates() {
        let sizes = vec![3usize, 10, 1, 7, 7, 2];

        let order = rank_and_bound(&sizes, 4, |&s| s);
        assert_eq!(order, vec![1, 3, 4, 0]);

        let order = rank_and_bound(&sizes, 10, |&s| s);
        assert_eq!(order, vec![1, 3, 4, 0, 5, 2]);

        let order = rank_and_bound(&sizes, 0, |&s| s);
        assert!(order.is_empty());

        let empty: Vec<usize> = Vec::new();
        assert!(rank_and_bound(&empty, 4, |&s| s).is_empty());
    }
}
