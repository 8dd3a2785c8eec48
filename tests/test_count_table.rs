#[cfg(test)]
mod count_table_tests {
    use katss::kmers::count_table::*;
    use katss::KatssError;

    #[test]
    fn dense_and_sparse_agree() {
        let keys = [3, 3, 7, 0, 15, 3];
        for storage in [Storage::Dense, Storage::Sparse] {
            let table = CountTable::new(2, storage).unwrap();
            table.increment_many(&keys);
            table.increment(7);
            assert_eq!(table.get(3), 3, "{storage:?}");
            assert_eq!(table.get(7), 2);
            assert_eq!(table.get(1), 0);
            assert_eq!(table.total(), 7);
            assert_eq!(
                table.nonzero_entries(),
                vec![(0, 1), (3, 3), (7, 2), (15, 1)]
            );
        }
    }

    #[test]
    fn decrement_clamps_at_zero() {
        let table = CountTable::new(3, Storage::Sparse).unwrap();
        table.increment(5);
        assert_eq!(table.decrement(5), Decrement::Applied);
        assert_eq!(table.decrement(5), Decrement::Underflow);
        assert_eq!(table.decrement(9), Decrement::Underflow);
        assert_eq!(table.get(5), 0);
        assert_eq!(table.total(), 0);
    }

    #[test]
    fn batched_decrements_report_underflows() {
        let table = CountTable::new(2, Storage::Dense).unwrap();
        table.increment_many(&[1, 1, 2]);
        assert_eq!(table.decrement_many(&[1, 2, 2, 3]), 2);
        assert_eq!(table.get(1), 1);
        assert_eq!(table.get(2), 0);
        assert_eq!(table.total(), 1);
    }

    #[test]
    fn new_table_is_zeroed() {
        let table = CountTable::new(4, Storage::Auto).unwrap();
        assert!(table.is_dense());
        assert_eq!(table.num_keys(), 256);
        assert_eq!(table.total(), 0);
        assert!(table.nonzero_entries().is_empty());
    }

    #[test]
    fn kmer_size_is_validated() {
        assert!(matches!(
            CountTable::new(0, Storage::Auto),
            Err(KatssError::InvalidKmerSize(0))
        ));
        assert!(matches!(
            CountTable::new(17, Storage::Sparse),
            Err(KatssError::InvalidKmerSize(17))
        ));
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let table = CountTable::new(2, Storage::Dense).unwrap();
        std::thread::scope(|s| {
            for t in 0..8u32 {
                let table = &table;
                s.spawn(move || {
                    let keys = vec![t % 16; 1000];
                    table.increment_many(&keys);
                });
            }
        });
        assert_eq!(table.total(), 8000);
        assert_eq!(table.get(0), 1000);
    }
}
