//! Concurrent buffer behaviour

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::{Duration, Instant};

    use assert_matches::assert_matches;
    use proven_warehouse::{
        BoundedBuffer, BufferSnapshot, CapacityConfig, PutOutcome, WarehouseListener,
    };

    #[derive(Default)]
    struct MaxLen(AtomicUsize);

    impl WarehouseListener<(usize, usize)> for MaxLen {
        fn on_put_full(&self, snapshot: &BufferSnapshot, _item: &(usize, usize)) {
            self.0.fetch_max(snapshot.len, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_concurrent_puts_keep_per_producer_order() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 500;

        let observed = Arc::new(MaxLen::default());
        let buffer = Arc::new(
            BoundedBuffer::new(CapacityConfig::new(8).with_max_capacity(8))
                .expect("Failed to create buffer")
                .with_listener(observed.clone()),
        );

        let putters: Vec<_> = (0..PRODUCERS)
            .map(|producer| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    for seq in 0..PER_PRODUCER {
                        assert!(buffer.put((producer, seq)).is_inserted());
                    }
                })
            })
            .collect();

        let getter = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                let mut next = [0usize; PRODUCERS];
                let mut max_len = 0;
                for _ in 0..PRODUCERS * PER_PRODUCER {
                    max_len = max_len.max(buffer.len());
                    let (producer, seq) = buffer.get();
                    assert_eq!(seq, next[producer], "items of one producer out of order");
                    next[producer] += 1;
                }
                max_len
            })
        };

        for putter in putters {
            putter.join().expect("putter panicked");
        }
        let max_len = getter.join().expect("getter panicked");

        assert!(max_len <= 8);
        assert!(observed.0.load(Ordering::SeqCst) <= 8);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drop_on_full_burst_never_blocks() {
        let config = CapacityConfig::new(5).with_waiting_disabled_on_full(true);
        let buffer = BoundedBuffer::new(config).expect("Failed to create buffer");

        let started = Instant::now();
        let outcomes: Vec<_> = (0..12).map(|i| buffer.put(i)).collect();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(buffer.len(), 5);
        assert_eq!(outcomes.iter().filter(|o| o.is_inserted()).count(), 5);
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| matches!(o, PutOutcome::Dropped(_)))
                .count(),
            7
        );
        assert_eq!(buffer.drain(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_wake_all_does_not_disturb_plain_waiters() {
        let buffer = Arc::new(
            BoundedBuffer::<u32>::new(CapacityConfig::new(2)).expect("Failed to create buffer"),
        );

        let getter = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || buffer.get())
        };

        thread::sleep(Duration::from_millis(50));
        buffer.wake_all();
        thread::sleep(Duration::from_millis(50));
        assert!(!getter.is_finished());

        assert_matches!(buffer.put(7), PutOutcome::Inserted);
        assert_eq!(getter.join().expect("getter panicked"), 7);
    }
}
