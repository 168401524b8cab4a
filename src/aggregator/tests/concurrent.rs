//! Tests for concurrent handler use

#[cfg(test)]
mod tests {
    use crate::aggregator::tests::{part, shared, RecordingProcessor};
    use crate::aggregator::{
        AggregatingMessageGroupProcessor, CorrelatingMessageHandler, ExpiryAction,
        MessageGroupProcessor, ProcessingResult,
    };
    use crate::channel::{MessageChannel, QueueChannel};
    use crate::message::CorrelationKey;
    use crate::store::{MessageGroup, MessageGroupStore, SimpleMessageStore};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    /// Processor that parks inside `process` until the test lets it go
    struct GatedProcessor {
        entered: Arc<Barrier>,
        proceed: Arc<Barrier>,
        calls: Arc<AtomicUsize>,
    }

    impl MessageGroupProcessor for GatedProcessor {
        fn process(
            &self,
            _group: &MessageGroup,
            _output: &dyn MessageChannel,
        ) -> ProcessingResult<()> {
            self.entered.wait();
            self.proceed.wait();
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_expiry_during_completion_processes_once() {
        let store = Arc::new(SimpleMessageStore::new());
        let entered = Arc::new(Barrier::new(2));
        let proceed = Arc::new(Barrier::new(2));
        let calls = Arc::new(AtomicUsize::new(0));
        let processor = GatedProcessor {
            entered: Arc::clone(&entered),
            proceed: Arc::clone(&proceed),
            calls: Arc::clone(&calls),
        };
        let handler = CorrelatingMessageHandler::builder(processor, store.clone())
            .output_channel(Arc::new(QueueChannel::new("out")))
            .expiry_action(ExpiryAction::ForceComplete)
            .build()
            .unwrap();

        handler.handle_message(part("k", 1, 2)).unwrap();
        let completing = {
            let handler = handler.clone();
            thread::spawn(move || handler.handle_message(part("k", 2, 2)))
        };

        // The completing thread holds the key lock inside the processor
        entered.wait();
        assert_eq!(store.expire_message_groups(Duration::ZERO).unwrap(), 0);
        proceed.wait();

        assert!(completing.join().unwrap().unwrap().is_released());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(handler.lock_count(), 0);

        // Nothing left for a later pass
        assert_eq!(store.expire_message_groups(Duration::ZERO).unwrap(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parallel_keys_all_release() {
        let store = Arc::new(SimpleMessageStore::new());
        let output = Arc::new(QueueChannel::new("out"));
        let recorder = Arc::new(RecordingProcessor::default());
        let handler = CorrelatingMessageHandler::builder(shared(&recorder), store.clone())
            .output_channel(output.clone())
            .build()
            .unwrap();

        let threads: u32 = 8;
        let keys_per_thread: u32 = 25;
        let parts: u32 = 4;
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let handler = handler.clone();
                thread::spawn(move || {
                    for number in 1..=parts {
                        for k in 0..keys_per_thread {
                            let key = format!("t{}-k{}", t, k);
                            handler.handle_message(part(&key, number, parts)).unwrap();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(recorder.calls(), (threads * keys_per_thread) as usize);
        assert_eq!(output.size().unwrap(), (threads * keys_per_thread * parts) as usize);
        assert_eq!(handler.lock_count(), 0);
        assert_eq!(store.message_group_count().unwrap(), 0);
    }

    #[test]
    fn test_shared_key_from_many_threads_releases_once() {
        let store = Arc::new(SimpleMessageStore::new());
        let recorder = Arc::new(RecordingProcessor::default());
        let handler = CorrelatingMessageHandler::builder(shared(&recorder), store.clone())
            .output_channel(Arc::new(QueueChannel::new("out")))
            .build()
            .unwrap();

        let size = 16;
        let handles: Vec<_> = (1..=size)
            .map(|number| {
                let handler = handler.clone();
                thread::spawn(move || handler.handle_message(part("shared", number, size)))
            })
            .collect();
        let released = handles
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap())
            .filter(|outcome| outcome.is_released())
            .count();

        assert_eq!(released, 1);
        assert_eq!(recorder.calls(), 1);
        assert_eq!(recorder.groups()[0].size(), size as usize);
        assert_eq!(handler.lock_count(), 0);
    }

    #[test]
    fn test_concurrent_expiry_never_loses_or_duplicates_messages() {
        let store = Arc::new(SimpleMessageStore::new());
        let output = Arc::new(QueueChannel::new("out"));
        let recorder = Arc::new(RecordingProcessor::default());
        let handler = CorrelatingMessageHandler::builder(shared(&recorder), store.clone())
            .output_channel(output.clone())
            .expiry_action(ExpiryAction::ForceComplete)
            .build()
            .unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let reaper = {
            let store = store.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::SeqCst) {
                    store.expire_message_groups(Duration::ZERO).unwrap();
                    thread::yield_now();
                }
            })
        };

        let keys = 50;
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let handler = handler.clone();
                thread::spawn(move || {
                    for k in 0..keys {
                        let key = format!("t{}-{}", t, k);
                        for number in 1..=2 {
                            handler.handle_message(part(&key, number, 2)).unwrap();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        done.store(true, Ordering::SeqCst);
        reaper.join().unwrap();

        // Anything still accumulating is force-completed now
        store.expire_message_groups(Duration::ZERO).unwrap();

        let delivered = output.clear().unwrap();
        assert_eq!(delivered.len(), 4 * keys * 2);
        let unique: HashSet<_> = delivered.iter().map(|message| message.id()).collect();
        assert_eq!(unique.len(), delivered.len());

        let keys_seen: HashSet<CorrelationKey> = recorder
            .groups()
            .iter()
            .map(|group| group.key().clone())
            .collect();
        assert_eq!(keys_seen.len(), 4 * keys);
        assert_eq!(handler.lock_count(), 0);
        assert_eq!(store.message_group_count().unwrap(), 0);
    }

    fn gated() -> (GatedProcessor, Arc<Barrier>, Arc<Barrier>, Arc<AtomicUsize>) {
        let entered = Arc::new(Barrier::new(2));
        let proceed = Arc::new(Barrier::new(2));
        let calls = Arc::new(AtomicUsize::new(0));
        let processor = GatedProcessor {
            entered: Arc::clone(&entered),
            proceed: Arc::clone(&proceed),
            calls: Arc::clone(&calls),
        };
        (processor, entered, proceed, calls)
    }

    #[test]
    fn test_shared_store_expiry_skips_group_completing_elsewhere() {
        let store = Arc::new(SimpleMessageStore::new());
        let recorder = Arc::new(RecordingProcessor::default());
        let idle = CorrelatingMessageHandler::builder(shared(&recorder), store.clone())
            .output_channel(Arc::new(QueueChannel::new("idle-out")))
            .expiry_action(ExpiryAction::ForceComplete)
            .build()
            .unwrap();
        let (processor, entered, proceed, calls) = gated();
        let busy = CorrelatingMessageHandler::builder(processor, store.clone())
            .output_channel(Arc::new(QueueChannel::new("busy-out")))
            .expiry_action(ExpiryAction::ForceComplete)
            .build()
            .unwrap();

        busy.handle_message(part("k", 1, 2)).unwrap();
        let completing = {
            let busy = busy.clone();
            thread::spawn(move || busy.handle_message(part("k", 2, 2)))
        };

        entered.wait();
        assert_eq!(store.expire_message_groups(Duration::ZERO).unwrap(), 0);
        proceed.wait();

        assert!(completing.join().unwrap().unwrap().is_released());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.calls(), 0);
        assert_eq!(idle.lock_count(), 0);
        assert_eq!(store.message_group_count().unwrap(), 0);
    }

    #[test]
    fn test_shared_store_key_fed_by_both_handlers_completes_once() {
        let store = Arc::new(SimpleMessageStore::new());
        let recorder = Arc::new(RecordingProcessor::default());
        let first = CorrelatingMessageHandler::builder(shared(&recorder), store.clone())
            .output_channel(Arc::new(QueueChannel::new("first-out")))
            .expiry_action(ExpiryAction::ForceComplete)
            .build()
            .unwrap();
        let (processor, entered, proceed, calls) = gated();
        let second = CorrelatingMessageHandler::builder(processor, store.clone())
            .output_channel(Arc::new(QueueChannel::new("second-out")))
            .expiry_action(ExpiryAction::ForceComplete)
            .build()
            .unwrap();

        // The first handler starts the group, the second completes it
        first.handle_message(part("k", 1, 2)).unwrap();
        let completing = {
            let second = second.clone();
            thread::spawn(move || second.handle_message(part("k", 2, 2)))
        };

        entered.wait();
        assert_eq!(store.expire_message_groups(Duration::ZERO).unwrap(), 0);
        proceed.wait();

        assert!(completing.join().unwrap().unwrap().is_released());
        assert_eq!(calls.load(Ordering::SeqCst) + recorder.calls(), 1);
        assert_eq!(first.lock_count(), 0);
        assert_eq!(store.message_group_count().unwrap(), 0);
    }

    #[test]
    fn test_shared_store_expires_only_own_groups() {
        let store = Arc::new(SimpleMessageStore::new());
        let first_discard = Arc::new(QueueChannel::new("first-discard"));
        let second_discard = Arc::new(QueueChannel::new("second-discard"));
        let first = CorrelatingMessageHandler::builder(
            AggregatingMessageGroupProcessor,
            store.clone(),
        )
        .discard_channel(first_discard.clone())
        .build()
        .unwrap();
        let second = CorrelatingMessageHandler::builder(
            AggregatingMessageGroupProcessor,
            store.clone(),
        )
        .discard_channel(second_discard.clone())
        .build()
        .unwrap();

        first.handle_message(part("x", 1, 2)).unwrap();
        second.handle_message(part("y", 1, 2)).unwrap();
        assert_eq!(store.expire_message_groups(Duration::ZERO).unwrap(), 2);

        let first_keys: Vec<String> = first_discard
            .clear()
            .unwrap()
            .iter()
            .map(|message| message.payload().to_string())
            .collect();
        let second_keys: Vec<String> = second_discard
            .clear()
            .unwrap()
            .iter()
            .map(|message| message.payload().to_string())
            .collect();
        assert_eq!(first_keys, vec!["x-1"]);
        assert_eq!(second_keys, vec!["y-1"]);
        assert_eq!(second.lock_count(), 0);
    }

    #[test]
    fn test_groups_of_dropped_handler_go_to_remaining_one() {
        let store = Arc::new(SimpleMessageStore::new());
        let discard = Arc::new(QueueChannel::new("discard"));
        let survivor = CorrelatingMessageHandler::builder(
            AggregatingMessageGroupProcessor,
            store.clone(),
        )
        .discard_channel(discard.clone())
        .build()
        .unwrap();
        let departed = CorrelatingMessageHandler::builder(
            AggregatingMessageGroupProcessor,
            store.clone(),
        )
        .build()
        .unwrap();

        departed.handle_message(part("orphan", 1, 2)).unwrap();
        drop(departed);

        assert_eq!(store.expire_message_groups(Duration::ZERO).unwrap(), 1);
        assert_eq!(discard.size().unwrap(), 1);
        assert_eq!(survivor.lock_count(), 0);
    }
}
