// End-to-end engine scenarios: submit/result round-trips, cancellation
// at dispatch, close semantics, and admission against a full queue.

#[cfg(test)]
mod tests {
    use crossbeam_channel::{bounded, unbounded};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    use prioriq::{
        CancelToken, CircularQueue, Engine, EngineError, HeapPriorityQueue, QueueError,
        RoundRobinQueue, TaskError, TaskQueue,
    };

    #[test]
    fn submit_returns_the_closure_value() {
        let queue = Arc::new(HeapPriorityQueue::new(100).unwrap());
        let engine: Engine<(), i32> = Engine::new(queue, 5).unwrap();

        let handle = engine
            .submit(CancelToken::new(), 1, |_, _| Ok(2), ())
            .unwrap();
        assert_eq!(handle.result().unwrap(), 2);
        engine.close();
    }

    #[test]
    fn cancelled_token_short_circuits_without_running() {
        let queue = Arc::new(HeapPriorityQueue::new(100).unwrap());
        let engine: Engine<(), i32> = Engine::new(queue, 5).unwrap();

        let ran = Arc::new(AtomicBool::new(false));
        let ran_probe = ran.clone();
        let token = CancelToken::new();
        token.cancel();

        let handle = engine
            .submit(
                token,
                1,
                move |_, _| {
                    ran_probe.store(true, Ordering::SeqCst);
                    Ok(2)
                },
                (),
            )
            .unwrap();

        let err = handle.result().unwrap_err();
        assert!(matches!(err, TaskError::Cancelled));
        assert!(!ran.load(Ordering::SeqCst));
        engine.close();
    }

    #[test]
    fn submit_after_close_is_rejected() {
        let queue = Arc::new(HeapPriorityQueue::new(100).unwrap());
        let engine: Engine<(), i32> = Engine::new(queue.clone(), 5).unwrap();
        engine.close();

        let err = engine
            .submit(CancelToken::new(), 1, |_, _| Ok(2), ())
            .unwrap_err();
        assert_eq!(err, EngineError::AlreadyClosed);
        // the queue went down with the engine, so parked workers exit
        assert_eq!(queue.pop_wait().unwrap_err(), QueueError::Closed);
        // a second close is a no-op
        engine.close();
    }

    #[test]
    fn user_errors_reach_the_handle() {
        let queue = Arc::new(HeapPriorityQueue::new(100).unwrap());
        let engine: Engine<(), i32> = Engine::new(queue, 2).unwrap();

        let handle = engine
            .submit(CancelToken::new(), 0, |_, _| Err("boom".into()), ())
            .unwrap();
        let err = handle.result().unwrap_err();
        assert!(matches!(err, TaskError::Failed(_)));
        assert_eq!(err.to_string(), "boom");
        engine.close();
    }

    #[test]
    fn result_is_a_one_shot_publication() {
        let queue = Arc::new(HeapPriorityQueue::new(100).unwrap());
        let engine: Engine<u64, u64> = Engine::new(queue, 3).unwrap();

        let handle = engine
            .submit(CancelToken::new(), 4, |_, arg| Ok(arg * 3), 14)
            .unwrap();
        let first = handle.result().unwrap();
        let second = handle.result().unwrap();
        assert_eq!(first, 42);
        assert_eq!(first, second);
        assert_eq!(handle.priority(), 4);
        assert!(handle.is_finished());
        engine.close();
    }

    #[test]
    fn concurrent_submissions_all_complete() {
        let queue = Arc::new(RoundRobinQueue::new(4096, 8).unwrap());
        let engine: Arc<Engine<u64, u64>> = Arc::new(Engine::new(queue, 4).unwrap());

        let (handle_tx, handle_rx) = unbounded();
        let producers: Vec<_> = (0..4u64)
            .map(|p| {
                let engine = engine.clone();
                let handle_tx = handle_tx.clone();
                thread::spawn(move || {
                    for i in 0..250u64 {
                        let value = p * 1000 + i;
                        let handle = engine
                            .submit(
                                CancelToken::new(),
                                (i % 8) as i32,
                                move |_, arg| Ok(arg * 2),
                                value,
                            )
                            .unwrap();
                        handle_tx.send((value, handle)).unwrap();
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }
        drop(handle_tx);

        let mut completed = 0;
        for (value, handle) in handle_rx {
            assert_eq!(handle.result().unwrap(), value * 2);
            completed += 1;
        }
        assert_eq!(completed, 1000);
        assert_eq!(engine.pending(), 0);
        engine.close();
    }

    #[test]
    fn full_queue_rejects_submission_and_leaves_no_orphan() {
        // one worker, capacity-one queue: park the worker on a gate,
        // fill the queue, and watch the third submission bounce
        let queue = Arc::new(CircularQueue::new(1).unwrap());
        let engine: Arc<Engine<(), i32>> = Arc::new(Engine::new(queue, 1).unwrap());

        let (started_tx, started_rx) = bounded::<()>(0);
        let (release_tx, release_rx) = bounded::<()>(0);
        let blocker = engine
            .submit(
                CancelToken::new(),
                0,
                move |_, _| {
                    started_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    Ok(0)
                },
                (),
            )
            .unwrap();
        // once the closure reports in, the queue slot is free again
        started_rx.recv().unwrap();

        let queued = engine
            .submit(CancelToken::new(), 0, |_, _| Ok(1), ())
            .unwrap();
        let err = engine
            .submit(CancelToken::new(), 0, |_, _| Ok(2), ())
            .unwrap_err();
        assert_eq!(err, EngineError::Queue(QueueError::Full));
        // the rejected submission must not leave a registry entry behind
        assert_eq!(engine.pending(), 1);

        release_tx.send(()).unwrap();
        assert_eq!(blocker.result().unwrap(), 0);
        assert_eq!(queued.result().unwrap(), 1);
        engine.close();
    }

    #[test]
    fn strict_queue_engine_prefers_high_priorities() {
        // single worker parked on a gate while three more submissions
        // pile up; the completion order of the rest follows the queue
        let queue = Arc::new(prioriq::StrictPriorityQueue::new(100, 16).unwrap());
        let engine: Arc<Engine<i32, i32>> = Arc::new(Engine::new(queue, 1).unwrap());

        let (started_tx, started_rx) = bounded::<()>(0);
        let (release_tx, release_rx) = bounded::<()>(0);
        let gate = engine
            .submit(
                CancelToken::new(),
                15,
                move |_, _| {
                    started_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    Ok(-1)
                },
                -1,
            )
            .unwrap();
        started_rx.recv().unwrap();

        let (order_tx, order_rx) = unbounded();
        let mut handles = Vec::new();
        for priority in [2, 9, 5] {
            let order_tx = order_tx.clone();
            handles.push(
                engine
                    .submit(
                        CancelToken::new(),
                        priority,
                        move |_, arg| {
                            order_tx.send(arg).unwrap();
                            Ok(arg)
                        },
                        priority,
                    )
                    .unwrap(),
            );
        }

        release_tx.send(()).unwrap();
        gate.result().unwrap();
        for handle in &handles {
            handle.wait();
        }
        let order: Vec<i32> = order_rx.try_iter().collect();
        assert_eq!(order, vec![9, 5, 2]);
        engine.close();
    }
}
