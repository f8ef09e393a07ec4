//! # End-to-End Query Scenarios
//!
//! Drives `QueryBridge` through the in-memory loopback against a scripted
//! peer. Each test covers one observable behavior of a dispatched query:
//! chunk reassembly, failure before allocation, action outcomes, timeouts and
//! the discard path for late or duplicate results.

#[cfg(test)]
mod tests {
    use crate::integration::mock_peer::{records, split_search, Script, TestChannel};
    use a11y_query_bridge::{BridgeConfig, PendingStats, QueryError};
    use shared_types::{
        ActionType, ElementQueryResult, ElementRecord, FocusMoveDirection, FocusType, QueryArgs,
        QueryKind, ResultEvent, SearchMode, WindowId, TERMINAL_CHUNK_INDEX,
    };
    use std::collections::BTreeMap;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn registered(stats: &PendingStats) -> u64 {
        stats.total_registered.load(Ordering::Relaxed)
    }

    fn completed(stats: &PendingStats) -> u64 {
        stats.total_completed.load(Ordering::Relaxed)
    }

    fn discarded(stats: &PendingStats) -> u64 {
        stats.total_discarded.load(Ordering::Relaxed)
    }

    /// Yield until `condition` holds; fails the test after one second.
    async fn settle<F: Fn() -> bool>(condition: F) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while !condition() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("condition not reached");
    }

    // =============================================================================
    // SEARCH BY ACCESSIBILITY ID
    // =============================================================================

    /// Two full chunks then an empty terminal chunk reassemble to 2000 records
    #[tokio::test]
    async fn test_search_by_id_two_full_chunks_and_empty_terminal() {
        let channel = TestChannel::start(BridgeConfig::default(), &[3], |query| {
            assert_eq!(
                query.args,
                QueryArgs::SearchById {
                    element_id: 7,
                    mode: SearchMode::from_bits(0),
                }
            );
            Script::Answer(vec![
                ElementQueryResult::SearchById {
                    records: records(3, 0, 1000),
                    chunk_index: 0,
                },
                ElementQueryResult::SearchById {
                    records: records(3, 1000, 1000),
                    chunk_index: 1,
                },
                ElementQueryResult::SearchById {
                    records: Vec::new(),
                    chunk_index: TERMINAL_CHUNK_INDEX,
                },
            ])
        });

        let result = channel
            .bridge
            .dispatcher()
            .search_element_infos_by_accessibility_id(
                WindowId::new(3),
                7,
                SearchMode::from_bits(0),
            )
            .await
            .expect("search should succeed");

        assert_eq!(result.len(), 2000);
        assert!(result.iter().all(ElementRecord::is_valid));
        let ids: Vec<i64> = result.iter().map(|r| r.accessibility_id).collect();
        assert_eq!(ids, (0..2000).collect::<Vec<_>>());

        let pending = channel.bridge.pending();
        assert_eq!(pending.pending_count(), 0);
        assert_eq!(pending.accumulations_in_progress(), 0);
        assert_eq!(completed(pending.stats()), 1);
    }

    /// Results split by the peer-side splitter come back whole and in order
    #[tokio::test]
    async fn test_search_by_id_split_by_peer() {
        let channel = TestChannel::start(BridgeConfig::default(), &[5], |query| {
            let root = query.args.element_id();
            Script::Answer(split_search(records(5, root, 2500)))
        });

        let result = channel
            .bridge
            .dispatcher()
            .search_element_infos_by_accessibility_id(
                WindowId::new(5),
                100,
                SearchMode::CHILDREN | SearchMode::RECURSIVE_CHILDREN,
            )
            .await
            .unwrap();

        assert_eq!(result, records(5, 100, 2500));
    }

    /// A small result arrives as a single terminal delivery
    #[tokio::test]
    async fn test_search_by_id_single_delivery() {
        let channel = TestChannel::start(BridgeConfig::default(), &[3], |_| {
            Script::Answer(split_search(records(3, 0, 12)))
        });

        let result = channel
            .bridge
            .dispatcher()
            .search_element_infos_by_accessibility_id(WindowId::new(3), 0, SearchMode::NONE)
            .await
            .unwrap();
        assert_eq!(result.len(), 12);
        assert_eq!(channel.bridge.pending().accumulations_in_progress(), 0);
    }

    /// One undefined record invalidates the whole reassembled batch
    #[tokio::test]
    async fn test_search_by_id_undefined_record_fails_batch() {
        let channel = TestChannel::start(BridgeConfig::default(), &[3], |_| {
            let mut last = records(3, 1000, 5);
            last.push(ElementRecord::undefined());
            Script::Answer(vec![
                ElementQueryResult::SearchById {
                    records: records(3, 0, 1000),
                    chunk_index: 0,
                },
                ElementQueryResult::SearchById {
                    records: last,
                    chunk_index: TERMINAL_CHUNK_INDEX,
                },
            ])
        });

        let err = channel
            .bridge
            .dispatcher()
            .search_element_infos_by_accessibility_id(WindowId::new(3), 0, SearchMode::NONE)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QueryError::InvalidRemoteResult {
                kind: QueryKind::SearchById,
                ..
            }
        ));
        assert_eq!(channel.bridge.pending().pending_count(), 0);
    }

    // =============================================================================
    // CHANNEL AVAILABILITY
    // =============================================================================

    /// A disconnected window fails before any key is allocated
    #[tokio::test]
    async fn test_find_focused_without_channel() {
        let channel = TestChannel::start(BridgeConfig::default(), &[3], |_| {
            Script::Answer(vec![ElementQueryResult::FindFocused {
                record: ElementRecord::new(1, WindowId::new(3)),
            }])
        });
        channel.registry.disconnect(WindowId::new(3));

        let err = channel
            .bridge
            .dispatcher()
            .find_focused_element_info(WindowId::new(3), 0, FocusType::Input)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            QueryError::ChannelUnavailable {
                window_id: WindowId::new(3)
            }
        );
        assert!(err.is_retryable());
        assert_eq!(registered(channel.bridge.pending().stats()), 0);
        assert!(channel.peer.seen().is_empty());
    }

    /// After a reconnect the same window can be queried again
    #[tokio::test]
    async fn test_query_after_reconnect() {
        let channel = TestChannel::start(BridgeConfig::default(), &[], |query| {
            Script::Answer(vec![ElementQueryResult::FocusMove {
                record: ElementRecord::new(query.args.element_id() + 1, query.window_id),
            }])
        });
        let dispatcher = channel.bridge.dispatcher();

        let err = dispatcher
            .focus_move_search(WindowId::new(8), 4, FocusMoveDirection::Right)
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::ChannelUnavailable { .. }));

        channel.registry.connect(WindowId::new(8));
        let record = dispatcher
            .focus_move_search(WindowId::new(8), 4, FocusMoveDirection::Right)
            .await
            .unwrap();
        assert_eq!(record.accessibility_id, 5);
        assert_eq!(channel.peer.seen().len(), 1);
    }

    /// Shutting the bridge down delivers nothing; waiting callers run to their deadline
    #[tokio::test(start_paused = true)]
    async fn test_shutdown_leaves_waiters_to_time_out() {
        let mut channel = TestChannel::start(BridgeConfig::default(), &[2], |_| Script::Silent);
        let dispatcher = channel.bridge.dispatcher();
        let call = tokio::spawn(async move {
            dispatcher
                .search_element_infos_by_text(WindowId::new(2), 0, "Cancel")
                .await
        });

        let pending = channel.bridge.pending();
        settle(|| pending.pending_count() == 1).await;
        let shut_down_at = tokio::time::Instant::now();
        channel.bridge.shutdown();
        assert!(!channel.bridge.is_running());

        match call.await.unwrap() {
            Err(QueryError::Timeout { kind, .. }) => assert_eq!(kind, QueryKind::SearchByText),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(shut_down_at.elapsed() >= Duration::from_millis(5000));
        assert_eq!(pending.pending_count(), 0);
    }

    // =============================================================================
    // EXECUTE ACTION
    // =============================================================================

    /// A failed action is a successful query with a false outcome
    #[tokio::test]
    async fn test_execute_action_reports_false() {
        let channel = TestChannel::start(BridgeConfig::default(), &[3], |query| {
            match &query.args {
                QueryArgs::ExecuteAction {
                    action, arguments, ..
                } => {
                    assert_eq!(*action, ActionType::SetText);
                    assert_eq!(arguments.get("text").map(String::as_str), Some("hello"));
                }
                other => panic!("unexpected query {:?}", other),
            }
            Script::Answer(vec![ElementQueryResult::ExecuteAction { succeeded: false }])
        });

        let mut arguments = BTreeMap::new();
        arguments.insert("text".to_string(), "hello".to_string());
        let outcome = channel
            .bridge
            .dispatcher()
            .execute_action(WindowId::new(3), 42, ActionType::SetText, arguments)
            .await;

        assert_eq!(outcome, Ok(false));
        assert_eq!(channel.bridge.pending().pending_count(), 0);
    }

    // =============================================================================
    // TIMEOUTS AND DISCARDS
    // =============================================================================

    /// A silent peer makes the query time out after the configured bound
    #[tokio::test(start_paused = true)]
    async fn test_silent_peer_times_out() {
        let channel = TestChannel::start(BridgeConfig::default(), &[3], |_| Script::Silent);

        let started = tokio::time::Instant::now();
        let err = channel
            .bridge
            .dispatcher()
            .find_focused_element_info(WindowId::new(3), 0, FocusType::Accessibility)
            .await
            .unwrap_err();

        assert!(started.elapsed() >= Duration::from_millis(5000));
        match err {
            QueryError::Timeout {
                kind, elapsed_ms, ..
            } => {
                assert_eq!(kind, QueryKind::FindFocused);
                assert!(elapsed_ms >= 5000);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(channel.bridge.pending().pending_count(), 0);
    }

    /// An answer arriving after the timeout is discarded without effect
    #[tokio::test(start_paused = true)]
    async fn test_late_answer_discarded() {
        let config = BridgeConfig {
            request_timeout: Duration::from_millis(200),
            ..Default::default()
        };
        let channel = TestChannel::start(config, &[3], |_| {
            Script::AnswerAfter(
                Duration::from_millis(500),
                vec![ElementQueryResult::ExecuteAction { succeeded: true }],
            )
        });

        let err = channel
            .bridge
            .dispatcher()
            .execute_action(WindowId::new(3), 1, ActionType::Click, BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Timeout { .. }));

        tokio::time::sleep(Duration::from_millis(500)).await;
        let pending = channel.bridge.pending();
        settle(|| discarded(pending.stats()) == 1).await;
        assert_eq!(completed(pending.stats()), 0);
        assert_eq!(pending.pending_count(), 0);
    }

    /// A duplicate of an already delivered result is dropped
    #[tokio::test]
    async fn test_duplicate_result_discarded() {
        let channel = TestChannel::start(BridgeConfig::default(), &[4], |_| {
            Script::Answer(vec![ElementQueryResult::ExecuteAction { succeeded: true }])
        });

        let outcome = channel
            .bridge
            .dispatcher()
            .execute_action(WindowId::new(4), 9, ActionType::Focus, BTreeMap::new())
            .await;
        assert_eq!(outcome, Ok(true));

        let key = channel.peer.seen()[0].correlation_key;
        channel
            .inject
            .send(ResultEvent::new(
                key,
                ElementQueryResult::ExecuteAction { succeeded: false },
            ))
            .await
            .unwrap();

        let pending = channel.bridge.pending();
        settle(|| discarded(pending.stats()) == 1).await;
        assert_eq!(completed(pending.stats()), 1);
    }

    /// A result of the wrong kind is dropped and the real answer still lands
    #[tokio::test]
    async fn test_mismatched_kind_then_correct_result() {
        let channel = TestChannel::start(BridgeConfig::default(), &[6], |query| {
            Script::Answer(vec![
                ElementQueryResult::ExecuteAction { succeeded: true },
                ElementQueryResult::FindFocused {
                    record: ElementRecord::new(77, query.window_id).with_text("focused"),
                },
            ])
        });

        let record = channel
            .bridge
            .dispatcher()
            .find_focused_element_info(WindowId::new(6), 0, FocusType::Input)
            .await
            .unwrap();
        assert_eq!(record.accessibility_id, 77);
        assert_eq!(record.text, "focused");
        assert_eq!(discarded(channel.bridge.pending().stats()), 1);
    }

    // =============================================================================
    // CONCURRENCY
    // =============================================================================

    /// Concurrent callers across windows each get their own answer
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_get_own_results() {
        let channel = TestChannel::start(BridgeConfig::default(), &[1, 2, 3, 4], |query| {
            let element = query.args.element_id();
            // Answer out of order
            let delay = Duration::from_millis((element % 7) as u64);
            Script::AnswerAfter(
                delay,
                vec![ElementQueryResult::SearchByText {
                    records: vec![ElementRecord::new(element, query.window_id)
                        .with_text(format!("match-{}", element))],
                }],
            )
        });

        let dispatcher = channel.bridge.dispatcher();
        let calls = (0..64i64).map(|element| {
            let dispatcher = Arc::clone(&dispatcher);
            let window = WindowId::new((element % 4 + 1) as i32);
            tokio::spawn(async move {
                let records = dispatcher
                    .search_element_infos_by_text(window, element, "match")
                    .await
                    .unwrap();
                (element, window, records)
            })
        });

        for result in futures::future::join_all(calls).await {
            let (element, window, records) = result.unwrap();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].accessibility_id, element);
            assert_eq!(records[0].window_id, window);
            assert_eq!(records[0].text, format!("match-{}", element));
        }

        let pending = channel.bridge.pending();
        assert_eq!(pending.pending_count(), 0);
        assert_eq!(completed(pending.stats()), 64);
        assert_eq!(channel.peer.seen().len(), 64);
    }
}
