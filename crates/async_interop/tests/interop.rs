//! End-to-end behaviour of the sync/async adapters.

mod common;

use common::{init_tracing, ReleaseCounting, SourceError};
use neo_async_interop::{
    drain, from_fn, AsyncEnumerable, AsyncEnumerableExt, AsyncEnumerator, BridgeConfig,
    BridgeError, BridgeResult, CancellationToken, IntoAsyncEnumerable, SingleValue, SyncToAsync,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn wrapped_then_drained_sequence_is_unchanged() {
    init_tracing();
    let source = vec!["alpha", "beta", "gamma"].into_async_enumerable();
    let drained: Vec<_> = source.collect_blocking().unwrap();
    assert_eq!(drained, vec!["alpha", "beta", "gamma"]);
}

#[test]
fn empty_sequence_drains_to_nothing() {
    init_tracing();
    let source = SyncToAsync::new(Vec::<u64>::new());
    let mut iter = source.to_blocking_iter();
    assert!(iter.next().is_none());
    assert!(iter.next().is_none());
}

#[test]
fn full_consumption_releases_the_iterator_exactly_once() {
    init_tracing();
    let counting = ReleaseCounting::new(vec![1, 2, 3, 4]);
    let source = SyncToAsync::new(counting.clone());
    assert_eq!(source.collect_blocking().unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(counting.released(), 1);
}

#[test]
fn abandoned_drain_releases_the_iterator_exactly_once() {
    init_tracing();
    let counting = ReleaseCounting::new((0..100).collect::<Vec<u32>>());
    let source = SyncToAsync::new(counting.clone());
    let first_three: Vec<u32> = source.to_blocking_iter().take(3).map(Result::unwrap).collect();
    assert_eq!(first_three, vec![0, 1, 2]);
    assert_eq!(counting.released(), 1);
}

#[test]
fn third_step_failure_stops_after_two_items() {
    init_tracing();
    let items: Vec<Result<i32, SourceError>> =
        vec![Ok(10), Ok(20), Err(SourceError("disk")), Ok(40)];
    let source = SyncToAsync::fallible(items);

    let results: Vec<BridgeResult<i32>> = source.to_blocking_iter().collect();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap(), &10);
    assert_eq!(results[1].as_ref().unwrap(), &20);
    let err = results[2].as_ref().unwrap_err();
    assert_eq!(
        err.failure_source()
            .and_then(|s| s.downcast_ref::<SourceError>()),
        Some(&SourceError("disk"))
    );

    // collecting stops at the first error
    assert!(matches!(
        source.collect_blocking(),
        Err(BridgeError::IterationFailure(_))
    ));
}

#[test]
fn deferred_seven_drains_to_single_element() {
    init_tracing();
    let source = SingleValue::new(async { 7 });
    let drained: Vec<i32> = drain(Some(&source))
        .unwrap()
        .collect::<BridgeResult<_>>()
        .unwrap();
    assert_eq!(drained, vec![7]);
}

#[test]
fn deferred_failure_drains_to_error() {
    init_tracing();
    let source = SingleValue::<i32>::fallible(async { Err(SourceError("offline")) });
    let mut iter = source.to_blocking_iter();
    assert!(matches!(iter.next(), Some(Err(BridgeError::IterationFailure(_)))));
    assert!(iter.next().is_none());
}

#[tokio::test]
async fn single_value_counter_property() {
    init_tracing();
    let evaluations = Arc::new(AtomicUsize::new(0));
    let counter = evaluations.clone();
    let source = SingleValue::new(async move {
        counter.fetch_add(1, Ordering::SeqCst);
        42
    });

    let mut e = source.enumerator();
    assert!(e.move_next(CancellationToken::new()).await.unwrap());
    assert_eq!(e.current(), Some(&42));
    for _ in 0..10 {
        assert!(!e.move_next(CancellationToken::new()).await.unwrap());
    }
    assert_eq!(evaluations.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancellation_before_resolution_is_canceled_not_failed() {
    init_tracing();
    let slow = (0..3).map(|i| {
        std::thread::sleep(Duration::from_millis(150));
        i
    });
    let source = SyncToAsync::new(slow);
    let mut e = source.enumerator();

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });
    match e.move_next(token).await {
        Err(BridgeError::Canceled) => {}
        other => panic!("expected a canceled step, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn advancing_after_a_canceled_step_never_reports_a_false_end() {
    init_tracing();
    let slow = (0..3).map(|i| {
        std::thread::sleep(Duration::from_millis(200));
        i
    });
    let source = SyncToAsync::new(slow);
    let mut e = source.enumerator();

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });
    assert!(matches!(e.move_next(token).await, Err(BridgeError::Canceled)));

    let mut seen = Vec::new();
    while e.move_next(CancellationToken::new()).await.unwrap() {
        seen.push(*e.current().unwrap());
    }
    // element 0 went to the canceled step; nothing after it is skipped or repeated
    assert_eq!(seen, vec![1, 2]);
    assert!(!e.move_next(CancellationToken::new()).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn drain_inside_multi_thread_runtime_with_offloaded_steps() {
    init_tracing();
    let counting = ReleaseCounting::new(vec![5u8, 6, 7]);
    let source = SyncToAsync::new(counting.clone());
    let drained = source.collect_blocking().unwrap();
    assert_eq!(drained, vec![5, 6, 7]);
    assert_eq!(counting.released(), 1);
}

#[test]
fn inline_and_worker_modes_agree() {
    init_tracing();
    let items: Vec<u16> = (0..50).collect();
    let worker = SyncToAsync::new(items.clone());
    let inline = SyncToAsync::new(items.clone()).with_config(BridgeConfig::inline());
    assert_eq!(worker.collect_blocking().unwrap(), items);
    assert_eq!(inline.collect_blocking().unwrap(), items);
}

#[test]
fn config_from_toml_drives_the_adapter() {
    init_tracing();
    let config = BridgeConfig::from_toml_str(
        r#"
        offload = "inline"
        worker_thread_name = "unused-in-inline-mode"
        "#,
    )
    .unwrap();
    let source = SyncToAsync::create(Some(vec![3, 2, 1]))
        .unwrap()
        .with_config(config);
    assert_eq!(source.collect_blocking().unwrap(), vec![3, 2, 1]);
}

#[test]
fn null_arguments_are_rejected_eagerly() {
    init_tracing();
    assert!(matches!(
        SyncToAsync::create(None::<Vec<u8>>),
        Err(BridgeError::NullArgument(_))
    ));
    assert!(matches!(
        SingleValue::<u8>::create(None::<std::future::Ready<u8>>),
        Err(BridgeError::NullArgument(_))
    ));
    assert!(matches!(
        drain::<SingleValue<u8>>(None),
        Err(BridgeError::NullArgument(_))
    ));
}

/// Async source whose second step fails, built through the generic constructor.
struct FailsOnSecond {
    step: u8,
    current: Option<u8>,
}

#[async_trait::async_trait]
impl AsyncEnumerator for FailsOnSecond {
    type Item = u8;

    async fn move_next(&mut self, _cancel: CancellationToken) -> BridgeResult<bool> {
        self.step += 1;
        match self.step {
            1 => {
                self.current = Some(1);
                Ok(true)
            }
            _ => Err(BridgeError::iteration(SourceError("second step"))),
        }
    }

    fn current(&self) -> Option<&u8> {
        self.current.as_ref()
    }

    fn dispose(&mut self) {
        self.current = None;
    }
}

#[test]
fn drain_propagates_async_step_failure() {
    init_tracing();
    let source = from_fn(|| FailsOnSecond {
        step: 0,
        current: None,
    });
    let results: Vec<_> = source.to_blocking_iter().collect();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap(), &1);
    assert!(results[1].is_err());
}
