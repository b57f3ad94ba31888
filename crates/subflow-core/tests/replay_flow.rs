//! End-to-end flows across source, bridge, and stream.

use std::sync::Arc;
use std::thread;

use futures::executor::block_on;
use futures::StreamExt;
use parking_lot::Mutex;

use subflow_core::{
    Demand, Downstream, ReplaySource, ReplaySubscription, SourceError, Terminal, ValueStream,
};

/// Recording downstream with configurable handshake and per-value grants.
#[derive(Clone)]
struct Recorder {
    inner: Arc<RecorderInner>,
    initial: Demand,
    grant_per_value: Demand,
}

struct RecorderInner {
    values: Mutex<Vec<u64>>,
    terminals: Mutex<Vec<Terminal<String>>>,
}

impl Recorder {
    fn new(initial: Demand, grant_per_value: Demand) -> Self {
        Self {
            inner: Arc::new(RecorderInner {
                values: Mutex::new(Vec::new()),
                terminals: Mutex::new(Vec::new()),
            }),
            initial,
            grant_per_value,
        }
    }

    fn values(&self) -> Vec<u64> {
        self.inner.values.lock().clone()
    }

    fn terminals(&self) -> Vec<Terminal<String>> {
        self.inner.terminals.lock().clone()
    }
}

impl Downstream<u64, String> for Recorder {
    fn on_subscribe(&self, subscription: &Arc<ReplaySubscription<u64, String>>) {
        if !self.initial.is_zero() {
            subscription.request(self.initial);
        }
    }

    fn receive(&self, value: u64) -> Demand {
        self.inner.values.lock().push(value);
        self.grant_per_value
    }

    fn receive_terminal(&self, terminal: Terminal<String>) {
        self.inner.terminals.lock().push(terminal);
    }
}

#[test]
fn replay_then_live_flow_preserves_order() {
    let source = ReplaySource::<u64, String>::new();
    source.push(1);
    source.push(2);

    let recorder = Recorder::new(Demand::Unbounded, Demand::NONE);
    let subscription = source.attach(recorder.clone()).unwrap();

    source.push(3);
    source.complete();

    assert_eq!(recorder.values(), vec![1, 2, 3]);
    assert_eq!(recorder.terminals(), vec![Terminal::Completed]);

    let metrics = subscription.metrics();
    assert_eq!(metrics.values_delivered, 3);
    assert_eq!(metrics.values_discarded, 0);
    assert!(metrics.terminated);
}

#[test]
fn one_for_one_feedback_loop_sustains_delivery() {
    let source = ReplaySource::<u64, String>::with_capacity(16);
    let recorder = Recorder::new(Demand::Finite(1), Demand::Finite(1));
    let subscription = source.attach(recorder.clone()).unwrap();

    for value in 0..10_000 {
        source.push(value);
    }

    assert_eq!(recorder.values().len(), 10_000);
    assert_eq!(subscription.pending_demand(), Demand::Finite(1));
    assert_eq!(subscription.metrics().values_discarded, 0);
}

#[test]
fn concurrent_grants_and_pushes_balance_exactly() {
    let source = Arc::new(ReplaySource::<u64, String>::with_capacity(16));
    let recorder = Recorder::new(Demand::NONE, Demand::NONE);
    let subscription = source.attach(recorder.clone()).unwrap();

    let granter = {
        let subscription = Arc::clone(&subscription);
        thread::spawn(move || {
            for _ in 0..100 {
                subscription.request(Demand::Finite(50));
                thread::yield_now();
            }
        })
    };

    let producer = {
        let source = Arc::clone(&source);
        thread::spawn(move || {
            for value in 0..10_000 {
                source.push(value);
            }
        })
    };

    granter.join().unwrap();
    producer.join().unwrap();

    // Every push is either delivered against granted demand or discarded;
    // nothing is queued and nothing is delivered beyond the total grant.
    let metrics = subscription.metrics();
    assert!(metrics.values_delivered <= 5000);
    assert_eq!(metrics.values_delivered + metrics.values_discarded, 10_000);
    assert_eq!(recorder.values().len() as u64, metrics.values_delivered);

    // The subscription is still active; fresh demand lets new values through.
    subscription.request(Demand::Finite(1));
    source.push(424_242);
    assert_eq!(recorder.values().last(), Some(&424_242));
}

#[test]
fn cancel_stops_live_flow_without_terminal() {
    let source = ReplaySource::<u64, String>::new();
    let recorder = Recorder::new(Demand::Unbounded, Demand::NONE);
    let subscription = source.attach(recorder.clone()).unwrap();

    source.push(1);
    subscription.cancel();
    source.push(2);
    source.complete();

    assert_eq!(recorder.values(), vec![1]);
    assert!(recorder.terminals().is_empty());
    assert!(source.is_finished());
}

#[test]
fn attach_after_finish_replays_everything() {
    let source = ReplaySource::<u64, String>::new();
    source.push(1);
    source.push(2);
    source.fail("upstream died".to_string());

    let recorder = Recorder::new(Demand::Unbounded, Demand::NONE);
    let subscription = source.attach(recorder.clone()).unwrap();

    assert_eq!(recorder.values(), vec![1, 2]);
    assert_eq!(
        recorder.terminals(),
        vec![Terminal::Failed("upstream died".to_string())]
    );
    assert!(subscription.is_terminated());
}

#[test]
fn second_consumer_is_rejected() {
    let source = ReplaySource::<u64, String>::new();
    source.attach(Recorder::new(Demand::NONE, Demand::NONE)).unwrap();

    let err = source
        .attach(Recorder::new(Demand::NONE, Demand::NONE))
        .unwrap_err();
    assert_eq!(err, SourceError::AlreadyAttached);
}

#[test]
fn stream_consumes_replay_live_and_failure() {
    let source = ReplaySource::<u64, String>::new();
    source.push(10);
    source.push(20);

    let stream = ValueStream::attach(&source).unwrap();
    source.push(30);
    source.fail("wire cut".to_string());

    let items = block_on(stream.collect::<Vec<_>>());
    assert_eq!(
        items,
        vec![Ok(10), Ok(20), Ok(30), Err("wire cut".to_string())]
    );
}

#[test]
fn stream_backpressures_producer_to_prefetch_window() {
    let source = ReplaySource::<u64, String>::with_capacity(4);
    let mut stream = ValueStream::attach_with_prefetch(&source, 2).unwrap();

    for value in 0..10 {
        source.push(value);
    }

    // Two values fit the window; the rest were discarded, not queued.
    assert_eq!(block_on(stream.next()), Some(Ok(0)));
    assert_eq!(block_on(stream.next()), Some(Ok(1)));
    let metrics = stream.subscription().metrics();
    assert_eq!(metrics.values_delivered, 2);
    assert_eq!(metrics.values_discarded, 8);
}

#[test]
fn stream_replenishes_window_as_items_are_consumed() {
    let source = ReplaySource::<u64, String>::new();
    let mut stream = ValueStream::attach_with_prefetch(&source, 1).unwrap();

    source.push(1);
    assert_eq!(block_on(stream.next()), Some(Ok(1)));

    // Consuming the item reopened the window for the next push.
    source.push(2);
    assert_eq!(block_on(stream.next()), Some(Ok(2)));
}
