use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep, timeout};

use threadvisor::{
    App, AppHandle, Cadence, Command, Context, Event, EventKind, Handling, Message, Observe,
    RuntimeError, SetupError, SupervisorConfig, UnrecognizedPolicy, Work, WorkError, WorkFn,
    WorkerSpec,
};

const LIMIT: Duration = Duration::from_secs(5);

fn app() -> App {
    App::with_config(SupervisorConfig {
        grace: Duration::from_secs(2),
        handle_signals: false,
        ..SupervisorConfig::default()
    })
}

/// Work that counts executions and publishes the count on "runs".
fn counting(count: &Arc<AtomicU64>) -> impl Work {
    let count = count.clone();
    WorkFn::new(move |ctx: &Context| {
        let n = count.fetch_add(1, Ordering::SeqCst) + 1;
        ctx.publish("runs", json!({ "n": n }));
        Ok(())
    })
}

async fn recv(rx: &mut UnboundedReceiver<Message>) -> Message {
    timeout(LIMIT, rx.recv())
        .await
        .expect("timed out waiting for a message")
        .expect("outlet closed")
}

async fn assert_silent(rx: &mut UnboundedReceiver<Message>) {
    sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err(), "unexpected extra message");
}

async fn states(handle: &AppHandle, rx: &mut UnboundedReceiver<Message>) -> Value {
    handle.active_threads("probe").unwrap();
    loop {
        let msg = recv(rx).await;
        if msg.command() == &Command::ActiveThreads {
            return msg.payload().cloned().unwrap_or(Value::Null);
        }
    }
}

#[derive(Default)]
struct Recorder(Mutex<Vec<Event>>);

#[async_trait]
impl Observe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.0.lock().unwrap().push(ev.clone());
    }
    fn name(&self) -> &'static str {
        "recorder"
    }
}

impl Recorder {
    fn has(&self, kind: EventKind, worker: &str) -> bool {
        self.0
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.kind == kind && e.worker.as_deref() == Some(worker))
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn single_run_executes_once_and_multi_run_once_per_start() {
    let mut app = app();
    let a = Arc::new(AtomicU64::new(0));
    let b = Arc::new(AtomicU64::new(0));
    app.add_thread(WorkerSpec::new("A", Cadence::Once, counting(&a)).with_owner("manager"))
        .unwrap();
    app.add_thread(WorkerSpec::new("B", Cadence::PerSignal, counting(&b)).with_owner("manager"))
        .unwrap();
    let mut probe = app.outlet("probe").unwrap();
    let handle = app.handle();

    handle.subscribe("A", "runs", "probe").unwrap();
    handle.subscribe("B", "runs", "probe").unwrap();
    for name in ["A", "A", "B", "B"] {
        let start = Message::new(["manager"], [name], Command::ThreadStart, None).unwrap();
        handle.send(start).unwrap();
    }
    let run = tokio::spawn(app.run());

    let mut senders = Vec::new();
    for _ in 0..3 {
        let msg = recv(&mut probe).await;
        assert_eq!(msg.command(), &Command::Data);
        senders.push(msg.sender().join("/"));
    }
    assert_silent(&mut probe).await;
    senders.sort();
    assert_eq!(senders, vec!["A/runs", "B/runs", "B/runs"]);
    assert_eq!(a.load(Ordering::SeqCst), 1);
    assert_eq!(b.load(Ordering::SeqCst), 2);

    handle.shutdown().unwrap();
    let res = timeout(LIMIT, run).await.unwrap().unwrap();
    assert!(res.is_ok(), "{res:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn publishing_without_subscribers_is_not_an_error() {
    let mut app = app();
    let count = Arc::new(AtomicU64::new(0));
    let c = count.clone();
    app.add_thread(
        WorkerSpec::new(
            "A",
            Cadence::Once,
            WorkFn::new(move |ctx: &Context| {
                c.fetch_add(1, Ordering::SeqCst);
                ctx.publish("progress", json!(50));
                Ok(())
            }),
        )
        .autostart(),
    )
    .unwrap();

    let res = timeout(LIMIT, app.run()).await.unwrap();
    assert!(res.is_ok(), "{res:?}");
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

/// Forwards every DATA message to the "probe" outlet and remembers its sender.
struct Forwarder {
    seen: Arc<Mutex<Vec<Vec<String>>>>,
}

impl Work for Forwarder {
    fn run(&mut self, _ctx: &Context) -> Result<(), WorkError> {
        Ok(())
    }

    fn handle(&mut self, ctx: &Context, message: &Message) -> Result<Handling, WorkError> {
        if message.command() != &Command::Data {
            return Ok(Handling::Unrecognized);
        }
        self.seen.lock().unwrap().push(message.sender().to_vec());
        ctx.send(["probe"], Command::Data, message.payload().cloned())?;
        Ok(Handling::Handled)
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn subscriber_receives_published_payload_exactly_once() {
    let mut app = app();
    app.add_thread(
        WorkerSpec::new(
            "A",
            Cadence::Once,
            WorkFn::new(|ctx: &Context| {
                ctx.subscribe("A", "data", "C");
                ctx.publish("data", json!({"count": 3}));
                Ok(())
            }),
        )
        .autostart(),
    )
    .unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    app.add_thread(WorkerSpec::new(
        "C",
        Cadence::PerSignal,
        Forwarder { seen: seen.clone() },
    ))
    .unwrap();
    let mut probe = app.outlet("probe").unwrap();
    let handle = app.handle();
    let run = tokio::spawn(app.run());

    let msg = recv(&mut probe).await;
    assert_eq!(msg.sender(), ["C"]);
    assert_eq!(msg.payload(), Some(&json!({"count": 3})));
    assert_silent(&mut probe).await;
    assert_eq!(
        *seen.lock().unwrap(),
        vec![vec!["A".to_string(), "data".to_string()]]
    );

    handle.shutdown().unwrap();
    assert!(timeout(LIMIT, run).await.unwrap().unwrap().is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn ended_worker_is_stopped_and_ignores_commands() {
    let mut app = app();
    let count = Arc::new(AtomicU64::new(0));
    app.add_thread(WorkerSpec::new("B", Cadence::PerSignal, counting(&count)))
        .unwrap();
    app.add_thread(WorkerSpec::new("idle", Cadence::PerSignal, counting(&Arc::default())))
        .unwrap();
    let mut probe = app.outlet("probe").unwrap();
    let handle = app.handle();
    let run = tokio::spawn(app.run());

    handle.start("B").unwrap();
    handle.end("B").unwrap();

    let mut state = Value::Null;
    for _ in 0..50 {
        state = states(&handle, &mut probe).await;
        if state["B"] == "STOPPED" {
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(state["B"], "STOPPED");
    assert_eq!(state["idle"], "CREATED");

    handle.start("B").unwrap();
    sleep(Duration::from_millis(100)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);

    handle.shutdown().unwrap();
    assert!(timeout(LIMIT, run).await.unwrap().unwrap().is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn failure_ends_every_other_worker_and_reports_cause() {
    let recorder = Arc::new(Recorder::default());
    let mut app = app().with_observers(vec![recorder.clone()]);
    app.add_thread(WorkerSpec::new(
        "bad",
        Cadence::PerSignal,
        WorkFn::new(|_ctx: &Context| Err(WorkError::fail("disk full"))),
    ))
    .unwrap();
    app.add_thread(
        WorkerSpec::new(
            "loop",
            Cadence::Continuous,
            WorkFn::new(|_ctx: &Context| {
                std::thread::sleep(Duration::from_millis(5));
                Ok(())
            }),
        )
        .autostart(),
    )
    .unwrap();
    app.add_thread(WorkerSpec::new("idle", Cadence::PerSignal, counting(&Arc::default())))
        .unwrap();
    let handle = app.handle();
    let run = tokio::spawn(app.run());

    sleep(Duration::from_millis(50)).await;
    handle.start("bad").unwrap();

    let res = timeout(LIMIT, run).await.unwrap().unwrap();
    match res {
        Err(RuntimeError::WorkerFailed { name, owner, error }) => {
            assert_eq!(name, "bad");
            assert_eq!(owner, "manager");
            assert_eq!(error, WorkError::fail("disk full"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(recorder.has(EventKind::WorkerFailed, "bad"));
    assert!(recorder.has(EventKind::FailFast, "bad"));
    assert!(recorder.has(EventKind::WorkerStopped, "loop"));
    assert!(recorder.has(EventKind::WorkerStopped, "idle"));
}

#[tokio::test(flavor = "multi_thread")]
async fn panicking_work_fails_the_application() {
    let mut app = app();
    app.add_thread(
        WorkerSpec::new(
            "A",
            Cadence::Once,
            WorkFn::new(|_ctx: &Context| -> Result<(), WorkError> { panic!("lost the plot") }),
        )
        .autostart(),
    )
    .unwrap();

    let res = timeout(LIMIT, app.run()).await.unwrap();
    match res {
        Err(RuntimeError::WorkerFailed { name, error, .. }) => {
            assert_eq!(name, "A");
            assert_eq!(
                error,
                WorkError::Panicked {
                    info: "lost the plot".into()
                }
            );
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_receiver_halts_with_routing_error() {
    let mut app = app();
    app.add_thread(
        WorkerSpec::new(
            "A",
            Cadence::Once,
            WorkFn::new(|ctx: &Context| {
                ctx.send(["ghost"], Command::Data, None)?;
                Ok(())
            }),
        )
        .autostart(),
    )
    .unwrap();
    app.add_thread(WorkerSpec::new("idle", Cadence::PerSignal, counting(&Arc::default())))
        .unwrap();

    let res = timeout(LIMIT, app.run()).await.unwrap();
    match res {
        Err(RuntimeError::Routing {
            receiver,
            sender,
            command,
        }) => {
            assert_eq!(receiver, vec!["ghost".to_string()]);
            assert_eq!(sender, vec!["A".to_string()]);
            assert_eq!(command, "DATA");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_owner_is_rejected_before_start() {
    let mut app = app();
    let count = Arc::new(AtomicU64::new(0));
    app.add_thread(
        WorkerSpec::new("A", Cadence::Once, counting(&count))
            .with_owner("ghost")
            .autostart(),
    )
    .unwrap();

    let res = timeout(LIMIT, app.run()).await.unwrap();
    assert!(matches!(
        res,
        Err(RuntimeError::Setup(SetupError::UnknownOwner { .. }))
    ));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn delegated_owner_controls_its_worker() {
    let mut app = app();
    let child = Arc::new(AtomicU64::new(0));
    app.add_thread(
        WorkerSpec::new(
            "parent",
            Cadence::Once,
            WorkFn::new(|ctx: &Context| {
                ctx.send(["manager", "child"], Command::ThreadStart, None)?;
                Ok(())
            }),
        )
        .autostart(),
    )
    .unwrap();
    app.add_thread(WorkerSpec::new("child", Cadence::Once, counting(&child)).with_owner("parent"))
        .unwrap();
    let mut probe = app.outlet("probe").unwrap();
    let handle = app.handle();

    // an outlet is not the owner: this START is rejected
    handle
        .send(Message::new(["probe"], ["child"], Command::ThreadStart, None).unwrap())
        .unwrap();
    handle.subscribe("child", "runs", "probe").unwrap();

    let res = timeout(LIMIT, app.run()).await.unwrap();
    assert!(res.is_ok(), "{res:?}");
    assert_eq!(child.load(Ordering::SeqCst), 1);
    let msg = recv(&mut probe).await;
    assert_eq!(msg.payload(), Some(&json!({"n": 1})));
}

#[tokio::test(flavor = "multi_thread")]
async fn interval_worker_ticks_until_paused() {
    let mut app = app();
    let count = Arc::new(AtomicU64::new(0));
    app.add_thread(
        WorkerSpec::new("tick", Cadence::Interval(Duration::from_millis(20)), counting(&count))
            .autostart(),
    )
    .unwrap();
    let handle = app.handle();
    let run = tokio::spawn(app.run());

    sleep(Duration::from_millis(200)).await;
    handle.stop("tick").unwrap();
    sleep(Duration::from_millis(50)).await;
    let paused = count.load(Ordering::SeqCst);
    assert!((3..=15).contains(&paused), "ticks: {paused}");

    sleep(Duration::from_millis(100)).await;
    assert_eq!(count.load(Ordering::SeqCst), paused);

    handle.shutdown().unwrap();
    assert!(timeout(LIMIT, run).await.unwrap().unwrap().is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn parameter_updates_apply_to_next_execution() {
    let mut app = app();
    app.add_thread(
        WorkerSpec::new(
            "A",
            Cadence::PerSignal,
            WorkFn::new(|ctx: &Context| {
                ctx.publish("step", ctx.param("step").cloned().unwrap_or(Value::Null));
                Ok(())
            }),
        )
        .with_param("step", 1),
    )
    .unwrap();
    let mut probe = app.outlet("probe").unwrap();
    let handle = app.handle();
    handle.subscribe("A", "step", "probe").unwrap();
    handle.start("A").unwrap();
    handle.update("A", json!({"step": 5, "unknown": true})).unwrap();
    handle.start("A").unwrap();
    let run = tokio::spawn(app.run());

    assert_eq!(recv(&mut probe).await.payload(), Some(&json!(1)));
    assert_eq!(recv(&mut probe).await.payload(), Some(&json!(5)));

    handle.shutdown().unwrap();
    assert!(timeout(LIMIT, run).await.unwrap().unwrap().is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn unrecognized_command_policies() {
    let mut app = app();
    app.add_thread(
        WorkerSpec::new("polite", Cadence::PerSignal, counting(&Arc::default()))
            .with_unrecognized(UnrecognizedPolicy::Reply),
    )
    .unwrap();
    app.add_thread(
        WorkerSpec::new("strict", Cadence::PerSignal, counting(&Arc::default()))
            .with_unrecognized(UnrecognizedPolicy::Fail),
    )
    .unwrap();
    let mut probe = app.outlet("probe").unwrap();
    let handle = app.handle();
    handle
        .send(Message::new(["probe"], ["polite"], "PING", None).unwrap())
        .unwrap();
    let run = tokio::spawn(app.run());

    let reply = recv(&mut probe).await;
    assert_eq!(reply.sender(), ["polite"]);
    assert_eq!(reply.command(), &Command::Error);

    handle
        .send(Message::new(["probe"], ["strict"], "PING", None).unwrap())
        .unwrap();
    let res = timeout(LIMIT, run).await.unwrap().unwrap();
    match res {
        Err(RuntimeError::WorkerFailed { name, error, .. }) => {
            assert_eq!(name, "strict");
            assert_eq!(
                error,
                WorkError::UnrecognizedCommand {
                    command: "PING".into()
                }
            );
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn run_blocking_drives_its_own_runtime() {
    let mut app = App::with_config(SupervisorConfig {
        handle_signals: false,
        ..SupervisorConfig::default()
    });
    let count = Arc::new(AtomicU64::new(0));
    app.add_thread(WorkerSpec::new("A", Cadence::Once, counting(&count)).autostart())
        .unwrap();

    app.run_blocking().unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn unsubscribed_outlet_stops_receiving() {
    let mut app = app();
    let count = Arc::new(AtomicU64::new(0));
    app.add_thread(WorkerSpec::new("A", Cadence::PerSignal, counting(&count)))
        .unwrap();
    let mut probe = app.outlet("probe").unwrap();
    let handle = app.handle();
    handle.subscribe("A", "runs", "probe").unwrap();
    handle.start("A").unwrap();
    let run = tokio::spawn(app.run());

    assert_eq!(recv(&mut probe).await.payload(), Some(&json!({"n": 1})));

    handle.unsubscribe("A", "runs", "probe").unwrap();
    handle.unsubscribe("A", "runs", "probe").unwrap();
    handle.start("A").unwrap();
    assert_silent(&mut probe).await;
    assert_eq!(count.load(Ordering::SeqCst), 2);

    handle.shutdown().unwrap();
    assert!(timeout(LIMIT, run).await.unwrap().unwrap().is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn loop_timer_reschedules_running_interval() {
    let mut app = app();
    let count = Arc::new(AtomicU64::new(0));
    app.add_thread(
        WorkerSpec::new("tick", Cadence::Interval(Duration::from_secs(3600)), counting(&count))
            .autostart(),
    )
    .unwrap();
    let handle = app.handle();
    let run = tokio::spawn(app.run());

    sleep(Duration::from_millis(100)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);

    for secs in [json!({"loop_timer": 1e30}), json!({"loop_timer": 1e-10}), json!(-2)] {
        handle.command("tick", Command::SetLoopTimer, Some(secs)).unwrap();
    }
    handle
        .command("tick", Command::SetLoopTimer, Some(json!({"loop_timer": 0.02})))
        .unwrap();
    sleep(Duration::from_millis(300)).await;
    let ticks = count.load(Ordering::SeqCst);
    assert!(ticks >= 5, "ticks: {ticks}");

    handle.shutdown().unwrap();
    let res = timeout(LIMIT, run).await.unwrap().unwrap();
    assert!(res.is_ok(), "{res:?}");
}

/// Panics when dropped, after the guarded unit of work has returned.
struct DropsBadly;

impl Work for DropsBadly {
    fn run(&mut self, _ctx: &Context) -> Result<(), WorkError> {
        Ok(())
    }
}

impl Drop for DropsBadly {
    fn drop(&mut self) {
        panic!("torn down badly");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn thread_panic_outside_work_names_the_worker() {
    let mut app = app();
    app.add_thread(
        WorkerSpec::new("fragile", Cadence::Once, DropsBadly)
            .with_owner("keeper")
            .autostart(),
    )
    .unwrap();
    app.add_thread(WorkerSpec::new("keeper", Cadence::PerSignal, counting(&Arc::default())))
        .unwrap();

    let res = timeout(LIMIT, app.run()).await.unwrap();
    match res {
        Err(RuntimeError::WorkerFailed { name, owner, error }) => {
            assert_eq!(name, "fragile");
            assert_eq!(owner, "keeper");
            assert_eq!(
                error,
                WorkError::Panicked {
                    info: "torn down badly".into()
                }
            );
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
