use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use std::time::Duration;

use time::OffsetDateTime;
use tokio::{task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    EnvLookup, HttpPinger, KeepAliveConfig, KeepAliveResult, KeepAliveStatus, NOT_CONFIGURED,
    Pinger, TargetResolver, process_env,
};

/// Result of a single ping attempt that did not fail at the transport level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingOutcome {
    /// No base URL is configured; no request was made.
    Skipped,
    /// The health endpoint answered 200.
    Success,
    /// The health endpoint answered with another status.
    UnexpectedStatus(u16),
}

/// Periodic self-ping scheduler.
///
/// Lifecycle is `Idle -> Running -> Stopping -> Idle`: [`start`](Self::start)
/// spawns the loop once, [`stop`](Self::stop) cancels it and waits for it to
/// exit. Both are no-ops when already in the target state, and `start` is
/// refused while a `stop` is still joining the previous loop. Must be started
/// from within a tokio runtime.
///
/// ```no_run
/// use wake_keepalive::{KeepAlive, KeepAliveConfig};
///
/// # async fn run() -> Result<(), wake_keepalive::KeepAliveError> {
/// let keep_alive = KeepAlive::new(KeepAliveConfig::default().with_interval_secs(240))?;
/// keep_alive.start();
/// // ...
/// keep_alive.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct KeepAlive<P = HttpPinger> {
    inner: Arc<Inner<P>>,
    worker: Mutex<WorkerSlot>,
}

enum WorkerSlot {
    Idle,
    Running(Worker),
    Stopping,
}

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Inner<P> {
    interval: Duration,
    cooldown: Duration,
    health_path: String,
    pinger: P,
    target: TargetResolver,
    ping_count: AtomicU64,
    last_ping: RwLock<Option<OffsetDateTime>>,
    warned_unconfigured: AtomicBool,
}

impl KeepAlive<HttpPinger> {
    /// Builds a scheduler that pings over HTTP and reads the process environment.
    pub fn new(cfg: KeepAliveConfig) -> KeepAliveResult<Self> {
        let pinger = HttpPinger::new(cfg.request_timeout())?;
        Self::with_pinger(cfg, pinger)
    }
}

impl<P: Pinger> KeepAlive<P> {
    pub fn with_pinger(cfg: KeepAliveConfig, pinger: P) -> KeepAliveResult<Self> {
        Self::with_parts(cfg, pinger, process_env())
    }

    pub fn with_parts(cfg: KeepAliveConfig, pinger: P, env: EnvLookup) -> KeepAliveResult<Self> {
        cfg.validate()?;
        let inner = Inner {
            interval: cfg.interval(),
            cooldown: cfg.failure_cooldown(),
            health_path: cfg.health_path.clone(),
            target: TargetResolver::new(&cfg, env),
            pinger,
            ping_count: AtomicU64::new(0),
            last_ping: RwLock::new(None),
            warned_unconfigured: AtomicBool::new(false),
        };
        Ok(Self {
            inner: Arc::new(inner),
            worker: Mutex::new(WorkerSlot::Idle),
        })
    }

    /// Spawns the ping loop. Returns `false` if it is already running or a
    /// `stop` is still in progress.
    pub fn start(&self) -> bool {
        let mut worker = self.lock_worker();
        match *worker {
            WorkerSlot::Idle => {}
            WorkerSlot::Running(_) => {
                debug!("keep-alive already running");
                return false;
            }
            WorkerSlot::Stopping => {
                debug!("keep-alive is stopping, start refused");
                return false;
            }
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(Arc::clone(&self.inner), cancel.clone()));
        *worker = WorkerSlot::Running(Worker { cancel, handle });

        info!(
            interval_secs = self.inner.interval.as_secs(),
            "keep-alive started"
        );
        true
    }

    /// Cancels the loop, interrupting a pending wait or request, and returns
    /// once the task has exited.
    ///
    /// A second `stop` issued while the first is still joining returns
    /// immediately.
    pub async fn stop(&self) {
        let Worker { cancel, handle } = {
            let mut slot = self.lock_worker();
            match std::mem::replace(&mut *slot, WorkerSlot::Stopping) {
                WorkerSlot::Running(worker) => worker,
                other => {
                    *slot = other;
                    return;
                }
            }
        };
        let _idle = ResetOnDrop(&self.worker);

        cancel.cancel();
        if let Err(e) = handle.await {
            if e.is_panic() {
                error!(error = %e, "keep-alive loop panicked");
            }
        }
        info!("keep-alive stopped");
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lock_worker(), WorkerSlot::Running(_))
    }

    /// Performs one ping attempt immediately, outside the schedule.
    pub async fn ping_once(&self) -> KeepAliveResult<PingOutcome> {
        self.inner.ping_once().await
    }

    pub fn status(&self) -> KeepAliveStatus {
        KeepAliveStatus {
            running: self.is_running(),
            interval_seconds: self.inner.interval.as_secs(),
            ping_count: self.inner.ping_count.load(Ordering::Relaxed),
            last_ping: *self
                .inner
                .last_ping
                .read()
                .unwrap_or_else(PoisonError::into_inner),
            app_url: self
                .inner
                .target
                .current()
                .unwrap_or_else(|| NOT_CONFIGURED.to_string()),
        }
    }

    fn lock_worker(&self) -> MutexGuard<'_, WorkerSlot> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the slot to `Idle` once a `stop` finishes, or is dropped mid-join
/// (the loop is already cancelled at that point).
struct ResetOnDrop<'a>(&'a Mutex<WorkerSlot>);

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = WorkerSlot::Idle;
    }
}

impl<P> Drop for KeepAlive<P> {
    fn drop(&mut self) {
        let slot = self.worker.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let WorkerSlot::Running(worker) = std::mem::replace(slot, WorkerSlot::Idle) {
            worker.cancel.cancel();
        }
    }
}

impl<P: Pinger> Inner<P> {
    async fn ping_once(&self) -> KeepAliveResult<PingOutcome> {
        let Some(base) = self.target.resolve() else {
            if !self.warned_unconfigured.swap(true, Ordering::Relaxed) {
                warn!(
                    app_url_var = self.target.app_url_var(),
                    public_domain_var = self.target.public_domain_var(),
                    "keep-alive target not configured; set {}=https://your-app.koyeb.app for 24/7 operation",
                    self.target.app_url_var(),
                );
            }
            return Ok(PingOutcome::Skipped);
        };

        let url = format!("{base}/{}", self.health_path.trim_start_matches('/'));
        let code = self.pinger.ping(&url).await?;
        if code == 200 {
            let n = self.record_success();
            info!(ping = n, "keep-alive ping #{n} successful");
            Ok(PingOutcome::Success)
        } else {
            warn!(status = code, url = %url, "keep-alive ping returned status {code}");
            Ok(PingOutcome::UnexpectedStatus(code))
        }
    }

    fn record_success(&self) -> u64 {
        let n = self.ping_count.fetch_add(1, Ordering::Relaxed) + 1;
        *self
            .last_ping
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(OffsetDateTime::now_utc());
        n
    }
}

/// Ping loop: wait `interval`, ping, and after a transport failure wait the
/// extra cooldown. Exits as soon as `cancel` fires.
async fn run<P: Pinger>(inner: Arc<Inner<P>>, cancel: CancellationToken) {
    loop {
        if !pause(&cancel, inner.interval).await {
            break;
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            res = inner.ping_once() => res,
        };

        if let Err(e) = result {
            error!(
                error = %e,
                cooldown_secs = inner.cooldown.as_secs(),
                "keep-alive ping failed",
            );
            if !pause(&cancel, inner.cooldown).await {
                break;
            }
        }
    }
    debug!("keep-alive loop exited");
}

/// Sleeps for `period`; returns `false` if cancelled first.
async fn pause(cancel: &CancellationToken, period: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = sleep(period) => true,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    use super::*;
    use crate::KeepAliveError;

    #[derive(Clone, Copy)]
    enum Reply {
        Status(u16),
        Fail,
        Hang,
    }

    struct ScriptedPinger {
        reply: Reply,
        calls: Arc<AtomicUsize>,
        urls: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedPinger {
        fn new(reply: Reply) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let pinger = Self {
                reply,
                calls: Arc::clone(&calls),
                urls: Arc::default(),
            };
            (pinger, calls)
        }
    }

    #[async_trait]
    impl Pinger for ScriptedPinger {
        async fn ping(&self, url: &str) -> KeepAliveResult<u16> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(url.to_string());
            match self.reply {
                Reply::Status(code) => Ok(code),
                Reply::Fail => Err(KeepAliveError::transport(
                    url,
                    std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
                )),
                Reply::Hang => std::future::pending().await,
            }
        }
    }

    fn env(pairs: &[(&str, &str)]) -> EnvLookup {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Arc::new(move |key| map.get(key).cloned())
    }

    fn configured(reply: Reply, interval_secs: u64) -> (KeepAlive<ScriptedPinger>, Arc<AtomicUsize>) {
        let (pinger, calls) = ScriptedPinger::new(reply);
        let cfg = KeepAliveConfig::default()
            .with_interval_secs(interval_secs)
            .with_app_url("https://svc.test");
        let keep_alive = KeepAlive::with_parts(cfg, pinger, env(&[])).unwrap();
        (keep_alive, calls)
    }

    #[derive(Clone, Default)]
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn success_increments_count_and_records_time() {
        let (keep_alive, calls) = configured(Reply::Status(200), 300);

        assert_eq!(keep_alive.ping_once().await.unwrap(), PingOutcome::Success);

        let status = keep_alive.status();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(status.ping_count, 1);
        assert!(status.last_ping.is_some());
        assert_eq!(status.app_url, "https://svc.test");
    }

    #[tokio::test]
    async fn pings_health_path_under_base_url() {
        let (pinger, _) = ScriptedPinger::new(Reply::Status(200));
        let urls = Arc::clone(&pinger.urls);
        let cfg = KeepAliveConfig::default().with_app_url("https://svc.test/");
        let keep_alive = KeepAlive::with_parts(cfg, pinger, env(&[])).unwrap();

        keep_alive.ping_once().await.unwrap();
        assert_eq!(urls.lock().unwrap().as_slice(), ["https://svc.test/api/health"]);
    }

    #[tokio::test]
    async fn non_200_leaves_counter_untouched() {
        let (keep_alive, _) = configured(Reply::Status(503), 300);

        let outcome = keep_alive.ping_once().await.unwrap();

        assert_eq!(outcome, PingOutcome::UnexpectedStatus(503));
        assert_eq!(keep_alive.status().ping_count, 0);
        assert!(keep_alive.status().last_ping.is_none());
    }

    #[tokio::test]
    async fn transport_failure_is_returned() {
        let (keep_alive, _) = configured(Reply::Fail, 300);

        let err = keep_alive.ping_once().await.unwrap_err();
        assert!(matches!(err, KeepAliveError::Transport { .. }));
        assert_eq!(keep_alive.status().ping_count, 0);
    }

    #[tokio::test]
    async fn unconfigured_skips_network_and_warns_once() {
        let counter = WarnCounter::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(counter.clone()));

        let (pinger, calls) = ScriptedPinger::new(Reply::Status(200));
        let keep_alive =
            KeepAlive::with_parts(KeepAliveConfig::default(), pinger, env(&[])).unwrap();

        for _ in 0..5 {
            assert_eq!(keep_alive.ping_once().await.unwrap(), PingOutcome::Skipped);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(keep_alive.status().app_url, NOT_CONFIGURED);
    }

    #[tokio::test]
    async fn domain_from_environment_is_used() {
        let (pinger, _) = ScriptedPinger::new(Reply::Status(200));
        let urls = Arc::clone(&pinger.urls);
        let keep_alive = KeepAlive::with_parts(
            KeepAliveConfig::default(),
            pinger,
            env(&[("KOYEB_PUBLIC_DOMAIN", "demo.koyeb.app")]),
        )
        .unwrap();

        assert_eq!(keep_alive.status().app_url, NOT_CONFIGURED);
        keep_alive.ping_once().await.unwrap();

        assert_eq!(urls.lock().unwrap()[0], "https://demo.koyeb.app/api/health");
        assert_eq!(keep_alive.status().app_url, "https://demo.koyeb.app");
    }

    #[tokio::test(start_paused = true)]
    async fn loop_pings_every_interval() {
        let (keep_alive, calls) = configured(Reply::Status(200), 10);

        keep_alive.start();
        sleep(Duration::from_secs(35)).await;
        keep_alive.stop().await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(keep_alive.status().ping_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_200_does_not_trigger_cooldown() {
        let (keep_alive, calls) = configured(Reply::Status(500), 10);

        keep_alive.start();
        sleep(Duration::from_secs(35)).await;
        keep_alive.stop().await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(keep_alive.status().ping_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_adds_cooldown() {
        let (keep_alive, calls) = configured(Reply::Fail, 10);

        keep_alive.start();
        // ping at 10s, cooldown until 70s, next ping at 80s
        sleep(Duration::from_secs(75)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        keep_alive.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_right_after_start_makes_no_calls() {
        let (keep_alive, calls) = configured(Reply::Status(200), 10);

        assert!(keep_alive.start());
        keep_alive.stop().await;
        assert!(!keep_alive.is_running());

        sleep(Duration::from_secs(1000)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!keep_alive.status().running);
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_runs_one_loop() {
        let (keep_alive, calls) = configured(Reply::Status(200), 10);

        assert!(keep_alive.start());
        assert!(!keep_alive.start());
        sleep(Duration::from_secs(15)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        keep_alive.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_interrupts_in_flight_request() {
        let (keep_alive, calls) = configured(Reply::Hang, 10);

        keep_alive.start();
        sleep(Duration::from_secs(11)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        keep_alive.stop().await;
        assert!(!keep_alive.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_interrupts_cooldown() {
        let (keep_alive, calls) = configured(Reply::Fail, 10);

        keep_alive.start();
        sleep(Duration::from_secs(20)).await;
        keep_alive.stop().await;

        sleep(Duration::from_secs(600)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_when_idle_is_noop() {
        let (keep_alive, _) = configured(Reply::Status(200), 10);

        keep_alive.stop().await;
        assert!(!keep_alive.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn can_restart_after_stop() {
        let (keep_alive, calls) = configured(Reply::Status(200), 10);

        keep_alive.start();
        keep_alive.stop().await;
        assert!(keep_alive.start());
        sleep(Duration::from_secs(11)).await;
        keep_alive.stop().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let (pinger, _) = ScriptedPinger::new(Reply::Status(200));
        let cfg = KeepAliveConfig::default().with_interval_secs(0);

        assert!(KeepAlive::with_parts(cfg, pinger, env(&[])).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_refused_while_stop_is_joining() {
        let (keep_alive, calls) = configured(Reply::Hang, 10);

        keep_alive.start();
        sleep(Duration::from_secs(11)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stop = keep_alive.stop();
        tokio::pin!(stop);
        tokio::select! {
            biased;
            _ = &mut stop => panic!("stop finished before the loop was polled"),
            _ = std::future::ready(()) => {}
        }

        assert!(!keep_alive.is_running());
        assert!(!keep_alive.start());

        stop.await;
        assert!(keep_alive.start());
        keep_alive.stop().await;
    }

    #[test]
    fn status_reports_app_url_before_first_ping() {
        let (pinger, calls) = ScriptedPinger::new(Reply::Status(200));
        let keep_alive = KeepAlive::with_parts(
            KeepAliveConfig::default(),
            pinger,
            env(&[("APP_URL", "https://svc.test")]),
        )
        .unwrap();

        assert_eq!(keep_alive.status().app_url, "https://svc.test");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn status_before_start() {
        let (keep_alive, _) = configured(Reply::Status(200), 240);
        let status = keep_alive.status();

        assert!(!status.running);
        assert_eq!(status.interval_seconds, 240);
        assert_eq!(status.ping_count, 0);
        assert!(status.last_ping.is_none());
    }
}
