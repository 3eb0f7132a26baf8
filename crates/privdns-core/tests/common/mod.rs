//! Test doubles and common utilities for validation contract tests
//!
//! The prober never touches the network: it answers after a configurable
//! (virtual) latency, fails, or holds its answer until released. Tests run
//! with a paused tokio clock so latencies and backoff are deterministic.

#![allow(dead_code)]

use privdns_core::{
    DOT_PORT, EngineConfig, Error, PrivateDnsMode, PrivateDnsServer, Prober, ServerIdentity,
    StaticFlags, Validation, ValidationEngine, ValidationObserver,
};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

pub const NET_ID: u32 = 30;
pub const MARK: u32 = 30;
pub const SERVER1: &str = "127.0.2.2";
pub const SERVER2: &str = "127.0.2.3";

/// Install a test-writer subscriber once per test binary
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}

/// Identity of an opportunistic server on the DoT port
pub fn identity(ip: &str) -> ServerIdentity {
    let address = SocketAddr::new(ip.parse().expect("test address parses"), DOT_PORT);
    ServerIdentity::new(address, "")
}

/// One scripted probe result
#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// Answer after this many milliseconds
    Answer(u64),
    /// Fail the probe
    Fail,
    /// Panic inside the probe, crashing the attempt's task
    Panic,
}

/// A prober whose behaviour is driven by the test
///
/// Scripted steps are consumed first, one per probe; once the script is
/// empty every probe answers after `latency_ms`, or fails if `failing`.
pub struct ScriptedProber {
    latency_ms: AtomicU64,
    failing: AtomicBool,
    script: Mutex<VecDeque<Step>>,
    blocked: watch::Sender<bool>,
    probes: Mutex<HashMap<String, usize>>,
}

impl ScriptedProber {
    pub fn new() -> Arc<Self> {
        let (blocked, _) = watch::channel(false);
        Arc::new(Self {
            latency_ms: AtomicU64::new(0),
            failing: AtomicBool::new(false),
            script: Mutex::new(VecDeque::new()),
            blocked,
            probes: Mutex::new(HashMap::new()),
        })
    }

    /// Latency of every unscripted answer
    pub fn set_latency_ms(&self, ms: u64) {
        self.latency_ms.store(ms, Ordering::SeqCst);
    }

    /// Make every unscripted probe fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Queue results for the next probes
    pub fn push_script(&self, steps: &[Step]) {
        self.script.lock().unwrap().extend(steps.iter().copied());
    }

    /// Hold every probe's answer until [`release`](Self::release)
    pub fn block(&self) {
        self.blocked.send_replace(true);
    }

    /// Let held and future probes answer
    pub fn release(&self) {
        self.blocked.send_replace(false);
    }

    /// Number of probes started against a server
    pub fn probe_count(&self, ip: &str) -> usize {
        self.probes.lock().unwrap().get(ip).copied().unwrap_or(0)
    }

    pub fn reset_counts(&self) {
        self.probes.lock().unwrap().clear();
    }
}

#[async_trait::async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, server: &PrivateDnsServer) -> privdns_core::Result<()> {
        *self
            .probes
            .lock()
            .unwrap()
            .entry(server.ip_string())
            .or_default() += 1;

        let mut blocked = self.blocked.subscribe();
        let _ = blocked.wait_for(|blocked| !*blocked).await;

        let scripted = self.script.lock().unwrap().pop_front();
        let step = scripted.unwrap_or_else(|| {
            if self.failing.load(Ordering::SeqCst) {
                Step::Fail
            } else {
                Step::Answer(self.latency_ms.load(Ordering::SeqCst))
            }
        });

        match step {
            Step::Answer(ms) => {
                if ms > 0 {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                }
                Ok(())
            }
            Step::Fail => Err(Error::probe("connection refused")),
            Step::Panic => panic!("scripted prober crashed"),
        }
    }
}

/// An observer recording every notification
///
/// Like a production listener it keeps the last state per server; it also
/// counts running attempts: the first `in_process` of an attempt increments,
/// a terminal state decrements.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<(String, Validation, u32)>>,
    states: Mutex<HashMap<String, Validation>>,
    running: AtomicI32,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every notification so far, in order
    pub fn events(&self) -> Vec<(String, Validation, u32)> {
        self.events.lock().unwrap().clone()
    }

    /// States reported for one server, in order
    pub fn history(&self, ip: &str) -> Vec<Validation> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(server, _, _)| server == ip)
            .map(|(_, validation, _)| *validation)
            .collect()
    }

    /// Forget recorded notifications (running count and states are kept)
    pub fn clear_history(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Last state per server
    pub fn state_map(&self) -> HashMap<String, Validation> {
        self.states.lock().unwrap().clone()
    }

    /// Drop a server the network no longer has from the state map
    pub fn remove_from_state_map(&self, ip: &str) {
        self.states.lock().unwrap().remove(ip);
    }

    /// Attempts started and not yet finished
    pub fn running(&self) -> i32 {
        self.running.load(Ordering::SeqCst)
    }
}

impl ValidationObserver for RecordingObserver {
    fn on_validation_state_update(&self, server: &str, validation: Validation, net_id: u32) {
        self.events
            .lock()
            .unwrap()
            .push((server.to_string(), validation, net_id));

        let mut states = self.states.lock().unwrap();
        match validation {
            Validation::InProcess => {
                if states.get(server) != Some(&Validation::InProcess) {
                    self.running.fetch_add(1, Ordering::SeqCst);
                }
            }
            Validation::Success | Validation::Fail => {
                self.running.fetch_sub(1, Ordering::SeqCst);
            }
        }
        states.insert(server.to_string(), validation);
    }
}

/// Engine, collaborators and observer wired together
pub struct Harness {
    pub engine: ValidationEngine,
    pub prober: Arc<ScriptedProber>,
    pub flags: Arc<StaticFlags>,
    pub observer: Arc<RecordingObserver>,
}

impl Harness {
    /// Backoff pinned to one second, thresholds 500 / 1000 ms, flag off
    pub fn new() -> Self {
        Self::with_config(minimal_config())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        init_tracing();

        let prober = ScriptedProber::new();
        let flags = Arc::new(StaticFlags::new(false, 500, 1000));
        let observer = RecordingObserver::new();

        let engine = ValidationEngine::new(prober.clone(), flags.clone(), config)
            .expect("engine construction succeeds");
        engine.set_observer(observer.clone());

        Self {
            engine,
            prober,
            flags,
            observer,
        }
    }

    /// Whether the engine's status agrees with what the observer saw
    pub fn status_matches_observer(&self, mode: PrivateDnsMode) -> bool {
        let status = self.engine.get_status(NET_ID);
        status.mode == mode && status.by_ip() == self.observer.state_map()
    }

    /// Wait until the engine's status agrees with the observer
    pub async fn expect_status(&self, mode: PrivateDnsMode) {
        assert!(
            wait_until(|| self.status_matches_observer(mode)).await,
            "status {:?} never matched observer {:?} in mode {}",
            self.engine.get_status(NET_ID),
            self.observer.state_map(),
            mode
        );
    }

    /// Wait until exactly `n` attempts are running
    pub async fn expect_running(&self, n: i32) {
        assert!(
            wait_until(|| self.observer.running() == n).await,
            "expected {} running attempts, observer reports {}",
            n,
            self.observer.running()
        );
    }
}

/// Engine configuration used by the contract tests
pub fn minimal_config() -> EngineConfig {
    EngineConfig::new()
        .with_initial_retransmission_time(Duration::from_secs(1))
        .with_maximum_retransmission_time(Duration::from_secs(1))
}

/// Poll `condition` every 10 ms for up to 30 s
pub async fn wait_until(condition: impl Fn() -> bool) -> bool {
    for _ in 0..3000 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
