//! Node assembly and thread layout.
//!
//! [`Node::start`] wires the collaborators into the core and can be driven
//! step by step (tests, benches). [`Node::spawn`] moves it onto threads:
//!
//! | Thread      | Work                                              |
//! |-------------|---------------------------------------------------|
//! | `cmc-bus`   | serves bus requests through the dispatcher        |
//! | `cmc-timer` | second tick, then acquisition tick, by priority   |
//! | caller      | reporting cadence ([`RunningNode::run_reporting`])|
//!
//! Shutdown is cooperative: every loop watches the shared running flag.

use cmc_common::bus::BusMessage;
use cmc_common::config::{NodeConfig, TimingConfig};
use cmc_common::facility::FacilityRegistry;
use cmc_common::hal::Transport;
use cmc_common::status::{StatusId, StatusValue};
use cmc_hal::DriverSet;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::acquisition::{Acquisition, TickReport};
use crate::cadence::{CadenceStep, ReportingCadence};
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::error::NodeError;
use crate::guard::DwellConfig;
use crate::scheduler::Scheduler;
use crate::state::NodeState;

/// Facilities registered by the node besides the registry itself.
const NODE_FACILITIES: usize = 2;

/// Bus thread wake-up interval while idle.
const BUS_POLL: Duration = Duration::from_millis(50);

/// Cooperative yield of the reporting loop.
const REPORT_YIELD: Duration = Duration::from_millis(5);

const SECOND_TICK_PRIORITY: u8 = 10;
const ACQUISITION_PRIORITY: u8 = 5;

// ─── Node ───────────────────────────────────────────────────────────

/// Assembled node, not yet running.
pub struct Node {
    state: Arc<NodeState>,
    registry: Arc<Mutex<FacilityRegistry>>,
    transport: Arc<dyn Transport>,
    acquisition: Acquisition,
    dispatcher: Dispatcher,
    cadence: ReportingCadence,
    timing: TimingConfig,
}

impl Node {
    /// Validate the configuration and wire the drivers into the core.
    ///
    /// The remote drive output is switched off before anything else.
    ///
    /// # Errors
    /// Configuration, registry, converter setup and driver errors abort the
    /// start.
    pub fn start(config: &NodeConfig, drivers: DriverSet) -> Result<Self, NodeError> {
        config.validate()?;

        let DriverSet {
            acquisition: source,
            mut outputs,
            transport,
        } = drivers;
        outputs.set_drive(false)?;

        let registry = Arc::new(Mutex::new(FacilityRegistry::new(NODE_FACILITIES)?));
        let state = Arc::new(NodeState::new(DwellConfig::from(config.guard)));
        let acquisition = Acquisition::start(
            source,
            transport.clone(),
            state.clone(),
            registry.clone(),
            &config.adc,
        )?;
        let dispatcher = Dispatcher::new(state.clone(), outputs);
        let cadence = ReportingCadence::new(config.timing.report_spacing_ms);

        info!(
            service = %config.shared.service_name,
            min_on_s = config.guard.min_on_dwell_s,
            min_off_s = config.guard.min_off_dwell_s,
            "Node started"
        );

        Ok(Self {
            state,
            registry,
            transport,
            acquisition,
            dispatcher,
            cadence,
            timing: config.timing,
        })
    }

    #[inline]
    pub fn state(&self) -> &Arc<NodeState> {
        &self.state
    }

    /// Advance the second counter by `seconds`.
    pub fn advance_seconds(&self, seconds: u32) -> u32 {
        self.state.clock.advance(seconds)
    }

    /// Run one acquisition tick.
    pub fn acquire(&mut self) -> TickReport {
        self.acquisition.tick()
    }

    /// Handle one bus message in place.
    pub fn handle(&mut self, msg: &mut BusMessage) -> DispatchOutcome {
        self.dispatcher.handle(msg)
    }

    /// Poll the reporting cadence once.
    pub fn poll_report(&mut self, now_ms: u64) -> CadenceStep {
        self.cadence.poll(now_ms, &self.state, self.transport.as_ref())
    }

    /// Value and age of a point now.
    pub fn read(&self, id: StatusId) -> (StatusValue, u8) {
        self.state.read_point(id, self.state.now())
    }

    /// Latched facility status record.
    pub fn facility_status(&self) -> [u8; 8] {
        self.registry.lock().status()
    }

    /// Start the bus and timer threads.
    ///
    /// # Errors
    /// `NodeError::Io` if a thread cannot be spawned.
    pub fn spawn(self, running: Arc<AtomicBool>) -> Result<RunningNode, NodeError> {
        let Node {
            state,
            registry,
            transport,
            mut acquisition,
            mut dispatcher,
            cadence,
            timing,
        } = self;

        let (tx, rx) = mpsc::channel::<BusRequest>();
        let bus_running = running.clone();
        let bus = thread::Builder::new()
            .name("cmc-bus".into())
            .spawn(move || {
                debug!("Bus thread running");
                while bus_running.load(Ordering::Acquire) {
                    match rx.recv_timeout(BUS_POLL) {
                        Ok(BusRequest { mut msg, reply }) => {
                            let outcome = dispatcher.handle(&mut msg);
                            // Requester may have given up; nothing to do then.
                            let _ = reply.send((msg, outcome));
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("Bus thread stopped");
            })?;

        let mut scheduler = Scheduler::new();
        let start = Instant::now();
        let tick_state = state.clone();
        scheduler.add(
            "second_tick",
            Duration::from_millis(timing.second_tick_ms),
            SECOND_TICK_PRIORITY,
            start,
            move || {
                tick_state.clock.tick();
            },
        );
        scheduler.add(
            "acquisition",
            Duration::from_millis(timing.acquisition_period_ms),
            ACQUISITION_PRIORITY,
            start,
            move || {
                acquisition.tick();
            },
        );

        let timer_running = running.clone();
        let timer = thread::Builder::new()
            .name("cmc-timer".into())
            .spawn(move || {
                debug!("Timer thread running");
                scheduler.run(&timer_running);
                for name in ["second_tick", "acquisition"] {
                    if let Some(stats) = scheduler.stats(name) {
                        debug!(task = name, runs = stats.runs, overruns = stats.overruns, "Task stopped");
                    }
                }
            })?;

        info!("Node threads running");
        Ok(RunningNode {
            state,
            registry,
            transport,
            cadence,
            client: BusClient { tx },
            running,
            threads: vec![bus, timer],
        })
    }
}

// ─── Running node ───────────────────────────────────────────────────

struct BusRequest {
    msg: BusMessage,
    reply: mpsc::Sender<(BusMessage, DispatchOutcome)>,
}

/// Handle for submitting bus messages to the bus thread.
#[derive(Clone)]
pub struct BusClient {
    tx: mpsc::Sender<BusRequest>,
}

impl BusClient {
    /// Submit a message and wait for the dispatcher's answer.
    ///
    /// # Errors
    /// `NodeError::BusClosed` once the bus thread has stopped.
    pub fn request(&self, msg: BusMessage) -> Result<(BusMessage, DispatchOutcome), NodeError> {
        let (reply, response) = mpsc::channel();
        self.tx
            .send(BusRequest { msg, reply })
            .map_err(|_| NodeError::BusClosed)?;
        response.recv().map_err(|_| NodeError::BusClosed)
    }
}

/// Node with its bus and timer threads running.
pub struct RunningNode {
    state: Arc<NodeState>,
    registry: Arc<Mutex<FacilityRegistry>>,
    transport: Arc<dyn Transport>,
    cadence: ReportingCadence,
    client: BusClient,
    running: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl RunningNode {
    pub fn client(&self) -> BusClient {
        self.client.clone()
    }

    #[inline]
    pub fn state(&self) -> &Arc<NodeState> {
        &self.state
    }

    /// Shared facility registry, for the console's status command.
    pub fn registry(&self) -> Arc<Mutex<FacilityRegistry>> {
        self.registry.clone()
    }

    /// Run the reporting cadence on the calling thread until shutdown.
    pub fn run_reporting(&mut self) {
        let start = Instant::now();
        while self.running.load(Ordering::Acquire) {
            let now_ms = start.elapsed().as_millis() as u64;
            if let CadenceStep::Emitted(id) =
                self.cadence.poll(now_ms, &self.state, self.transport.as_ref())
            {
                debug!(point = %id, "Reported");
            }
            thread::sleep(REPORT_YIELD);
        }
    }

    /// Clear the running flag and join the threads.
    pub fn shutdown(self) {
        self.running.store(false, Ordering::Release);
        drop(self.client);
        for handle in self.threads {
            let name = handle.thread().name().unwrap_or("?").to_string();
            if handle.join().is_err() {
                warn!(thread = %name, "Thread panicked");
            }
        }
        info!("Node stopped");
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
