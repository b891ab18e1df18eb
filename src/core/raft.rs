use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use parking_lot::RwLock;
use parking_lot::RwLockWriteGuard;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;

use super::CommittedEntry;
use super::ElectionHandler;
use super::ElectionTimer;
use super::LogEvent;
use super::ReplicationHandler;
use super::ReplicationLog;
use super::ReplicationTimer;
use super::RoleEvent;
use super::RoleSnapshot;
use super::RoleState;
use super::RoleStateMachine;
use super::Transition;
use crate::metrics::COMMIT_INDEX_METRIC;
use crate::metrics::CURRENT_TERM_METRIC;
use crate::metrics::ELECTIONS_STARTED_METRIC;
use crate::metrics::LEADER_ELECTED_METRIC;
use crate::metrics::REPLICATION_REJECTED_METRIC;
use crate::proto::AppendEntriesRequest;
use crate::proto::AppendEntriesResponse;
use crate::proto::LogEntry;
use crate::proto::VoteRequest;
use crate::proto::VoteResponse;
use crate::HardState;
use crate::RaftNodeConfig;
use crate::Result;
use crate::StateStorage;
use crate::StateTransitionError;
use crate::Transport;

/// Result of a `submit` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proposal {
    /// Index the command will occupy if it ever commits
    pub index: u64,
    pub term: u64,
    pub is_leader: bool,
}

struct EventReceivers {
    role_rx: mpsc::UnboundedReceiver<RoleEvent>,
    log_rx: mpsc::UnboundedReceiver<LogEvent>,
    replicate_rx: mpsc::UnboundedReceiver<()>,
}

/// One consensus peer.
///
/// Role and log state each sit behind their own reader/writer lock. The
/// writer side is taken by the event loops, the RPC handlers and `submit`;
/// when both are needed the role lock is always taken first.
pub struct Raft {
    pub node_id: u32,
    peers: Vec<u32>,
    settings: Arc<RaftNodeConfig>,

    role: RoleStateMachine,
    log: RwLock<ReplicationLog>,

    storage: Arc<dyn StateStorage>,
    transport: Arc<dyn Transport>,

    election_handler: Arc<ElectionHandler>,
    replication_handler: Arc<ReplicationHandler>,

    election_timer: ElectionTimer,
    replication_timer: ReplicationTimer,

    // Event queues feeding the writer side
    role_tx: mpsc::UnboundedSender<RoleEvent>,
    log_tx: mpsc::UnboundedSender<LogEvent>,
    replicate_tx: mpsc::UnboundedSender<()>,
    receivers: Mutex<Option<EventReceivers>>,

    // For business logic to apply logs into state machine
    commit_tx: mpsc::UnboundedSender<CommittedEntry>,

    shutdown_tx: watch::Sender<()>,
    stopped: AtomicBool,
}

impl Raft {
    /// Builds the peer from `settings`, recovering whatever `storage` holds.
    ///
    /// Nothing runs until [`run`](Self::run) is called.
    pub(crate) fn new(
        settings: Arc<RaftNodeConfig>,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn StateStorage>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<CommittedEntry>)> {
        let node_id = settings.cluster.node_id;
        let peers = settings.cluster.peers.clone();

        let (hard_state, entries) = match storage.load_state()? {
            Some(state) => (state.hard_state, state.log),
            None => (HardState::default(), Vec::new()),
        };
        info!(
            "[Node {}] start with term={}, voted_for={:?}, log_len={}, peers={:?}",
            node_id,
            hard_state.current_term,
            hard_state.voted_for,
            entries.len(),
            peers
        );

        let (role_tx, role_rx) = mpsc::unbounded_channel();
        let (log_tx, log_rx) = mpsc::unbounded_channel();
        let (replicate_tx, replicate_rx) = mpsc::unbounded_channel();
        let (commit_tx, commit_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = watch::channel(());

        let election_timer = {
            let role_tx = role_tx.clone();
            ElectionTimer::new(
                settings.raft.election.timeout_range(),
                Arc::new(move || {
                    let _ = role_tx.send(RoleEvent::ElectionTimeout);
                }),
            )
        };
        let replication_timer = {
            let replicate_tx = replicate_tx.clone();
            ReplicationTimer::new(
                settings.raft.replication.heartbeat_interval(),
                Arc::new(move || {
                    let _ = replicate_tx.send(());
                }),
            )
        };

        CURRENT_TERM_METRIC
            .with_label_values(&[&node_id.to_string()])
            .set(hard_state.current_term as i64);

        let raft = Self {
            node_id,
            log: RwLock::new(ReplicationLog::new(node_id, peers.clone(), entries)),
            role: RoleStateMachine::new(node_id, hard_state),
            peers,
            settings,
            storage,
            transport,
            election_handler: Arc::new(ElectionHandler::new(node_id)),
            replication_handler: Arc::new(ReplicationHandler::new(node_id)),
            election_timer,
            replication_timer,
            role_tx,
            log_tx,
            replicate_tx,
            receivers: Mutex::new(Some(EventReceivers {
                role_rx,
                log_rx,
                replicate_rx,
            })),
            commit_tx,
            shutdown_tx,
            stopped: AtomicBool::new(false),
        };
        Ok((raft, commit_rx))
    }

    /// Spawns the role loop, the log loop and the replication loop, then arms
    /// the election timer. Must be called from within a tokio runtime.
    pub fn run(self: &Arc<Self>) -> Result<()> {
        self.ensure_running()?;
        let Some(receivers) = self.receivers.lock().take() else {
            return Err(StateTransitionError::AlreadyRunning(self.node_id).into());
        };

        tokio::spawn(self.clone().role_loop(receivers.role_rx, self.shutdown_tx.subscribe()));
        tokio::spawn(self.clone().log_loop(receivers.log_rx, self.shutdown_tx.subscribe()));
        tokio::spawn(
            self.clone()
                .replication_loop(receivers.replicate_rx, self.shutdown_tx.subscribe()),
        );

        self.election_timer.reset();
        info!("[Node {}] started", self.node_id);
        Ok(())
    }

    /// Stops timers and event loops. In-flight RPC tasks finish on their own
    /// and their results are discarded.
    pub fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shutdown_tx.send_replace(());
        self.election_timer.stop();
        self.replication_timer.stop();
        info!("[Node {}] shut down", self.node_id);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_stopped() {
            return Err(StateTransitionError::Stopped(self.node_id).into());
        }
        Ok(())
    }

    async fn role_loop(
        self: Arc<Self>,
        mut role_rx: mpsc::UnboundedReceiver<RoleEvent>,
        mut shutdown_signal: watch::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                // Use biased to ensure branch order
                biased;
                _ = shutdown_signal.changed() => {
                    debug!("[Raft:{}] role loop stopped.", self.node_id);
                    return;
                }
                Some(event) = role_rx.recv() => {
                    trace!("[Raft:{}] receive role event: {:?}", self.node_id, event);
                    if let Err(e) = self.handle_role_event(event) {
                        error!("[Raft:{}] handle_role_event: {:?}", self.node_id, e);
                    }
                }
            }
        }
    }

    async fn log_loop(
        self: Arc<Self>,
        mut log_rx: mpsc::UnboundedReceiver<LogEvent>,
        mut shutdown_signal: watch::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown_signal.changed() => {
                    debug!("[Raft:{}] log loop stopped.", self.node_id);
                    return;
                }
                Some(event) = log_rx.recv() => {
                    trace!("[Raft:{}] receive log event: {:?}", self.node_id, event);
                    self.handle_log_event(event);
                }
            }
        }
    }

    async fn replication_loop(
        self: Arc<Self>,
        mut replicate_rx: mpsc::UnboundedReceiver<()>,
        mut shutdown_signal: watch::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown_signal.changed() => {
                    debug!("[Raft:{}] replication loop stopped.", self.node_id);
                    return;
                }
                Some(()) = replicate_rx.recv() => {
                    self.replicate_round();
                }
            }
        }
    }

    /// Queue side of the role state machine.
    ///
    /// An election expiry is only honoured if no reset landed between the
    /// timer firing and this point.
    pub(crate) fn handle_role_event(
        &self,
        event: RoleEvent,
    ) -> Result<Transition> {
        let mut role = self.role.write();
        if event == RoleEvent::ElectionTimeout && !self.election_timer.take_fired() {
            debug!("[Raft:{}] election expiry superseded by a reset", self.node_id);
            return Ok(Transition::Ignored);
        }
        self.apply_role_event(&mut role, event)
    }

    /// Applies `event` inside the caller's writer section and carries out its
    /// side effects before the section ends.
    fn apply_role_event(
        &self,
        role: &mut RoleState,
        event: RoleEvent,
    ) -> Result<Transition> {
        let transition = role.apply(event);
        let node_label = self.node_id.to_string();

        match transition {
            Transition::Ignored => return Ok(transition),
            Transition::SteppedDown { .. } | Transition::VoteRecorded { .. } => {
                self.replication_timer.stop();
                self.election_timer.reset();
            }
            Transition::BecameCandidate { .. } => {
                self.election_timer.reset();
                ELECTIONS_STARTED_METRIC.with_label_values(&[&node_label]).inc();
            }
            Transition::BecameLeader { .. } => {
                self.election_timer.stop();
                self.log.write().init_leader_progress();
                LEADER_ELECTED_METRIC.with_label_values(&[&node_label]).inc();
            }
        }
        CURRENT_TERM_METRIC
            .with_label_values(&[&node_label])
            .set(role.current_term() as i64);

        if transition.requires_persist() {
            self.persist(role, &self.log.read())?;
        }

        match transition {
            Transition::BecameCandidate { term } => {
                let request = {
                    let log = self.log.read();
                    VoteRequest {
                        term,
                        candidate_id: self.node_id,
                        last_log_index: log.last_log_index(),
                        last_log_term: log.last_log_term(),
                    }
                };
                self.election_handler
                    .start_election(request, self.peers.clone(), &self.transport, &self.role_tx);
            }
            Transition::BecameLeader { .. } => {
                // first heartbeat goes out right away
                let _ = self.replicate_tx.send(());
            }
            _ => {}
        }

        Ok(transition)
    }

    pub(crate) fn handle_log_event(
        &self,
        event: LogEvent,
    ) {
        let role = self.role.read();
        let mut log = self.log.write();

        let term = match &event {
            LogEvent::ReplicationSucceeded { term, .. } | LogEvent::ReplicationFailed { term, .. } => *term,
        };
        if !role.is_leader() || role.current_term() != term {
            debug!(
                "[Raft:{}] drop replication result of term {} (role={}, term={})",
                self.node_id,
                term,
                role.role(),
                role.current_term()
            );
            return;
        }

        match event {
            LogEvent::ReplicationSucceeded {
                peer,
                prev_log_index,
                applied_count,
                ..
            } => {
                if log.record_replication_success(peer, prev_log_index, applied_count) && log.try_commit(term) {
                    self.deliver_committed(&mut log);
                }
            }
            LogEvent::ReplicationFailed {
                peer,
                prev_log_index,
                conflict_term,
                conflict_index,
                ..
            } => {
                REPLICATION_REJECTED_METRIC
                    .with_label_values(&[&self.node_id.to_string(), &peer.to_string()])
                    .inc();
                log.record_replication_failure(peer, prev_log_index, conflict_term, conflict_index);
            }
        }
    }

    /// One heartbeat/replication round to every follower.
    fn replicate_round(&self) {
        let requests = {
            let role = self.role.read();
            if !role.is_leader() {
                trace!("[Raft:{}] not leader, skip replication round", self.node_id);
                return;
            }
            let term = role.current_term();
            let max_entries = self.settings.raft.replication.append_entries_max_entries_per_replication;

            let log = self.log.read();
            let requests: Vec<(u32, AppendEntriesRequest)> = self
                .peers
                .iter()
                .map(|peer| (*peer, log.build_append_request(*peer, term, max_entries)))
                .collect();

            // still leader while the role read section is held
            self.replication_timer.reset();
            requests
        };

        self.replication_handler
            .broadcast_append_entries(requests, &self.transport, &self.role_tx, &self.log_tx);
    }

    fn persist(
        &self,
        role: &RoleState,
        log: &ReplicationLog,
    ) -> Result<()> {
        self.storage.save_state(&role.hard_state(), log.entries()).map_err(|e| {
            error!("[Raft:{}] failed to persist state: {:?}", self.node_id, e);
            e
        })
    }

    /// Hands newly committed entries to the application while the log writer
    /// section is still held, which keeps delivery in index order.
    fn deliver_committed(
        &self,
        log: &mut ReplicationLog,
    ) {
        let committed = log.take_committed();
        if committed.is_empty() {
            return;
        }

        COMMIT_INDEX_METRIC
            .with_label_values(&[&self.node_id.to_string()])
            .set(log.commit_index() as i64);

        for entry in committed {
            trace!("[Raft:{}] deliver committed entry {}", self.node_id, entry.index);
            if self.commit_tx.send(entry).is_err() {
                debug!("[Raft:{}] commit stream closed", self.node_id);
                return;
            }
        }
    }

    // ---------------------------------------------------------------------
    // Inbound RPCs

    /// RequestVote handler. The whole decision happens in one role writer
    /// section so the check and the recorded vote cannot interleave with
    /// another grant.
    pub fn handle_request_vote(
        &self,
        request: VoteRequest,
    ) -> Result<VoteResponse> {
        self.ensure_running()?;
        let mut role = self.role.write();

        if request.term > role.current_term() {
            self.apply_role_event(
                &mut role,
                RoleEvent::HigherTermObserved {
                    term: request.term,
                    originator: Some(request.candidate_id),
                },
            )?;
        }

        if request.term < role.current_term() {
            debug!(
                "[Raft:{}] reject vote for {}: term {} < {}",
                self.node_id,
                request.candidate_id,
                request.term,
                role.current_term()
            );
            return Ok(VoteResponse {
                term: role.current_term(),
                vote_granted: false,
            });
        }

        let log_ok = self
            .log
            .read()
            .is_at_least_as_up_to_date_as(request.last_log_index, request.last_log_term);

        let vote_granted = if role.can_vote_for(request.candidate_id) && log_ok {
            let transition = self.apply_role_event(
                &mut role,
                RoleEvent::VoteGranted {
                    term: request.term,
                    candidate: request.candidate_id,
                },
            )?;
            matches!(transition, Transition::VoteRecorded { .. })
        } else {
            debug!(
                "[Raft:{}] reject vote for {}: voted_for={:?}, log_ok={}",
                self.node_id,
                request.candidate_id,
                role.voted_for(),
                log_ok
            );
            false
        };

        Ok(VoteResponse {
            term: role.current_term(),
            vote_granted,
        })
    }

    /// AppendEntries handler
    pub fn handle_append_entries(
        &self,
        request: AppendEntriesRequest,
    ) -> Result<AppendEntriesResponse> {
        self.ensure_running()?;
        let mut role = self.role.write();

        if request.term >= role.current_term() {
            self.election_timer.reset();
        }
        if request.term > role.current_term() || (request.term == role.current_term() && role.is_candidate()) {
            self.apply_role_event(
                &mut role,
                RoleEvent::HigherTermObserved {
                    term: request.term,
                    originator: Some(request.leader_id),
                },
            )?;
        }

        // term stays fixed while the log is examined
        let role = RwLockWriteGuard::downgrade(role);
        let current_term = role.current_term();
        if request.term < current_term {
            debug!(
                "[Raft:{}] reject append from {}: term {} < {}",
                self.node_id, request.leader_id, request.term, current_term
            );
            return Ok(AppendEntriesResponse::rejected(current_term));
        }

        let mut log = self.log.write();
        if let Some((conflict_term, conflict_index)) =
            log.check_consistency(request.prev_log_index, request.prev_log_term)
        {
            return Ok(AppendEntriesResponse::conflict(current_term, conflict_term, conflict_index));
        }

        let last_new_index = request.prev_log_index + request.entries.len() as u64;
        if log.merge_remote_entries(request.prev_log_index, request.entries) {
            self.persist(&role, &log)?;
            log.mark_persisted();
        }
        log.advance_follower_commit(request.leader_commit, last_new_index);
        self.deliver_committed(&mut log);

        Ok(AppendEntriesResponse::success(current_term))
    }

    // ---------------------------------------------------------------------
    // Application facing

    /// Appends `command` if this peer leads; never waits for replication.
    ///
    /// The entry is persisted before the index is handed out. If that fails
    /// the entry is dropped again and the error returned.
    pub fn submit(
        &self,
        command: Vec<u8>,
    ) -> Result<Proposal> {
        self.ensure_running()?;
        let role = self.role.read();
        let mut log = self.log.write();
        let term = role.current_term();

        if !role.is_leader() {
            return Ok(Proposal {
                index: log.last_log_index() + 1,
                term,
                is_leader: false,
            });
        }

        let index = log.append_command(term, command);
        if let Err(e) = self.persist(&role, &log) {
            log.discard_unpersisted(index);
            return Err(e);
        }

        // a single voter commits on its own
        if log.try_commit(term) {
            self.deliver_committed(&mut log);
        }

        debug!("[Raft:{}] accepted proposal at {} in term {}", self.node_id, index, term);
        Ok(Proposal {
            index,
            term,
            is_leader: true,
        })
    }

    pub fn role_snapshot(&self) -> RoleSnapshot {
        self.role.snapshot()
    }

    pub fn current_term(&self) -> u64 {
        self.role.current_term()
    }

    pub fn is_leader(&self) -> bool {
        self.role.is_leader()
    }

    pub fn commit_index(&self) -> u64 {
        self.log.read().commit_index()
    }

    pub fn last_applied(&self) -> u64 {
        self.log.read().last_applied()
    }

    pub fn last_log_index(&self) -> u64 {
        self.log.read().last_log_index()
    }

    /// Copy of the log without the index-0 sentinel
    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.log.read().entries().to_vec()
    }

    /// Applies `event` as if it had been dequeued, skipping the timer check
    #[cfg(test)]
    pub(crate) fn force_role_event(
        &self,
        event: RoleEvent,
    ) -> Result<Transition> {
        let mut role = self.role.write();
        self.apply_role_event(&mut role, event)
    }

    #[cfg(test)]
    pub(crate) fn with_log<R>(
        &self,
        f: impl FnOnce(&mut ReplicationLog) -> R,
    ) -> R {
        f(&mut self.log.write())
    }

    #[cfg(test)]
    pub(crate) fn election_timer_armed(&self) -> bool {
        self.election_timer.is_armed()
    }

    #[cfg(test)]
    pub(crate) fn replication_timer_armed(&self) -> bool {
        self.replication_timer.is_armed()
    }
}
