use std::cmp;
use std::collections::HashMap;

use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::CommittedEntry;
use crate::is_target_log_more_recent;
use crate::proto::AppendEntriesRequest;
use crate::proto::LogEntry;
use crate::utils::cluster::is_majority;

/// Log entries plus the volatile replication bookkeeping of one peer.
///
/// `entries[0]` is the term-0 sentinel, so a log index is also the vector
/// position. Callers serialize every mutation through a single writer.
#[derive(Debug)]
pub struct ReplicationLog {
    node_id: u32,
    peers: Vec<u32>,
    entries: Vec<LogEntry>,
    commit_index: u64,
    last_applied: u64,
    next_index: HashMap<u32, u64>,
    match_index: HashMap<u32, u64>,
    /// Merged entries whose save has not succeeded yet
    unpersisted: bool,
}

impl ReplicationLog {
    /// `persisted` holds the recovered entries starting at index 1
    pub(crate) fn new(
        node_id: u32,
        peers: Vec<u32>,
        persisted: Vec<LogEntry>,
    ) -> Self {
        let mut entries = Vec::with_capacity(persisted.len() + 1);
        entries.push(LogEntry::sentinel());
        entries.extend(persisted);

        let next_index = peers.iter().map(|p| (*p, 1)).collect();
        let match_index = peers.iter().map(|p| (*p, 0)).collect();

        Self {
            node_id,
            peers,
            entries,
            commit_index: 0,
            last_applied: 0,
            next_index,
            match_index,
            unpersisted: false,
        }
    }

    pub fn last_log_index(&self) -> u64 {
        (self.entries.len() - 1) as u64
    }

    pub fn last_log_term(&self) -> u64 {
        self.entries.last().map(|e| e.term).unwrap_or(0)
    }

    /// Entry at `index`, the sentinel included.
    ///
    /// # Panics
    /// Indexing past the last entry is a logic error.
    pub fn entry_at(
        &self,
        index: u64,
    ) -> &LogEntry {
        match self.entries.get(index as usize) {
            Some(entry) => entry,
            None => panic!(
                "[Node {}] log index {} out of range [0, {}]",
                self.node_id,
                index,
                self.last_log_index()
            ),
        }
    }

    pub fn term_at(
        &self,
        index: u64,
    ) -> u64 {
        self.entry_at(index).term
    }

    pub fn commit_index(&self) -> u64 {
        self.commit_index
    }

    pub fn last_applied(&self) -> u64 {
        self.last_applied
    }

    pub fn next_index(
        &self,
        peer: u32,
    ) -> u64 {
        self.next_index.get(&peer).copied().unwrap_or(1)
    }

    pub fn match_index(
        &self,
        peer: u32,
    ) -> u64 {
        self.match_index.get(&peer).copied().unwrap_or(0)
    }

    /// Log entries without the sentinel, as they are persisted
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries[1..]
    }

    /// Election restriction: true if a candidate whose log ends at
    /// (`last_log_index`, `last_log_term`) is at least as up to date as ours
    pub fn is_at_least_as_up_to_date_as(
        &self,
        last_log_index: u64,
        last_log_term: u64,
    ) -> bool {
        is_target_log_more_recent(
            self.last_log_index(),
            self.last_log_term(),
            last_log_index,
            last_log_term,
        )
    }

    /// Leader only: appends `command` stamped with `term`, returns its index
    pub(crate) fn append_command(
        &mut self,
        term: u64,
        command: Vec<u8>,
    ) -> u64 {
        self.entries.push(LogEntry::new(term, command));
        let index = self.last_log_index();
        trace!("[Node {}] appended entry {} at term {}", self.node_id, index, term);
        index
    }

    /// Rolls back the entry `append_command` just added when it could not be
    /// made durable. Nothing can have replicated it yet since the caller
    /// still holds the writer side.
    pub(crate) fn discard_unpersisted(
        &mut self,
        index: u64,
    ) {
        assert_eq!(index, self.last_log_index());
        assert!(index > self.commit_index);
        self.entries.pop();
    }

    /// Consistency check of an inbound AppendEntries.
    ///
    /// Returns `None` when our log holds `prev_log_term` at `prev_log_index`,
    /// otherwise the `(conflict_term, conflict_index)` hint for the leader.
    pub(crate) fn check_consistency(
        &self,
        prev_log_index: u64,
        prev_log_term: u64,
    ) -> Option<(u64, u64)> {
        let last = self.last_log_index();
        if prev_log_index > last {
            debug!(
                "[Node {}] prev_log_index {} beyond last index {}",
                self.node_id, prev_log_index, last
            );
            return Some((self.term_at(last), last));
        }

        let term = self.term_at(prev_log_index);
        if term != prev_log_term {
            let first = self.first_index_of_run(prev_log_index);
            debug!(
                "[Node {}] term {} at {} does not match leader term {}, run starts at {}",
                self.node_id, term, prev_log_index, prev_log_term, first
            );
            return Some((term, first));
        }
        None
    }

    /// First index of the run of equal terms containing `index`, never below 1
    fn first_index_of_run(
        &self,
        index: u64,
    ) -> u64 {
        let term = self.term_at(index);
        let mut first = index;
        while first > 1 && self.term_at(first - 1) == term {
            first -= 1;
        }
        first
    }

    /// Last index holding `term`. The sentinel answers for term 0.
    fn last_index_of_term(
        &self,
        term: u64,
    ) -> Option<u64> {
        self.entries.iter().rposition(|e| e.term == term).map(|i| i as u64)
    }

    /// Follower side merge of entries that already passed
    /// [`check_consistency`](Self::check_consistency).
    ///
    /// Entries identical to ours are left in place; the first conflicting
    /// entry truncates the log from there.
    ///
    /// Returns whether the log has to be persisted before the request may be
    /// acknowledged. That stays true until [`mark_persisted`](Self::mark_persisted),
    /// so a resend of entries whose save failed is saved again.
    pub(crate) fn merge_remote_entries(
        &mut self,
        prev_log_index: u64,
        entries: Vec<LogEntry>,
    ) -> bool {
        let mut changed = false;

        for (offset, entry) in entries.into_iter().enumerate() {
            let index = prev_log_index + 1 + offset as u64;
            if index <= self.last_log_index() {
                if self.term_at(index) == entry.term {
                    continue;
                }
                assert!(
                    index > self.commit_index,
                    "[Node {}] refusing to truncate committed entry {} (commit_index={})",
                    self.node_id,
                    index,
                    self.commit_index
                );
                warn!(
                    "[Node {}] truncate log from {} (term {} != {})",
                    self.node_id,
                    index,
                    self.term_at(index),
                    entry.term
                );
                self.entries.truncate(index as usize);
            }
            self.entries.push(entry);
            changed = true;
        }

        if changed {
            self.unpersisted = true;
        }
        self.unpersisted
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.unpersisted = false;
    }

    /// Follower commit: follows the leader up to `last_new_index`, the last
    /// entry the accepted request vouched for. Only called once the merged
    /// entries are durable.
    pub(crate) fn advance_follower_commit(
        &mut self,
        leader_commit: u64,
        last_new_index: u64,
    ) {
        if self.unpersisted {
            warn!("[Node {}] commit_index held back, log not persisted", self.node_id);
            return;
        }
        let new_commit_index = cmp::min(leader_commit, last_new_index);
        if new_commit_index > self.commit_index {
            debug!(
                "[Node {}] follower commit_index {} -> {}",
                self.node_id, self.commit_index, new_commit_index
            );
            self.commit_index = new_commit_index;
        }
    }

    /// Resets every peer's progress when this peer takes over leadership
    pub(crate) fn init_leader_progress(&mut self) {
        let next = self.last_log_index() + 1;
        for peer in &self.peers {
            self.next_index.insert(*peer, next);
            self.match_index.insert(*peer, 0);
        }
        debug!("[Node {}] leader progress initialised, next_index={}", self.node_id, next);
    }

    /// AppendEntries for `peer` starting at its `nextIndex`, carrying at most
    /// `max_entries` entries
    pub(crate) fn build_append_request(
        &self,
        peer: u32,
        term: u64,
        max_entries: u64,
    ) -> AppendEntriesRequest {
        let next = cmp::min(self.next_index(peer), self.last_log_index() + 1);
        let prev_log_index = next - 1;
        let end = cmp::min(self.last_log_index(), prev_log_index + max_entries);
        let entries = self.entries[next as usize..=end as usize].to_vec();

        AppendEntriesRequest {
            term,
            leader_id: self.node_id,
            prev_log_index,
            prev_log_term: self.term_at(prev_log_index),
            entries,
            leader_commit: self.commit_index,
        }
    }

    fn is_stale_reply(
        &self,
        peer: u32,
        prev_log_index: u64,
    ) -> bool {
        let next = self.next_index(peer);
        if next != prev_log_index + 1 {
            debug!(
                "[Node {}] drop stale reply from {}: prev_log_index {} but next_index {}",
                self.node_id, peer, prev_log_index, next
            );
            return true;
        }
        false
    }

    /// `peer` stored `applied_count` entries after `prev_log_index`.
    ///
    /// Returns false when the reply no longer matches the peer's progress.
    pub(crate) fn record_replication_success(
        &mut self,
        peer: u32,
        prev_log_index: u64,
        applied_count: u64,
    ) -> bool {
        if self.is_stale_reply(peer, prev_log_index) {
            return false;
        }

        let next = prev_log_index + 1 + applied_count;
        self.next_index.insert(peer, next);
        self.match_index.insert(peer, next - 1);
        trace!(
            "[Node {}] peer {} next_index={}, match_index={}",
            self.node_id,
            peer,
            next,
            next - 1
        );
        true
    }

    /// Fast backtracking after `peer` rejected the request built at
    /// `prev_log_index`.
    ///
    /// When we hold `conflict_term`, resume right after our last entry of
    /// that term (or after the follower's run start, if lower). Otherwise the
    /// follower's whole run of `conflict_term` is foreign and is skipped by
    /// resuming at `conflict_index`. The result always moves strictly back
    /// and stays within `[matchIndex + 1, lastLogIndex + 1]`.
    pub(crate) fn record_replication_failure(
        &mut self,
        peer: u32,
        prev_log_index: u64,
        conflict_term: u64,
        conflict_index: u64,
    ) -> bool {
        if self.is_stale_reply(peer, prev_log_index) {
            return false;
        }

        let candidate = match self.last_index_of_term(conflict_term) {
            Some(index) => cmp::min(index, conflict_index) + 1,
            None => conflict_index,
        };
        let lower = self.match_index(peer) + 1;
        let upper = self.last_log_index() + 1;
        let next = cmp::min(candidate, prev_log_index).clamp(lower, upper);

        debug!(
            "[Node {}] log rejected by {} (conflict_term={}, conflict_index={}), retry at next_index {}",
            self.node_id, peer, conflict_term, conflict_index, next
        );
        self.next_index.insert(peer, next);
        true
    }

    /// Commit advancement: the highest `N` replicated on a majority whose
    /// entry was written in `current_term` becomes the commit index.
    ///
    /// Returns whether the commit index moved.
    pub(crate) fn try_commit(
        &mut self,
        current_term: u64,
    ) -> bool {
        let old = self.commit_index;
        let cluster_size = self.peers.len() + 1;

        for n in (old + 1)..=self.last_log_index() {
            if self.term_at(n) != current_term {
                continue;
            }
            let agree = 1 + self.match_index.values().filter(|m| **m >= n).count();
            if is_majority(agree, cluster_size) {
                self.commit_index = n;
            }
        }

        if self.commit_index > old {
            debug!(
                "[Node {}] leader commit_index {} -> {}",
                self.node_id, old, self.commit_index
            );
            return true;
        }
        false
    }

    /// Newly committed entries not yet handed to the application, in index
    /// order. `lastApplied` catches up with the commit index.
    pub(crate) fn take_committed(&mut self) -> Vec<CommittedEntry> {
        let from = self.last_applied + 1;
        let to = self.commit_index;
        if from > to {
            return Vec::new();
        }

        let committed = (from..=to)
            .map(|index| {
                let entry = self.entry_at(index);
                CommittedEntry {
                    index,
                    term: entry.term,
                    command: entry.command.clone(),
                }
            })
            .collect();
        self.last_applied = to;
        committed
    }
}
