//! Live validator activity for the statusline
//!
//! One file per process-group key. Running entries flip to completed in
//! place; completed entries fade out after a short window.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::store::{EntryList, SessionKey, SessionScopedStore, StateContext, StoreLimits, Timestamped};

pub(crate) const STATUSLINE_FILE_PREFIX: &str = "statusline-";
pub(crate) const STATUS_FADE: Duration = Duration::from_secs(5);
const STATUS_CAPACITY: usize = 20;
/// Running entries older than this are assumed orphaned
const STATUS_RUNNING_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum EntryStatus {
    #[default]
    Running,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StatusLineEntry {
    pub(crate) agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) decision: Option<String>,
    pub(crate) tool_name: String,
    pub(crate) timestamp: i64,
    pub(crate) start_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) execution_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) latency_ms: Option<i64>,
    pub(crate) status: EntryStatus,
}

impl Timestamped for StatusLineEntry {
    fn timestamp_ms(&self) -> i64 {
        self.timestamp
    }
}

impl StatusLineEntry {
    fn is_same_task(&self, agent: &str, tool_name: &str) -> bool {
        self.agent == agent && self.tool_name == tool_name
    }
}

/// How completed entries get removed once their fade window passes
#[derive(Debug, Clone)]
pub(crate) enum ExpiryScheduler {
    /// Spawn a detached `statusline-expire` run of this executable
    Detached { program: PathBuf },
    /// Rely on read-time filtering only
    Disabled,
}

impl ExpiryScheduler {
    pub(crate) fn current_exe() -> Self {
        match std::env::current_exe() {
            Ok(program) => ExpiryScheduler::Detached { program },
            Err(err) => {
                tracing::debug!(error = %err, "no executable path; statusline expiry disabled");
                ExpiryScheduler::Disabled
            }
        }
    }

    fn schedule(&self, ctx: &StateContext, key: &SessionKey, entry: &StatusLineEntry, delay: Duration) {
        let ExpiryScheduler::Detached { program } = self else {
            return;
        };
        let spawned = Command::new(program)
            .arg("--state-dir")
            .arg(ctx.state_dir())
            .args(["statusline-expire", "--key", key.as_str()])
            .args(["--agent", &entry.agent, "--tool", &entry.tool_name])
            .args(["--timestamp", &entry.timestamp.to_string()])
            .args(["--delay-ms", &delay.as_millis().to_string()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        if let Err(err) = spawned {
            tracing::debug!(error = %err, "failed to schedule statusline expiry");
        }
    }
}

pub(crate) struct StatusLineState<'a> {
    ctx: &'a StateContext,
    key: SessionKey,
    store: SessionScopedStore<EntryList<StatusLineEntry>>,
    fade: Duration,
    expiry: ExpiryScheduler,
}

impl<'a> StatusLineState<'a> {
    pub(crate) fn new(ctx: &'a StateContext, key: SessionKey, expiry: ExpiryScheduler) -> Self {
        let file_name = format!("{STATUSLINE_FILE_PREFIX}{}.json", key.digest());
        let store = ctx.store_for(
            &file_name,
            StoreLimits::new(STATUS_RUNNING_TTL, STATUS_CAPACITY),
            Some(&key),
        );
        Self {
            ctx,
            key,
            store,
            fade: STATUS_FADE,
            expiry,
        }
    }

    fn is_faded(&self, entry: &StatusLineEntry, now: i64) -> bool {
        entry.status == EntryStatus::Completed
            && now - entry.timestamp >= self.fade.as_millis() as i64
    }

    /// Drop faded completions, then append a running entry
    pub(crate) fn mark_agent_started(
        &self,
        agent: &str,
        tool_name: &str,
        execution_type: Option<&str>,
    ) -> StatusLineEntry {
        let now = self.store.now_ms();
        let entry = StatusLineEntry {
            agent: agent.to_string(),
            decision: None,
            tool_name: tool_name.to_string(),
            timestamp: now,
            start_time: now,
            execution_type: execution_type.map(str::to_string),
            latency_ms: None,
            status: EntryStatus::Running,
        };
        self.store.update(|mut doc| {
            doc.entries.retain(|e| !self.is_faded(e, now));
            doc.entries.push(entry.clone());
            doc
        });
        entry
    }

    /// Complete the newest running entry for `(agent, tool_name)` in place,
    /// or append a completed entry when none is running.
    pub(crate) fn update_status_line_state(
        &self,
        agent: &str,
        tool_name: &str,
        decision: Option<&str>,
    ) -> StatusLineEntry {
        let now = self.store.now_ms();
        let mut completed = StatusLineEntry {
            agent: agent.to_string(),
            decision: decision.map(str::to_string),
            tool_name: tool_name.to_string(),
            timestamp: now,
            start_time: now,
            execution_type: None,
            latency_ms: None,
            status: EntryStatus::Completed,
        };

        self.store.update(|mut doc| {
            let running = doc
                .entries
                .iter()
                .rposition(|e| e.status == EntryStatus::Running && e.is_same_task(agent, tool_name));
            match running {
                Some(index) => {
                    let previous = &doc.entries[index];
                    completed.start_time = previous.start_time;
                    completed.execution_type = previous.execution_type.clone();
                    completed.latency_ms = Some(now - previous.start_time);
                    doc.entries[index] = completed.clone();
                }
                None => doc.entries.push(completed.clone()),
            }
            doc
        });

        self.expiry.schedule(self.ctx, &self.key, &completed, self.fade);
        completed
    }

    /// Delete one completed entry; used by the scheduled expiry
    pub(crate) fn remove_entry(&self, agent: &str, tool_name: &str, timestamp: i64) {
        let is_target = |e: &StatusLineEntry| {
            e.status == EntryStatus::Completed
                && e.timestamp == timestamp
                && e.is_same_task(agent, tool_name)
        };
        // Files cleared in the meantime stay gone.
        if !self.store.load().entries.iter().any(is_target) {
            return;
        }
        self.store.update(|mut doc| {
            doc.entries.retain(|e| !is_target(e));
            doc
        });
    }

    /// Visible entries, newest first
    pub(crate) fn entries(&self) -> Vec<StatusLineEntry> {
        let now = self.store.now_ms();
        let mut entries: Vec<_> = self
            .store
            .load()
            .entries
            .into_iter()
            .filter(|e| !self.is_faded(e, now))
            .collect();
        entries.reverse();
        entries
    }
}
