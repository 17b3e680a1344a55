//! One refresh cycle: rows in, sorted active buffer out.

use std::time::Instant;
use tracing::{debug, trace, warn};

use crate::config::EngineConfig;
use crate::delta::{cpu_fraction, CycleClock};
use crate::error::EngineResult;
use crate::format::{Layout, RowCursor};
use crate::host::{HostSource, HostStatics, ProcFs};
use crate::order::{self as ordering, ORDERS};
use crate::procfs::{sanitize, FieldReader, ReadOutcome};
use crate::source::{DataSource, ReplicationRow, RowSet, SessionRow};
use crate::store::ProcessStore;
use crate::system::SystemSampler;
use crate::types::{
    BackendState, CycleSummary, FullCmd, Mode, ProcessRecord, ProcessSelection, Rates,
    Replication, StateHistogram, SystemSample,
};

/// Owns all cross-cycle state: the record store, the last system sample and
/// the clock. Drive it with `refresh` once per display interval.
pub struct Monitor {
    host: Box<dyn HostSource + Send>,
    statics: HostStatics,
    config: EngineConfig,
    clock: CycleClock,
    sampler: SystemSampler,
    reader: FieldReader,
    store: ProcessStore,
    active: Vec<ProcessRecord>,
    histogram: StateHistogram,
    cycle: u64,
}

impl Monitor {
    /// Monitor over the procfs tree named in `config`.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let host = ProcFs::new(config.procfs_root.clone());
        Self::with_host(Box::new(host), config)
    }

    pub fn with_host(host: Box<dyn HostSource + Send>, config: EngineConfig) -> EngineResult<Self> {
        let statics = HostStatics::probe(host.as_ref(), &config)?;
        Ok(Self {
            clock: CycleClock::new(config.min_interval_secs()),
            sampler: SystemSampler::new(&statics),
            reader: FieldReader::new(&statics),
            store: ProcessStore::new(),
            active: Vec::new(),
            histogram: StateHistogram::default(),
            cycle: 0,
            host,
            statics,
            config,
        })
    }

    pub fn refresh(
        &mut self,
        source: &mut dyn DataSource,
        selection: &ProcessSelection,
        mode: Mode,
        order: Option<usize>,
    ) -> EngineResult<CycleSummary> {
        self.refresh_at(Instant::now(), source, selection, mode, order)
    }

    /// `refresh` with the cycle timestamp supplied by the caller.
    pub fn refresh_at(
        &mut self,
        now: Instant,
        source: &mut dyn DataSource,
        selection: &ProcessSelection,
        mode: Mode,
        order: Option<usize>,
    ) -> EngineResult<CycleSummary> {
        self.cycle += 1;
        let elapsed = self.clock.tick(now);
        self.sampler.sample(self.host.as_ref(), elapsed);

        let rows = source.fetch(mode, selection).unwrap_or_else(|e| {
            warn!(error = %e, "data source failed; cycle has no rows");
            RowSet::empty(mode)
        });
        let total = rows.len();

        self.histogram.clear();
        self.active.clear();
        self.active.try_reserve(total)?;

        match rows {
            RowSet::Normal(rows) => {
                for row in &rows {
                    self.absorb_session(row, selection, now, elapsed)?;
                }
            }
            RowSet::Replication(rows) => {
                for row in &rows {
                    self.absorb_replication(row);
                }
            }
        }
        self.sampler.set_process_states(self.histogram);

        if let Some(idx) = order.filter(|i| *i < ORDERS.len()) {
            ordering::sort(&mut self.active, idx);
        }

        let evicted = if total > 0 {
            self.store.evict_unseen(self.cycle, self.config.evict_after)
        } else {
            0
        };

        let summary = CycleSummary {
            active: self.active.len(),
            total,
            tracked: self.store.len(),
            evicted,
            histogram: self.histogram,
        };
        debug!(
            cycle = self.cycle,
            active = summary.active,
            total = summary.total,
            tracked = summary.tracked,
            evicted = summary.evicted,
            "refresh complete"
        );
        Ok(summary)
    }

    fn absorb_session(
        &mut self,
        row: &SessionRow,
        selection: &ProcessSelection,
        now: Instant,
        elapsed: Option<f64>,
    ) -> EngineResult<()> {
        let remote = self.config.remote;
        let tps = self.statics.ticks_per_second;
        let floor = self.config.min_interval_secs();
        let (rec, _) = self.store.upsert(row.pid);
        rec.last_seen = self.cycle;
        rec.username = sanitize(&row.username);
        rec.pgstate = BackendState::parse(&row.state);
        rec.xact_secs = row.xact_secs;
        rec.query_secs = row.query_secs;
        rec.locks = row.locks;

        let outcome = if remote {
            ReadOutcome::Complete
        } else {
            self.reader.populate(self.host.as_ref(), rec, selection)?
        };
        if outcome != ReadOutcome::Complete {
            trace!(pid = row.pid, ?outcome, "process read incomplete");
        }
        if selection.full_cmd == FullCmd::QueryText || remote {
            if let Some(q) = &row.query {
                rec.name = sanitize(q);
            }
        }

        // A pid seen before is measured over its own gap; a new one over
        // this cycle's interval against the zero baseline.
        let elapsed = match rec.observed_at {
            Some(prev) => Some(now.saturating_duration_since(prev).as_secs_f64().max(floor)),
            None => elapsed,
        };
        // Carried counters still date from the earlier read.
        if outcome != ReadOutcome::Failed {
            rec.observed_at = Some(now);
        }

        let slot = rec.slot;
        let c = &rec.counters;
        rec.rates = Rates {
            cpu: cpu_fraction(c.cpu_ticks.delta(slot), elapsed, tps),
            iops: c.iops.rate(slot, elapsed),
            syscr: c.syscr.rate(slot, elapsed),
            syscw: c.syscw.rate(slot, elapsed),
            read_bytes: c.read_bytes.rate(slot, elapsed),
            write_bytes: c.write_bytes.rate(slot, elapsed),
        };
        self.histogram.tally(rec.pgstate);

        let hidden_idle = rec.pgstate == BackendState::Idle && !selection.show_idle;
        let other_user = !selection.username.is_empty() && rec.username != selection.username;
        let incomplete = outcome == ReadOutcome::Failed;

        rec.slot.flip();
        if !(hidden_idle || other_user || incomplete) {
            self.active.push(rec.clone());
        }
        Ok(())
    }

    fn absorb_replication(&mut self, row: &ReplicationRow) {
        let (rec, _) = self.store.upsert(row.pid);
        rec.last_seen = self.cycle;
        rec.username = sanitize(&row.username);
        rec.name = sanitize(&row.application_name);
        rec.replication = Replication {
            application_name: sanitize(&row.application_name),
            client_addr: sanitize(&row.client_addr),
            state: sanitize(&row.state),
            primary: row.primary.clone(),
            sent: row.sent.clone(),
            write: row.write.clone(),
            flush: row.flush.clone(),
            replay: row.replay.clone(),
            sent_lag: row.sent_lag,
            write_lag: row.write_lag,
            flush_lag: row.flush_lag,
            replay_lag: row.replay_lag,
        };
        rec.slot.flip();
        self.active.push(rec.clone());
    }

    /// Records selected by the last cycle, in display order.
    pub fn active(&self) -> &[ProcessRecord] {
        &self.active
    }

    pub fn system(&self) -> &SystemSample {
        self.sampler.current()
    }

    pub fn statics(&self) -> &HostStatics {
        &self.statics
    }

    pub fn store(&self) -> &ProcessStore {
        &self.store
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// A fresh row cursor over the active buffer.
    pub fn cursor(&self, layout: Layout) -> RowCursor<'_> {
        RowCursor::new(&self.active, layout)
    }
}
