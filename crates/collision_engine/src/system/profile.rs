//! Worker profiling data
//!
//! Timings and counters accumulated by the worker thread since start-up or
//! the last `ResetProfileData` command.

use std::fmt;

use crate::foundation::time::PhaseTiming;

/// Timings and counters for the worker loop
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProfileData {
    /// Applying queued commands
    pub commands: PhaseTiming,
    /// Broad and narrow phase over moved shapes
    pub collision_pass: PhaseTiming,
    /// Answering queued queries
    pub queries: PhaseTiming,
    /// Whole ticks
    pub ticks: PhaseTiming,
    /// Commands applied
    pub commands_applied: u64,
    /// Queries answered
    pub queries_answered: u64,
    /// Narrow phase tests actually computed
    pub pairs_tested: u64,
    /// Narrow phase results served from the pair cache
    pub pair_cache_hits: u64,
    /// Leaves that outgrew their fat box and were reinserted
    pub bvh_reinserts: u64,
    /// Completed results discarded because nobody claimed them
    pub results_reclaimed: u64,
}

impl ProfileData {
    /// Zero everything
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for ProfileData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Collision worker profile ({} ticks)", self.ticks.samples)?;
        for (name, timing) in [
            ("tick", &self.ticks),
            ("commands", &self.commands),
            ("collision pass", &self.collision_pass),
            ("queries", &self.queries),
        ] {
            writeln!(
                f,
                "  {name:<15} avg {:8.3} ms  max {:8.3} ms",
                timing.average_millis(),
                timing.max_millis()
            )?;
        }
        writeln!(f, "  commands applied   {}", self.commands_applied)?;
        writeln!(f, "  queries answered   {}", self.queries_answered)?;
        writeln!(f, "  pairs tested       {}", self.pairs_tested)?;
        writeln!(f, "  pair cache hits    {}", self.pair_cache_hits)?;
        writeln!(f, "  bvh reinserts      {}", self.bvh_reinserts)?;
        write!(f, "  results reclaimed  {}", self.results_reclaimed)
    }
}
