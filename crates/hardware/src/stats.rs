//! Simulation statistics collection and reporting.
//!
//! This module tracks what the DMA engine and its targets did during a run. It provides:
//! 1. **Summary:** Simulated ticks, host time, and transfers completed.
//! 2. **Engine:** Transfer starts, rejections, bytes moved, chunk and MMIO counts.
//! 3. **Ports:** Per-target response-queue counters (delivered, refused, peak depth).

use std::time::Instant;

use crate::soc::memory::response_queue::QueueStats;

/// Response-port counters tagged with the owning target's name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortStats {
    /// Target name.
    pub name: String,
    /// Queue counters.
    pub queue: QueueStats,
}

/// Statistics for one simulated system.
#[derive(Clone, Debug)]
pub struct DmaStats {
    start_time: Instant,
    /// Simulated ticks elapsed.
    pub ticks: u64,

    /// Start triggers that began a transfer.
    pub transfers_started: u64,
    /// Transfers whose write phase finished.
    pub transfers_completed: u64,
    /// Start triggers dropped because a transfer was in flight.
    pub transfers_rejected: u64,
    /// Bytes copied by completed transfers.
    pub bytes_transferred: u64,
    /// Sum of start-to-complete ticks over completed transfers.
    pub transfer_ticks: u64,

    /// Read chunks issued.
    pub read_chunks: u64,
    /// Write chunks issued.
    pub write_chunks: u64,
    /// Responses the engine accepted.
    pub responses_accepted: u64,
    /// Responses the engine refused while its receive path was busy.
    pub responses_refused: u64,
    /// Ready notifications sent to refused targets.
    pub retries_sent: u64,

    /// MMIO register reads.
    pub mmio_reads: u64,
    /// MMIO register writes.
    pub mmio_writes: u64,

    /// Per-target response port counters, filled in when a snapshot is taken.
    pub ports: Vec<PortStats>,
}

impl Default for DmaStats {
    /// Returns the default value.
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            ticks: 0,
            transfers_started: 0,
            transfers_completed: 0,
            transfers_rejected: 0,
            bytes_transferred: 0,
            transfer_ticks: 0,
            read_chunks: 0,
            write_chunks: 0,
            responses_accepted: 0,
            responses_refused: 0,
            retries_sent: 0,
            mmio_reads: 0,
            mmio_writes: 0,
            ports: Vec::new(),
        }
    }
}

/// Section names for selective stats output.
///
/// Valid section identifiers: `"summary"`, `"engine"`, `"ports"`.
/// Pass an empty slice to `print_sections` to print all sections.
pub const STATS_SECTIONS: &[&str] = &["summary", "engine", "ports"];

impl DmaStats {
    /// Average ticks per completed transfer, or zero if none completed.
    pub fn avg_transfer_ticks(&self) -> f64 {
        if self.transfers_completed == 0 {
            0.0
        } else {
            self.transfer_ticks as f64 / self.transfers_completed as f64
        }
    }

    /// Prints only the requested statistics sections to stdout.
    ///
    /// # Arguments
    ///
    /// * `sections` - Slice of section names to print, or empty for all.
    pub fn print_sections(&self, sections: &[String]) {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let seconds = self.start_time.elapsed().as_secs_f64();

        if want("summary") {
            println!("\n==========================================================");
            println!("SCRATCHPAD DMA SIMULATION STATISTICS");
            println!("==========================================================");
            println!("host_seconds             {seconds:.4} s");
            println!("sim_ticks                {}", self.ticks);
            println!("transfers_completed      {}", self.transfers_completed);
            println!("bytes_transferred        {}", self.bytes_transferred);
            println!("----------------------------------------------------------");
        }

        if want("engine") {
            println!("IDMA ENGINE");
            println!("  idma.started           {}", self.transfers_started);
            println!("  idma.rejected          {}", self.transfers_rejected);
            println!("  idma.avg_latency       {:.2} ticks", self.avg_transfer_ticks());
            println!("  idma.read_chunks       {}", self.read_chunks);
            println!("  idma.write_chunks      {}", self.write_chunks);
            println!("  idma.resp_accepted     {}", self.responses_accepted);
            println!("  idma.resp_refused      {}", self.responses_refused);
            println!("  idma.retries_sent      {}", self.retries_sent);
            println!("  idma.mmio_reads        {}", self.mmio_reads);
            println!("  idma.mmio_writes       {}", self.mmio_writes);
            println!("----------------------------------------------------------");
        }

        if want("ports") && !self.ports.is_empty() {
            println!("RESPONSE PORTS");
            for p in &self.ports {
                println!(
                    "  {:<8} requests={:<8} delivered={:<8} refused={:<6} max_depth={}",
                    p.name, p.queue.submitted, p.queue.delivered, p.queue.refused, p.queue.max_depth
                );
            }
        }
        println!("==========================================================");
    }

    /// Prints all statistics sections to stdout.
    ///
    /// Equivalent to `print_sections(&[])`.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}
