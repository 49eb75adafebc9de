use std::collections::VecDeque;

use mockall::mock;
use spmsim_core::Result;
use spmsim_core::common::{Packet, Tick};
use spmsim_core::soc::traits::StorageBackend;

mock! {
    pub Storage {}
    impl StorageBackend for Storage {
        fn service_access(&mut self, pkt: &mut Packet) -> Result<Tick>;
    }
}

/// Turns every request into a response and reports latencies from a script, falling
/// back to `default_latency` once the script is exhausted.
#[derive(Debug)]
pub struct ScriptedStorage {
    latencies: VecDeque<Tick>,
    default_latency: Tick,
    /// Addresses serviced, in order.
    pub serviced: Vec<u64>,
}

impl ScriptedStorage {
    pub fn fixed(latency: Tick) -> Self {
        Self::with_latencies(latency, std::iter::empty())
    }

    pub fn with_latencies(
        default_latency: Tick,
        latencies: impl IntoIterator<Item = Tick>,
    ) -> Self {
        Self {
            latencies: latencies.into_iter().collect(),
            default_latency,
            serviced: Vec::new(),
        }
    }
}

impl StorageBackend for ScriptedStorage {
    fn service_access(&mut self, pkt: &mut Packet) -> Result<Tick> {
        self.serviced.push(pkt.addr());
        if pkt.needs_response() {
            pkt.make_response()?;
        }
        Ok(self.latencies.pop_front().unwrap_or(self.default_latency))
    }
}
