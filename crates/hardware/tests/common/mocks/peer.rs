use std::collections::VecDeque;

use spmsim_core::common::{Packet, Tick};
use spmsim_core::sim::{PortId, Scheduler};
use spmsim_core::soc::traits::{Delivery, ResponsePeer};
use spmsim_core::{Result, SimError};

/// Accepts or refuses each offered response according to a script; once the script runs
/// out every response is accepted.
#[derive(Debug, Default)]
pub struct ScriptedPeer {
    script: VecDeque<bool>,
    /// `(packet id, tick)` of every accepted response, in acceptance order.
    pub delivered: Vec<(u64, Tick)>,
    /// Payloads of accepted responses, in acceptance order.
    pub payloads: Vec<Vec<u8>>,
    /// Ticks at which a response was refused.
    pub refused_at: Vec<Tick>,
    /// Sender port of the last offer.
    pub last_from: Option<PortId>,
}

impl ScriptedPeer {
    pub fn accepting() -> Self {
        Self::default()
    }

    /// `true` accepts, `false` refuses.
    pub fn with_script(script: impl IntoIterator<Item = bool>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn delivered_ids(&self) -> Vec<u64> {
        self.delivered.iter().map(|(id, _)| *id).collect()
    }
}

impl ResponsePeer for ScriptedPeer {
    fn recv_response(
        &mut self,
        from: PortId,
        pkt: Packet,
        sched: &mut dyn Scheduler,
    ) -> Result<Delivery> {
        self.last_from = Some(from);
        if self.script.pop_front().unwrap_or(true) {
            self.delivered.push((pkt.id(), sched.now()));
            self.payloads.push(pkt.into_data());
            Ok(Delivery::Accepted)
        } else {
            self.refused_at.push(sched.now());
            Ok(Delivery::Refused(pkt))
        }
    }
}

/// Fails every offer as an unexpected response.
#[derive(Debug, Default)]
pub struct FailingPeer;

impl ResponsePeer for FailingPeer {
    fn recv_response(
        &mut self,
        _from: PortId,
        pkt: Packet,
        _sched: &mut dyn Scheduler,
    ) -> Result<Delivery> {
        Err(SimError::UnexpectedResponse {
            id: pkt.id(),
            tag: pkt.tag(),
        })
    }
}
