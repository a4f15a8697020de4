//! Oracle helpers for scenario verification.
//!
//! Common checks on the final [`World`]. Compose them with [`all_of`].

use interlink_proto::Order;

use crate::scenario::{OracleFn, StepKind, World};

/// Every sent packet has been cleaned up on the source.
pub fn no_packets_in_flight() -> OracleFn {
    Box::new(|world: &World| {
        let in_flight = world.observable_state().in_flight;
        if in_flight.is_empty() {
            Ok(())
        } else {
            Err(format!("packets still in flight: {in_flight:?}"))
        }
    })
}

/// `count` packets are still committed on the source.
pub fn packets_in_flight(count: usize) -> OracleFn {
    Box::new(move |world: &World| {
        let in_flight = world.observable_state().in_flight;
        if in_flight.len() == count {
            Ok(())
        } else {
            Err(format!("expected {count} packets in flight, found {in_flight:?}"))
        }
    })
}

/// Counters agree with the recorded steps.
///
/// The source's next-send is one past the number of successful sends. On an
/// ordered channel the destination's next-receive is one past the number of
/// deliveries; on an unordered channel it never moves.
pub fn sequences_consistent() -> OracleFn {
    Box::new(|world: &World| {
        let state = world.observable_state();
        let sent = world.successes(&StepKind::Send) as u64;
        let delivered = world.successes(&StepKind::Deliver) as u64;

        if state.next_send != sent + 1 {
            return Err(format!("next send {} after {sent} sends", state.next_send));
        }
        let expected_recv = match world.ordering() {
            Order::Ordered => delivered + 1,
            _ => 1,
        };
        if state.next_recv != expected_recv {
            return Err(format!(
                "next receive {} after {delivered} deliveries, expected {expected_recv}",
                state.next_recv
            ));
        }
        Ok(())
    })
}

/// Every delivered packet has an acknowledgement commitment.
pub fn acknowledgements_recorded() -> OracleFn {
    Box::new(|world: &World| {
        let delivered = world.successes(&StepKind::Deliver);
        let recorded = world.observable_state().acknowledgements;
        if recorded == delivered && world.acknowledgements_recorded() {
            Ok(())
        } else {
            Err(format!("{recorded} acknowledgements for {delivered} deliveries"))
        }
    })
}

/// Exactly `count` deliveries failed.
pub fn failed_deliveries(count: usize) -> OracleFn {
    Box::new(move |world: &World| {
        let failed = world.failures(&StepKind::Deliver);
        if failed == count {
            Ok(())
        } else {
            Err(format!("expected {count} failed deliveries, got {failed}"))
        }
    })
}

/// Combine multiple oracles; all must pass.
pub fn all_of(oracles: Vec<OracleFn>) -> OracleFn {
    Box::new(move |world: &World| {
        for oracle in &oracles {
            oracle(world)?;
        }
        Ok(())
    })
}
