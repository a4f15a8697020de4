//! Scenario builder API.
//!
//! Provides a declarative API for constructing scenario tests that enforce
//! the Oracle Pattern.

use bytes::Bytes;
use interlink_proto::{Coin, FungibleTokenPacketData, Height, Order};

use crate::scenario::{OracleFn, World};

/// Order in which the relayer delivers pending packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Oldest packet first
    Sequential,
    /// Newest packet first
    Reverse,
}

#[derive(Debug, Clone)]
enum Payload {
    Opaque(Bytes),
    Transfer { denom: String, amount: u64 },
}

/// Scenario builder.
///
/// Describe the run, then call `.oracle()` to get a [`RunnableScenario`].
pub struct Scenario {
    name: String,
    ordering: Order,
    ttl: u64,
    payloads: Vec<Payload>,
    blocks_before_delivery: u64,
    delivery: Delivery,
    acknowledge: bool,
}

impl Scenario {
    /// Create a scenario over an unordered channel.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ordering: Order::Unordered,
            ttl: 100,
            payloads: Vec::new(),
            blocks_before_delivery: 0,
            delivery: Delivery::Sequential,
            acknowledge: true,
        }
    }

    /// Channel ordering.
    pub fn ordering(mut self, ordering: Order) -> Self {
        self.ordering = ordering;
        self
    }

    /// Blocks until timeout for packets sent after this call.
    pub fn timeout_after(mut self, blocks: u64) -> Self {
        self.ttl = blocks;
        self
    }

    /// Queue an opaque packet.
    pub fn packet(mut self, data: impl Into<Bytes>) -> Self {
        self.payloads.push(Payload::Opaque(data.into()));
        self
    }

    /// Queue `count` opaque packets with distinct payloads.
    pub fn packets(mut self, count: u64) -> Self {
        for n in 0..count {
            self.payloads.push(Payload::Opaque(Bytes::from(format!("packet-{n}"))));
        }
        self
    }

    /// Queue a token transfer packet.
    pub fn transfer(mut self, denom: impl Into<String>, amount: u64) -> Self {
        self.payloads.push(Payload::Transfer { denom: denom.into(), amount });
        self
    }

    /// Blocks the destination produces before the relayer starts.
    pub fn advance_before_delivery(mut self, blocks: u64) -> Self {
        self.blocks_before_delivery = blocks;
        self
    }

    /// Delivery order.
    pub fn delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = delivery;
        self
    }

    /// Stop after delivery; acknowledgements are never relayed back.
    pub fn skip_acknowledgements(mut self) -> Self {
        self.acknowledge = false;
        self
    }

    /// Set the oracle function and return a runnable scenario.
    ///
    /// The oracle is mandatory - you cannot run a scenario without
    /// verification.
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }
}

/// A scenario with an oracle function that can be executed.
pub struct RunnableScenario {
    scenario: Scenario,
    oracle: OracleFn,
}

impl RunnableScenario {
    /// Execute the scenario.
    ///
    /// 1. Open the channel on both ledgers
    /// 2. Send every queued packet on the source
    /// 3. Advance the destination
    /// 4. Attempt one delivery per pending packet in the chosen order
    /// 5. Relay back every acknowledgement, unless skipped
    ///
    /// Failed relay steps are recorded in the world rather than aborting
    /// the run; only send failures and the oracle fail the scenario.
    pub fn run(self) -> Result<World, String> {
        let scenario = self.scenario;
        let mut world = World::new(scenario.ordering)?;

        for payload in scenario.payloads {
            let sent = match payload {
                Payload::Opaque(data) => world.send_opaque(data, scenario.ttl),
                Payload::Transfer { denom, amount } => {
                    let client_height = world.source().handler().keeper().client_height();
                    let timeout = Height::new(client_height.value().saturating_add(scenario.ttl));
                    world.send(FungibleTokenPacketData::new(
                        vec![Coin::new(denom, amount)],
                        "sender",
                        "receiver",
                        true,
                        timeout,
                    ))
                },
            };
            sent.map_err(|e| format!("Scenario '{}': send failed: {e}", scenario.name))?;
        }

        world.destination_mut().advance(scenario.blocks_before_delivery);

        // Failed deliveries stay pending, so skip past them
        let attempts = world.relayer().pending().len();
        let mut skipped = 0;
        for _ in 0..attempts {
            let index = match scenario.delivery {
                Delivery::Sequential => skipped,
                Delivery::Reverse => world.relayer().pending().len().saturating_sub(1 + skipped),
            };
            if world.deliver(index).is_err() {
                skipped += 1;
            }
        }

        if scenario.acknowledge {
            while !world.relayer().delivered().is_empty() {
                world
                    .acknowledge(0)
                    .map_err(|e| format!("Scenario '{}': acknowledge failed: {e}", scenario.name))?;
            }
        }

        (self.oracle)(&world).map_err(|e| format!("Scenario '{}': {e}", scenario.name))?;

        Ok(world)
    }
}
