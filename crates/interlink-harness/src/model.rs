//! Reference model for model-based testing.
//!
//! [`ModelWorld`] is the simplest possible description of one channel seen
//! from both ends: a few counters and two queues. It knows nothing about
//! commitments, proofs or stores. The real two-ledger world must produce the
//! same result for every [`Operation`], and its observable state must match
//! [`ModelWorld::observable_state`] after every step.

use arbitrary::Arbitrary;
use interlink_proto::Order;

/// Operations applied to both the model and the real world.
#[derive(Debug, Clone, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// Send a packet of `len` bytes that times out `ttl` blocks after the
    /// source's latest view of the destination
    Send {
        /// Blocks until timeout
        ttl: u8,
        /// Payload length
        len: u8,
    },
    /// Relay the pending packet at `index` (modulo queue length)
    Deliver {
        /// Queue position
        index: u8,
    },
    /// Relay back the acknowledgement at `index` (modulo queue length)
    Acknowledge {
        /// Queue position
        index: u8,
    },
    /// Produce empty blocks on the destination
    AdvanceDestination {
        /// Number of blocks
        blocks: u8,
    },
}

/// Result of applying an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    /// Operation succeeded
    Ok,
    /// Operation failed
    Error(OperationError),
}

impl OperationResult {
    /// True on success.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// True on failure.
    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }
}

/// Failure classes both worlds agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    /// Queue for the step is empty
    NothingToRelay,
    /// Packet failed structural validation
    InvalidPacket,
    /// Packet timeout already reached
    Timeout,
    /// Ordered channel received a packet out of sequence
    OutOfOrder,
    /// Anything the model does not predict
    Unexpected,
}

/// A packet as the model tracks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelPacket {
    /// Sequence number
    pub sequence: u64,
    /// Destination height at which the packet times out
    pub timeout: u64,
}

/// Observable state compared against the real world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Source next-send counter
    pub next_send: u64,
    /// Destination next-receive counter
    pub next_recv: u64,
    /// Sequences with a commitment on the source, ascending
    pub in_flight: Vec<u64>,
    /// Acknowledgement commitments on the destination
    pub acknowledgements: usize,
    /// Destination height
    pub destination_height: u64,
}

/// Reference model of one channel.
#[derive(Debug, Clone)]
pub struct ModelWorld {
    ordering: Order,
    next_send: u64,
    next_recv: u64,
    client_height: u64,
    destination_height: u64,
    pending: Vec<ModelPacket>,
    delivered: Vec<ModelPacket>,
    in_flight: Vec<u64>,
    acknowledgements: usize,
}

impl ModelWorld {
    /// Freshly opened channel with both ledgers at height 1.
    pub fn new(ordering: Order) -> Self {
        Self {
            ordering,
            next_send: 1,
            next_recv: 1,
            client_height: 0,
            destination_height: 1,
            pending: Vec::new(),
            delivered: Vec::new(),
            in_flight: Vec::new(),
            acknowledgements: 0,
        }
    }

    /// Apply an operation and return the predicted result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match *op {
            Operation::Send { ttl, len } => self.send(ttl, len),
            Operation::Deliver { index } => self.deliver(index),
            Operation::Acknowledge { index } => self.acknowledge(index),
            Operation::AdvanceDestination { blocks } => {
                self.destination_height += u64::from(blocks);
                OperationResult::Ok
            },
        }
    }

    fn send(&mut self, ttl: u8, len: u8) -> OperationResult {
        let timeout = self.client_height + u64::from(ttl);
        if len == 0 || timeout == 0 {
            return OperationResult::Error(OperationError::InvalidPacket);
        }
        if self.client_height >= timeout {
            return OperationResult::Error(OperationError::Timeout);
        }

        let sequence = self.next_send;
        self.next_send += 1;
        self.pending.push(ModelPacket { sequence, timeout });
        self.in_flight.push(sequence);
        OperationResult::Ok
    }

    fn deliver(&mut self, index: u8) -> OperationResult {
        if self.pending.is_empty() {
            return OperationResult::Error(OperationError::NothingToRelay);
        }
        let index = usize::from(index) % self.pending.len();
        let packet = self.pending[index];

        if self.destination_height >= packet.timeout {
            return OperationResult::Error(OperationError::Timeout);
        }
        if self.ordering == Order::Ordered {
            if packet.sequence != self.next_recv {
                return OperationResult::Error(OperationError::OutOfOrder);
            }
            self.next_recv += 1;
        }

        self.pending.remove(index);
        self.delivered.push(packet);
        self.acknowledgements += 1;
        OperationResult::Ok
    }

    fn acknowledge(&mut self, index: u8) -> OperationResult {
        if self.delivered.is_empty() {
            return OperationResult::Error(OperationError::NothingToRelay);
        }
        let index = usize::from(index) % self.delivered.len();
        let packet = self.delivered.remove(index);

        self.in_flight.retain(|sequence| *sequence != packet.sequence);
        self.client_height = self.client_height.max(self.destination_height);
        OperationResult::Ok
    }

    /// Packets waiting for delivery.
    pub fn pending(&self) -> &[ModelPacket] {
        &self.pending
    }

    /// Packets waiting for their acknowledgement to be relayed.
    pub fn delivered(&self) -> &[ModelPacket] {
        &self.delivered
    }

    /// State the real world must reproduce.
    pub fn observable_state(&self) -> ObservableState {
        let mut in_flight = self.in_flight.clone();
        in_flight.sort_unstable();
        ObservableState {
            next_send: self.next_send,
            next_recv: self.next_recv,
            in_flight,
            acknowledgements: self.acknowledgements,
            destination_height: self.destination_height,
        }
    }
}
