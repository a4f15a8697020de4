//! Two-ledger relay simulation.
//!
//! Sends a number of packets over a simulated channel while a seeded random
//! schedule interleaves deliveries, acknowledgements and empty blocks. Every
//! step is applied to both the real ledgers and the reference model; the
//! run fails on the first divergence.
//!
//! ```bash
//! RUST_LOG=info cargo run -p interlink-harness --bin interlink-sim -- \
//!     --seed 7 --packets 50 --ordering ordered
//! ```

use std::process::ExitCode;

use arbitrary::{Arbitrary, Unstructured};
use clap::{Parser, ValueEnum};
use interlink_harness::{
    ModelWorld, Operation,
    scenario::{World, oracle},
};
use interlink_proto::Order;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Ordering {
    Ordered,
    Unordered,
}

impl From<Ordering> for Order {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Ordered => Self::Ordered,
            Ordering::Unordered => Self::Unordered,
        }
    }
}

/// Interlink relay simulation
#[derive(Parser, Debug)]
#[command(name = "interlink-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// RNG seed for the relay schedule
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Number of packets to send
    #[arg(long, default_value_t = 100)]
    packets: usize,

    /// Channel ordering
    #[arg(long, value_enum, default_value = "unordered")]
    ordering: Ordering,

    /// Upper bound on random steps between sends
    #[arg(long, default_value_t = 4)]
    max_interleave: u32,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer()).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(seed = args.seed, %err, "simulation failed");
            ExitCode::FAILURE
        },
    }
}

fn run(args: &Args) -> Result<(), String> {
    let ordering = Order::from(args.ordering);
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let mut model = ModelWorld::new(ordering);
    let mut world = World::new(ordering)?;

    info!(seed = args.seed, packets = args.packets, %ordering, "starting simulation");

    let mut step = 0usize;
    let mut sent = 0usize;
    while sent < args.packets {
        let ttl = 1 + (rng.next_u32() % 32) as u8;
        let len = 1 + (rng.next_u32() % 64) as u8;
        apply(&mut model, &mut world, &Operation::Send { ttl, len }, &mut step)?;
        sent += 1;

        for _ in 0..interleave(&mut rng, args.max_interleave) {
            let op = random_operation(&mut rng)?;
            apply(&mut model, &mut world, &op, &mut step)?;
        }
    }

    // Deliver what can still be delivered and carry every ack back
    world.drain();
    oracle::all_of(vec![oracle::sequences_consistent(), oracle::acknowledgements_recorded()])(
        &world,
    )?;

    let state = world.observable_state();
    info!(
        steps = step,
        next_send = state.next_send,
        next_recv = state.next_recv,
        in_flight = state.in_flight.len(),
        acknowledgements = state.acknowledgements,
        "simulation finished"
    );
    Ok(())
}

fn apply(
    model: &mut ModelWorld,
    world: &mut World,
    op: &Operation,
    step: &mut usize,
) -> Result<(), String> {
    *step += 1;
    let expected = model.apply(op);
    let actual = world.apply(op);
    if expected != actual {
        return Err(format!(
            "step {step}: {op:?} diverged (model {expected:?}, ledgers {actual:?})"
        ));
    }

    let (model_state, real_state) = (model.observable_state(), world.observable_state());
    if model_state != real_state {
        return Err(format!(
            "step {step}: state diverged after {op:?}\nmodel:   {model_state:?}\nledgers: {real_state:?}"
        ));
    }
    Ok(())
}

/// Random step count in `0..=max_interleave`.
fn interleave(rng: &mut ChaCha8Rng, max_interleave: u32) -> u32 {
    rng.next_u32() % max_interleave.saturating_add(1)
}

fn random_operation(rng: &mut ChaCha8Rng) -> Result<Operation, String> {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    let mut input = Unstructured::new(&bytes);
    match Operation::arbitrary(&mut input).map_err(|e| e.to_string())? {
        // Sends are driven by the outer loop
        Operation::Send { .. } => Ok(Operation::AdvanceDestination { blocks: bytes[0] % 4 }),
        op => Ok(op),
    }
}
