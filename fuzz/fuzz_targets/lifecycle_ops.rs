//! Random relay schedules against both the reference model and two real
//! ledgers. Any divergence, or any error the model does not predict, is a
//! crash.

#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use interlink_harness::{ModelWorld, Operation, OperationError, OperationResult, scenario::World};
use interlink_proto::Order;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let ordering = if bool::arbitrary(&mut u).unwrap_or(false) {
        Order::Ordered
    } else {
        Order::Unordered
    };
    let Ok(ops) = Vec::<Operation>::arbitrary(&mut u) else {
        return;
    };

    let mut model = ModelWorld::new(ordering);
    let Ok(mut world) = World::new(ordering) else {
        return;
    };

    for op in ops.iter().take(256) {
        let expected = model.apply(op);
        let actual = world.apply(op);

        assert_ne!(actual, OperationResult::Error(OperationError::Unexpected), "{op:?}");
        assert_eq!(expected, actual, "{op:?}");
        assert_eq!(model.observable_state(), world.observable_state(), "after {op:?}");
    }
});
