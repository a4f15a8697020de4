#![no_main]

use interlink_proto::{FungibleTokenPacketData, PacketData};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(transfer) = FungibleTokenPacketData::decode(data) else {
        return;
    };

    // Decoded payloads are validated, never trusted
    let _ = transfer.validate_basic();
    let _ = transfer.to_bytes();
});
