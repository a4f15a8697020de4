//! Identifier parsing must never panic, and whatever parses must survive a
//! trip through its string form.

#![no_main]

use interlink_proto::{ChannelId, ClientId, ConnectionId, PortId};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(id) = s.parse::<PortId>() {
        assert_eq!(id.as_str(), s);
    }
    if let Ok(id) = s.parse::<ChannelId>() {
        assert_eq!(id.as_str(), s);
    }
    let _ = s.parse::<ConnectionId>();
    let _ = s.parse::<ClientId>();
});
