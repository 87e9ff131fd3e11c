//! Shared test utilities for loopback channel tests.

#![allow(dead_code)]

use loop_serial::LoopbackChannel;
use std::sync::Arc;
use std::time::Duration;

/// An open channel at `loop://` with no close pause.
pub fn open_channel() -> LoopbackChannel {
    open_channel_with(|builder| builder)
}

/// An open channel built from a customized builder. The close pause is zeroed
/// first so tests do not sleep, but `configure` may set it again.
pub fn open_channel_with(
    configure: impl FnOnce(loop_serial::LoopbackChannelBuilder) -> loop_serial::LoopbackChannelBuilder,
) -> LoopbackChannel {
    let builder = LoopbackChannel::builder()
        .port("loop://")
        .close_settle(Duration::ZERO);
    let channel = configure(builder).build();
    channel
        .open()
        .expect("loop:// should always open with valid settings");
    channel
}

/// Shared variant for tests that hand the channel to a second thread.
pub fn shared_channel() -> Arc<LoopbackChannel> {
    Arc::new(open_channel())
}
