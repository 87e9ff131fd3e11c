//! Loopback channel: a serial port whose transmit side feeds its own
//! receive side.
//!
//! Bytes handed to [`LoopbackChannel::write`] land one by one in a bounded
//! FIFO and come back out of [`LoopbackChannel::read`]. The channel is meant
//! to be shared between one writer thread and one reader thread through an
//! `Arc`; every operation takes `&self`.
//!
//! # Example
//! ```
//! use loop_serial::LoopbackChannel;
//!
//! let channel = LoopbackChannel::open_url("loop://")?;
//! channel.write(b"hello")?;
//! assert_eq!(channel.in_waiting()?, 5);
//! assert_eq!(channel.read(5)?, b"hello");
//! # Ok::<(), loop_serial::PortError>(())
//! ```

use super::error::PortError;
use super::queue::{deadline_after, BoundedQueue, QueueItem};
use super::settings::{validate_baud_rate, DataBits, FlowControl, Parity, PortSettings, StopBits};
use crate::address::LoopAddress;
use crate::config::ChannelConfig;
use crate::diagnostics::{DiagnosticSink, LogLevel};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default number of bytes the channel can hold before writers block.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Pause taken by `close()` before returning.
pub const DEFAULT_CLOSE_SETTLE: Duration = Duration::from_millis(300);

/// Software loopback serial port.
pub struct LoopbackChannel {
    port: Mutex<Option<String>>,
    settings: Mutex<PortSettings>,
    capacity: usize,
    close_settle: Duration,
    /// Created by `open()`; `None` until the first open.
    queue: Mutex<Option<Arc<BoundedQueue<QueueItem>>>>,
    is_open: AtomicBool,
    rts: AtomicBool,
    dtr: AtomicBool,
    break_state: AtomicBool,
    sink: Mutex<Option<DiagnosticSink>>,
    /// Serializes open/close against each other.
    lifecycle: Mutex<()>,
}

impl Default for LoopbackChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackChannel {
    /// Create a closed channel with no address and default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> LoopbackChannelBuilder {
        LoopbackChannelBuilder::default()
    }

    /// Create a closed channel targeting `address`.
    pub fn with_port(address: impl Into<String>) -> Self {
        Self::builder().port(address).build()
    }

    /// Create a channel for `address` and open it.
    pub fn open_url(address: impl Into<String>) -> Result<Self, PortError> {
        let channel = Self::with_port(address);
        channel.open()?;
        Ok(channel)
    }

    /// Create a closed channel from a `[channel]` config section.
    pub fn from_config(config: &ChannelConfig) -> Self {
        Self::builder()
            .port(config.port.clone())
            .capacity(config.capacity)
            .settings(config.settings())
            .close_settle(config.close_settle())
            .build()
    }

    // ---- lifecycle ----

    /// Open the channel.
    ///
    /// Decodes the address (attaching a diagnostic sink if it asks for one),
    /// validates the settings, creates a fresh queue, resets the control
    /// lines and clears both buffers.
    pub fn open(&self) -> Result<(), PortError> {
        let _lifecycle = self.lifecycle.lock();
        if self.is_open() {
            return Err(PortError::AlreadyOpen);
        }

        *self.sink.lock() = None;
        let port = self.port.lock().clone().ok_or(PortError::NotConfigured)?;
        let address = LoopAddress::parse(&port)?;
        if let Some(level) = address.logging() {
            *self.sink.lock() = Some(DiagnosticSink::install(level));
        }

        self.reconfigure()?;

        *self.queue.lock() = Some(Arc::new(BoundedQueue::new(self.capacity)));
        self.is_open.store(true, Ordering::SeqCst);

        self.set_dtr(false);
        self.set_rts(false);
        self.reset_input_buffer()?;
        self.reset_output_buffer()?;

        debug!(port = %port, capacity = self.capacity, "loopback channel opened");
        Ok(())
    }

    /// Close the channel.
    ///
    /// Wakes a reader blocked in [`read`](Self::read), then sleeps for the
    /// settle pause. Closing a closed channel does nothing.
    pub fn close(&self) {
        let _lifecycle = self.lifecycle.lock();
        if !self.is_open() {
            return;
        }

        if let Some(queue) = self.queue.lock().as_ref() {
            queue.push_unbounded(QueueItem::EndOfStream);
        }
        self.is_open.store(false, Ordering::SeqCst);
        self.log(LogLevel::Info, format_args!("close()"));
        debug!(settle = ?self.close_settle, "loopback channel closed");

        thread::sleep(self.close_settle);
    }

    pub fn is_open(&self) -> bool {
        self.is_open.load(Ordering::SeqCst)
    }

    // ---- data path ----

    /// Write `data` into the loopback queue.
    ///
    /// If a write timeout is set and the advisory transmit time of `data`
    /// exceeds it, sleeps for the timeout and fails without queueing
    /// anything. Otherwise each byte is queued with the write timeout; bytes
    /// queued before a timeout stay queued.
    pub fn write(&self, data: &[u8]) -> Result<usize, PortError> {
        let queue = self.live_queue()?;
        let (transmit, write_timeout) = {
            let settings = self.settings.lock();
            (settings.transmit_duration(data.len()), settings.write_timeout)
        };

        if let Some(timeout) = write_timeout {
            if transmit > timeout {
                thread::sleep(timeout);
                return Err(PortError::write_timeout(timeout));
            }
        }

        for &byte in data {
            queue
                .push(QueueItem::Data(byte), write_timeout)
                .map_err(|_| PortError::write_timeout(write_timeout.unwrap_or_default()))?;
        }

        self.log(
            LogLevel::Debug,
            format_args!("write({} bytes), advisory {:?}", data.len(), transmit),
        );
        Ok(data.len())
    }

    /// Read up to `size` bytes.
    ///
    /// Each byte is waited for up to the read timeout (`None` waits
    /// forever). A timeout, the close marker, or the overall deadline
    /// (call time + read timeout) ends the read early with what was
    /// collected so far.
    pub fn read(&self, size: usize) -> Result<Vec<u8>, PortError> {
        let queue = self.live_queue()?;
        let timeout = self.settings.lock().read_timeout;
        let deadline = deadline_after(timeout);

        let mut data = Vec::with_capacity(size.min(self.capacity));
        while data.len() < size && self.is_open() {
            match queue.pop(timeout) {
                Some(QueueItem::Data(byte)) => data.push(byte),
                Some(QueueItem::EndOfStream) | None => break,
            }
            // Checked after a successful pop so a zero timeout still yields
            // one byte when data is queued.
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                break;
            }
        }
        Ok(data)
    }

    /// Read a single byte, the default read size.
    pub fn read_one(&self) -> Result<Option<u8>, PortError> {
        Ok(self.read(1)?.first().copied())
    }

    /// Take up to `max` bytes that are queued right now, without waiting.
    pub fn read_available(&self, max: usize) -> Result<Vec<u8>, PortError> {
        let queue = self.live_queue()?;
        let mut data = Vec::new();
        while data.len() < max {
            match queue.try_pop() {
                Some(QueueItem::Data(byte)) => data.push(byte),
                Some(QueueItem::EndOfStream) | None => break,
            }
        }
        Ok(data)
    }

    /// Nothing lingers on the transmit side, so there is nothing to wait for.
    pub fn flush(&self) -> Result<(), PortError> {
        self.live_queue()?;
        Ok(())
    }

    // ---- buffers ----

    /// Number of bytes waiting to be read.
    ///
    /// With a concurrent reader the value can be stale by the time it is
    /// acted on.
    pub fn in_waiting(&self) -> Result<usize, PortError> {
        let waiting = self.live_queue()?.len();
        self.log(LogLevel::Debug, format_args!("in_waiting() -> {waiting}"));
        Ok(waiting)
    }

    /// Bytes written but not yet delivered. Always zero on a loopback.
    pub fn out_waiting(&self) -> Result<usize, PortError> {
        self.live_queue()?;
        Ok(0)
    }

    /// Discard everything waiting to be read.
    pub fn reset_input_buffer(&self) -> Result<(), PortError> {
        let queue = self.live_queue()?;
        self.log(LogLevel::Info, format_args!("reset_input_buffer()"));
        queue.clear();
        Ok(())
    }

    /// Discard everything waiting to be sent.
    ///
    /// Both directions share one queue, so this has the same effect as
    /// [`reset_input_buffer`](Self::reset_input_buffer).
    pub fn reset_output_buffer(&self) -> Result<(), PortError> {
        let queue = self.live_queue()?;
        self.log(LogLevel::Info, format_args!("reset_output_buffer()"));
        queue.clear();
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // ---- control lines ----

    /// Set Request To Send. Read back as CTS.
    pub fn set_rts(&self, level: bool) {
        self.rts.store(level, Ordering::SeqCst);
        self.log(
            LogLevel::Info,
            format_args!("set_rts({level}) -> state of CTS"),
        );
    }

    /// Set Data Terminal Ready. Read back as DSR.
    pub fn set_dtr(&self, level: bool) {
        self.dtr.store(level, Ordering::SeqCst);
        self.log(
            LogLevel::Info,
            format_args!("set_dtr({level}) -> state of DSR"),
        );
    }

    pub fn rts(&self) -> bool {
        self.rts.load(Ordering::SeqCst)
    }

    pub fn dtr(&self) -> bool {
        self.dtr.load(Ordering::SeqCst)
    }

    /// Clear To Send: mirrors RTS.
    pub fn cts(&self) -> Result<bool, PortError> {
        self.ensure_open()?;
        let level = self.rts();
        self.log(
            LogLevel::Info,
            format_args!("cts() -> state of RTS ({level})"),
        );
        Ok(level)
    }

    /// Data Set Ready: mirrors DTR.
    pub fn dsr(&self) -> Result<bool, PortError> {
        self.ensure_open()?;
        let level = self.dtr();
        self.log(
            LogLevel::Info,
            format_args!("dsr() -> state of DTR ({level})"),
        );
        Ok(level)
    }

    /// Ring Indicator. Nobody can call a loopback, so always false.
    pub fn ri(&self) -> bool {
        self.log(LogLevel::Info, format_args!("returning dummy for ri()"));
        false
    }

    /// Carrier Detect. A loopback always has a carrier.
    pub fn cd(&self) -> bool {
        self.log(LogLevel::Info, format_args!("returning dummy for cd()"));
        true
    }

    /// Assert or release the break condition. Data flow is unaffected.
    pub fn set_break(&self, level: bool) {
        self.break_state.store(level, Ordering::SeqCst);
        self.log(LogLevel::Info, format_args!("set_break({level})"));
    }

    pub fn break_state(&self) -> bool {
        self.break_state.load(Ordering::SeqCst)
    }

    /// Hold the break condition for `duration`, then release it.
    pub fn send_break(&self, duration: Duration) -> Result<(), PortError> {
        self.ensure_open()?;
        self.set_break(true);
        thread::sleep(duration);
        self.set_break(false);
        Ok(())
    }

    // ---- configuration ----

    pub fn port(&self) -> Option<String> {
        self.port.lock().clone()
    }

    /// Change the target address. An open channel is closed and reopened
    /// with the new address.
    pub fn set_port(&self, address: Option<String>) -> Result<(), PortError> {
        let was_open = self.is_open();
        if was_open {
            self.close();
        }
        *self.port.lock() = address;
        if was_open {
            self.open()?;
        }
        Ok(())
    }

    pub fn settings(&self) -> PortSettings {
        self.settings.lock().clone()
    }

    /// Replace all settings at once. Takes effect on the next operation.
    pub fn apply_settings(&self, settings: PortSettings) -> Result<(), PortError> {
        validate_baud_rate(u64::from(settings.baud_rate))?;
        *self.settings.lock() = settings;
        if self.is_open() {
            self.reconfigure()?;
        }
        Ok(())
    }

    pub fn baud_rate(&self) -> u32 {
        self.settings.lock().baud_rate
    }

    pub fn set_baud_rate(&self, baud_rate: u32) -> Result<(), PortError> {
        let baud_rate = validate_baud_rate(u64::from(baud_rate))?;
        self.settings.lock().baud_rate = baud_rate;
        if self.is_open() {
            self.reconfigure()?;
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.settings.lock().read_timeout
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) {
        self.settings.lock().read_timeout = timeout;
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.settings.lock().write_timeout
    }

    pub fn set_write_timeout(&self, timeout: Option<Duration>) {
        self.settings.lock().write_timeout = timeout;
    }

    pub fn set_data_bits(&self, data_bits: DataBits) {
        self.settings.lock().data_bits = data_bits;
    }

    pub fn set_parity(&self, parity: Parity) {
        self.settings.lock().parity = parity;
    }

    pub fn set_stop_bits(&self, stop_bits: StopBits) {
        self.settings.lock().stop_bits = stop_bits;
    }

    pub fn set_flow_control(&self, flow_control: FlowControl) {
        self.settings.lock().flow_control = flow_control;
    }

    /// Level of the diagnostic sink attached by the last `open()`, if any.
    pub fn diagnostics(&self) -> Option<LogLevel> {
        self.sink.lock().map(|sink| sink.level())
    }

    /// Snapshot of the channel for reporting.
    pub fn status(&self) -> ChannelStatus {
        let settings = self.settings();
        let is_open = self.is_open();
        ChannelStatus {
            port: self.port(),
            is_open,
            capacity: self.capacity,
            in_waiting: if is_open { self.in_waiting().ok() } else { None },
            baud_rate: settings.baud_rate,
            read_timeout_ms: settings.read_timeout.map(saturating_millis),
            write_timeout_ms: settings.write_timeout.map(saturating_millis),
            rts: self.rts(),
            dtr: self.dtr(),
            break_state: self.break_state(),
            diagnostics: self.diagnostics(),
        }
    }

    // ---- internals ----

    /// Settings are not applied to anything on a loopback; only the baud
    /// rate is checked.
    fn reconfigure(&self) -> Result<(), PortError> {
        let baud_rate = self.settings.lock().baud_rate;
        validate_baud_rate(u64::from(baud_rate))?;
        self.log(LogLevel::Info, format_args!("reconfigure(baud_rate={baud_rate})"));
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), PortError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(PortError::NotOpen)
        }
    }

    fn live_queue(&self) -> Result<Arc<BoundedQueue<QueueItem>>, PortError> {
        self.ensure_open()?;
        self.queue.lock().clone().ok_or(PortError::NotOpen)
    }

    fn log(&self, level: LogLevel, message: fmt::Arguments<'_>) {
        let sink = *self.sink.lock();
        if let Some(sink) = sink {
            sink.emit(level, message);
        }
    }
}

pub(crate) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl fmt::Debug for LoopbackChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackChannel")
            .field("port", &self.port())
            .field("is_open", &self.is_open())
            .field("capacity", &self.capacity)
            .field("settings", &self.settings())
            .finish()
    }
}

/// Serializable snapshot returned by [`LoopbackChannel::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStatus {
    pub port: Option<String>,
    pub is_open: bool,
    pub capacity: usize,
    pub in_waiting: Option<usize>,
    pub baud_rate: u32,
    pub read_timeout_ms: Option<u64>,
    pub write_timeout_ms: Option<u64>,
    pub rts: bool,
    pub dtr: bool,
    pub break_state: bool,
    pub diagnostics: Option<LogLevel>,
}

/// Builder for [`LoopbackChannel`].
#[derive(Debug, Clone)]
pub struct LoopbackChannelBuilder {
    port: Option<String>,
    capacity: usize,
    settings: PortSettings,
    close_settle: Duration,
}

impl Default for LoopbackChannelBuilder {
    fn default() -> Self {
        Self {
            port: None,
            capacity: DEFAULT_CAPACITY,
            settings: PortSettings::default(),
            close_settle: DEFAULT_CLOSE_SETTLE,
        }
    }
}

impl LoopbackChannelBuilder {
    pub fn port(mut self, address: impl Into<String>) -> Self {
        self.port = Some(address.into());
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn settings(mut self, settings: PortSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Baud rate; validated when the channel is opened.
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.settings.baud_rate = baud_rate;
        self
    }

    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.settings.read_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.settings.write_timeout = timeout;
        self
    }

    pub fn close_settle(mut self, settle: Duration) -> Self {
        self.close_settle = settle;
        self
    }

    pub fn build(self) -> LoopbackChannel {
        LoopbackChannel {
            port: Mutex::new(self.port),
            settings: Mutex::new(self.settings),
            capacity: self.capacity.max(1),
            close_settle: self.close_settle,
            queue: Mutex::new(None),
            is_open: AtomicBool::new(false),
            rts: AtomicBool::new(false),
            dtr: AtomicBool::new(false),
            break_state: AtomicBool::new(false),
            sink: Mutex::new(None),
            lifecycle: Mutex::new(()),
        }
    }
}
