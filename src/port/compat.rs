//! `serialport::SerialPort` implementation on top of [`LoopbackChannel`].
//!
//! Lets code written against the `serialport` crate run against a loopback
//! without changes. Handles are cheap clones sharing one channel, so one can
//! be moved to a reader thread while another keeps writing.

use super::error::PortError;
use super::loopback::LoopbackChannel;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// A `serialport`-compatible handle to a shared loopback channel.
#[derive(Debug, Clone)]
pub struct LoopbackPort {
    channel: Arc<LoopbackChannel>,
}

impl LoopbackPort {
    pub fn new(channel: Arc<LoopbackChannel>) -> Self {
        Self { channel }
    }

    /// Open a fresh channel at `address` and wrap it.
    pub fn open(address: impl Into<String>) -> Result<Self, PortError> {
        Ok(Self::new(Arc::new(LoopbackChannel::open_url(address)?)))
    }

    pub fn channel(&self) -> &Arc<LoopbackChannel> {
        &self.channel
    }

    pub fn into_boxed(self) -> Box<dyn SerialPort> {
        Box::new(self)
    }
}

impl io::Read for LoopbackPort {
    /// Waits for the first byte under the read timeout, then takes whatever
    /// else is already queued.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let first = self.channel.read(1)?;
        let Some(&byte) = first.first() else {
            if self.channel.is_open() {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "loopback read timed out",
                ));
            }
            return Ok(0);
        };
        buf[0] = byte;

        let rest = self.channel.read_available(buf.len() - 1)?;
        buf[1..=rest.len()].copy_from_slice(&rest);
        Ok(1 + rest.len())
    }
}

impl io::Write for LoopbackPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.channel.write(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.channel.flush()?)
    }
}

impl SerialPort for LoopbackPort {
    fn name(&self) -> Option<String> {
        self.channel.port()
    }

    fn baud_rate(&self) -> serialport::Result<u32> {
        Ok(self.channel.baud_rate())
    }

    fn data_bits(&self) -> serialport::Result<DataBits> {
        Ok(self.channel.settings().data_bits.into())
    }

    fn flow_control(&self) -> serialport::Result<FlowControl> {
        Ok(self.channel.settings().flow_control.into())
    }

    fn parity(&self) -> serialport::Result<Parity> {
        Ok(self.channel.settings().parity.into())
    }

    fn stop_bits(&self) -> serialport::Result<StopBits> {
        Ok(self.channel.settings().stop_bits.into())
    }

    /// The read timeout; `Duration::MAX` when reads block.
    fn timeout(&self) -> Duration {
        self.channel.read_timeout().unwrap_or(Duration::MAX)
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> serialport::Result<()> {
        Ok(self.channel.set_baud_rate(baud_rate)?)
    }

    fn set_flow_control(&mut self, flow_control: FlowControl) -> serialport::Result<()> {
        self.channel.set_flow_control(flow_control.into());
        Ok(())
    }

    fn set_parity(&mut self, parity: Parity) -> serialport::Result<()> {
        self.channel.set_parity(parity.into());
        Ok(())
    }

    fn set_data_bits(&mut self, data_bits: DataBits) -> serialport::Result<()> {
        self.channel.set_data_bits(data_bits.into());
        Ok(())
    }

    fn set_stop_bits(&mut self, stop_bits: StopBits) -> serialport::Result<()> {
        self.channel.set_stop_bits(stop_bits.into());
        Ok(())
    }

    /// Sets the read timeout only; writes keep their own timeout.
    fn set_timeout(&mut self, timeout: Duration) -> serialport::Result<()> {
        self.channel.set_read_timeout(match timeout {
            Duration::MAX => None,
            duration => Some(duration),
        });
        Ok(())
    }

    fn write_request_to_send(&mut self, level: bool) -> serialport::Result<()> {
        self.channel.set_rts(level);
        Ok(())
    }

    fn write_data_terminal_ready(&mut self, level: bool) -> serialport::Result<()> {
        self.channel.set_dtr(level);
        Ok(())
    }

    fn read_clear_to_send(&mut self) -> serialport::Result<bool> {
        Ok(self.channel.cts()?)
    }

    fn read_data_set_ready(&mut self) -> serialport::Result<bool> {
        Ok(self.channel.dsr()?)
    }

    fn read_ring_indicator(&mut self) -> serialport::Result<bool> {
        Ok(self.channel.ri())
    }

    fn read_carrier_detect(&mut self) -> serialport::Result<bool> {
        Ok(self.channel.cd())
    }

    fn bytes_to_read(&self) -> serialport::Result<u32> {
        let waiting = self.channel.in_waiting()?;
        Ok(u32::try_from(waiting).unwrap_or(u32::MAX))
    }

    fn bytes_to_write(&self) -> serialport::Result<u32> {
        let waiting = self.channel.out_waiting()?;
        Ok(u32::try_from(waiting).unwrap_or(u32::MAX))
    }

    fn clear(&self, buffer_to_clear: ClearBuffer) -> serialport::Result<()> {
        match buffer_to_clear {
            ClearBuffer::Input => self.channel.reset_input_buffer()?,
            ClearBuffer::Output => self.channel.reset_output_buffer()?,
            ClearBuffer::All => {
                self.channel.reset_input_buffer()?;
                self.channel.reset_output_buffer()?;
            }
        }
        Ok(())
    }

    fn try_clone(&self) -> serialport::Result<Box<dyn SerialPort>> {
        Ok(Box::new(self.clone()))
    }

    fn set_break(&self) -> serialport::Result<()> {
        self.channel.set_break(true);
        Ok(())
    }

    fn clear_break(&self) -> serialport::Result<()> {
        self.channel.set_break(false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn port() -> LoopbackPort {
        let channel = LoopbackChannel::builder()
            .port("loop://")
            .close_settle(Duration::ZERO)
            .build();
        channel.open().unwrap();
        LoopbackPort::new(Arc::new(channel))
    }

    #[test]
    fn test_control_lines() {
        let mut port = port();

        port.write_request_to_send(true).unwrap();
        assert!(port.read_clear_to_send().unwrap());

        port.write_data_terminal_ready(true).unwrap();
        assert!(port.read_data_set_ready().unwrap());

        port.write_request_to_send(false).unwrap();
        assert!(!port.read_clear_to_send().unwrap());

        assert!(!port.read_ring_indicator().unwrap());
        assert!(port.read_carrier_detect().unwrap());
    }

    #[test]
    fn test_read_takes_queued_bytes() {
        let mut port = port();
        port.write_all(b"hello").unwrap();

        let mut buf = [0u8; 16];
        let n = port.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
    }

    #[test]
    fn test_read_times_out() {
        let mut port = port();
        port.set_timeout(Duration::from_millis(20)).unwrap();

        let mut buf = [0u8; 4];
        let err = port.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn test_buffer_clearing() {
        let mut port = port();
        port.set_timeout(Duration::from_millis(50)).unwrap();

        port.write_all(b"test").unwrap();
        assert_eq!(port.bytes_to_read().unwrap(), 4);
        port.clear(ClearBuffer::All).unwrap();
        assert_eq!(port.bytes_to_read().unwrap(), 0);

        let mut read_data = [0u8; 4];
        assert_eq!(
            port.read_exact(&mut read_data).unwrap_err().kind(),
            io::ErrorKind::TimedOut
        );
    }

    #[test]
    fn test_timeout_round_trip() {
        let mut port = port();
        assert_eq!(port.timeout(), Duration::MAX);
        port.set_timeout(Duration::from_millis(5)).unwrap();
        assert_eq!(port.timeout(), Duration::from_millis(5));
        port.set_timeout(Duration::MAX).unwrap();
        assert_eq!(port.channel().read_timeout(), None);
    }

    #[test]
    fn test_huge_timeout_reads_without_overflow() {
        let mut port = port();
        port.set_timeout(Duration::from_secs(u64::MAX)).unwrap();
        port.write_all(b"ok").unwrap();

        let mut buf = [0u8; 2];
        port.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ok");
    }

    #[test]
    fn test_clone_shares_channel() {
        let mut port = port();
        let mut clone = port.try_clone().unwrap();

        clone.write_all(b"z").unwrap();
        let mut buf = [0u8; 1];
        port.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"z");
    }

    #[test]
    fn test_config_change() {
        let mut port = port();

        port.set_baud_rate(19200).unwrap();
        assert_eq!(port.baud_rate().unwrap(), 19200);
        assert!(port.set_baud_rate(0).is_err());

        port.set_data_bits(DataBits::Seven).unwrap();
        assert_eq!(port.data_bits().unwrap(), DataBits::Seven);

        port.set_parity(Parity::Odd).unwrap();
        assert_eq!(port.parity().unwrap(), Parity::Odd);

        port.set_stop_bits(StopBits::Two).unwrap();
        assert_eq!(port.stop_bits().unwrap(), StopBits::Two);

        port.set_flow_control(FlowControl::Hardware).unwrap();
        assert_eq!(port.flow_control().unwrap(), FlowControl::Hardware);
    }

    #[test]
    fn test_break_toggles() {
        let port = port();
        port.set_break().unwrap();
        assert!(port.channel().break_state());
        port.clear_break().unwrap();
        assert!(!port.channel().break_state());
    }

    #[test]
    fn test_closed_port_errors() {
        let mut port = port();
        port.channel().close();

        let mut buf = [0u8; 1];
        assert_eq!(
            port.read(&mut buf).unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
        assert_eq!(
            port.bytes_to_read().unwrap_err().kind(),
            serialport::ErrorKind::NoDevice
        );
    }
}
