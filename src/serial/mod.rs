//! # Serial Communication Module
//!
//! Link driver for a flight controller attached over USB/UART.
//!
//! This module handles:
//! - Opening the configured port (with fallback device paths), 8N1
//! - Writing MSP request frames
//! - Reading exactly one MSP reply frame per request
//! - Dropping the port on disconnect so the next connect reopens it

pub mod port_trait;

use async_trait::async_trait;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::comms::{ConnectAttempt, ConnectionState, LinkDriver};
use crate::config::SerialConfig;
use crate::error::{FcCommsError, Result};
use crate::msp::protocol::{MSP_HEADER_SIZE, MSP_MAX_PAYLOAD_SIZE};
use port_trait::{SerialPortIO, TokioSerialPort};

/// Fallback device paths to try after the configured one (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC (most flight controllers)
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Serial link to the flight controller
pub struct SerialLink {
    /// Open port, `None` while disconnected
    port: Option<Box<dyn SerialPortIO>>,
    /// Paths tried on connect, in order
    device_paths: Vec<String>,
    baud_rate: u32,
    /// Path of the currently open device
    device_path: Option<String>,
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("device_paths", &self.device_paths)
            .field("baud_rate", &self.baud_rate)
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl SerialLink {
    /// Link for the configured port, falling back to the default device paths
    pub fn new(config: &SerialConfig) -> Self {
        let mut paths = vec![config.port.clone()];
        paths.extend(
            DEFAULT_DEVICE_PATHS
                .iter()
                .filter(|p| **p != config.port)
                .map(|p| p.to_string()),
        );
        Self::with_paths(paths, config.baud_rate)
    }

    /// Link that tries exactly `paths` on connect
    pub fn with_paths(paths: Vec<String>, baud_rate: u32) -> Self {
        Self {
            port: None,
            device_paths: paths,
            baud_rate,
            device_path: None,
        }
    }

    /// Link over an already-open port
    #[cfg(test)]
    pub(crate) fn from_port(port: Box<dyn SerialPortIO>, device_path: &str) -> Self {
        Self {
            port: Some(port),
            device_paths: vec![device_path.to_string()],
            baud_rate: 0,
            device_path: Some(device_path.to_string()),
        }
    }

    /// Path of the open device, if connected
    pub fn device_path(&self) -> Option<&str> {
        self.device_path.as_deref()
    }

    /// Open a specific serial port with MSP settings
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| FcCommsError::Transport(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    fn open_any(&self) -> Result<(String, tokio_serial::SerialStream)> {
        for path in &self.device_paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, self.baud_rate) {
                Ok(port) => return Ok((path.clone(), port)),
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            }
        }

        Err(FcCommsError::SerialPortNotFound(self.device_paths.join(", ")))
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPortIO>> {
        self.port
            .as_mut()
            .ok_or_else(|| FcCommsError::Transport("serial port not open".into()))
    }

    async fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let port = self.port_mut()?;

        port.write_all(frame)
            .await
            .map_err(|e| FcCommsError::Transport(format!("Failed to write frame: {}", e)))?;
        port.flush()
            .await
            .map_err(|e| FcCommsError::Transport(format!("Failed to flush serial port: {}", e)))?;

        debug!("Sent MSP frame ({} bytes)", frame.len());
        Ok(())
    }

    /// Read one reply: the 5-byte header, then `length + 1` bytes
    async fn read_frame(&mut self) -> Result<Vec<u8>> {
        let port = self.port_mut()?;

        let mut frame = vec![0u8; MSP_HEADER_SIZE];
        port.read_exact(&mut frame)
            .await
            .map_err(|e| FcCommsError::Transport(format!("Failed to read header: {}", e)))?;

        let length = frame[3] as usize;
        if length > MSP_MAX_PAYLOAD_SIZE {
            return Err(FcCommsError::Decode(format!(
                "Reply declares {} payload bytes (max {})",
                length, MSP_MAX_PAYLOAD_SIZE
            )));
        }

        frame.resize(MSP_HEADER_SIZE + length + 1, 0);
        port.read_exact(&mut frame[MSP_HEADER_SIZE..])
            .await
            .map_err(|e| FcCommsError::Transport(format!("Failed to read payload: {}", e)))?;

        debug!("Received MSP frame ({} bytes)", frame.len());
        Ok(frame)
    }
}

#[async_trait]
impl LinkDriver for SerialLink {
    async fn connect(&mut self) -> Result<ConnectAttempt> {
        let (path, stream) = self.open_any()?;
        info!("Opened flight controller at {} ({} baud)", path, self.baud_rate);

        self.port = Some(Box::new(TokioSerialPort::new(stream)));
        self.device_path = Some(path);
        Ok(ConnectAttempt::Connected)
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            info!(
                "Closed flight controller port {}",
                self.device_path.as_deref().unwrap_or("?")
            );
        }
        self.device_path = None;
        Ok(())
    }

    async fn send(&mut self, frame: &[u8]) -> Result<()> {
        self.write_frame(frame).await
    }

    async fn send_receive(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
        self.write_frame(frame).await?;
        self.read_frame().await
    }

    fn status(&self) -> ConnectionState {
        if self.port.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }
}
