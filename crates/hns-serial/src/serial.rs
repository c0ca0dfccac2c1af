//! 基于 `serialport` 的串口实现

use crate::{LinkConfig, LinkConnector, LinkError, LinkHalves, RxLink, TxLink};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use tracing::{debug, info};

/// 真实串口连接器
pub struct SerialPortConnector {
    config: LinkConfig,
}

impl SerialPortConnector {
    pub fn new(config: LinkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }
}

impl LinkConnector for SerialPortConnector {
    fn connect(&mut self) -> Result<LinkHalves, LinkError> {
        let port = serialport::new(&self.config.port, self.config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.config.timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => LinkError::NotFound(self.config.port.clone()),
                serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                    LinkError::NotFound(self.config.port.clone())
                },
                _ => LinkError::Serial(e),
            })?;

        // 同一个文件描述符的两个句柄：RX 线程阻塞读时不影响 TX 线程写
        let tx_port = port.try_clone()?;

        info!(
            "Opened serial port: {} at {} baud (timeout {:?})",
            self.config.port, self.config.baud_rate, self.config.timeout
        );

        Ok(LinkHalves {
            rx: Box::new(SerialRx { port }),
            tx: Box::new(SerialTx { port: tx_port }),
        })
    }

    fn describe(&self) -> String {
        format!("{}@{}", self.config.port, self.config.baud_rate)
    }
}

struct SerialRx {
    port: Box<dyn SerialPort>,
}

impl RxLink for SerialRx {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for SerialRx {
    fn drop(&mut self) {
        debug!("Closing serial RX handle");
    }
}

struct SerialTx {
    port: Box<dyn SerialPort>,
}

impl TxLink for SerialTx {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }
}
