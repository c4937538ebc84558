//! Line protocol root.
//!
//! Framing, checksum verification, parameter extraction and response
//! encoding for the rig's text command protocol:
//!
//! ```text
//! <NAME>[:<P1>[,<P2>...]][;<CRC16-HEX>]\n      request
//! <OK|ERROR|INFO>:<BODY>\n                      response
//! ```

pub mod crc;
pub mod frame;
pub mod parser;
pub mod response;

pub use crc::crc16;
pub use frame::Frame;
pub use parser::{CommandParser, FrameHandler};
pub use response::{Response, Status};
