//! SPI framing types
//!
//! Every W5500 transaction starts with the same 3-byte header:
//!
//! ```text
//! [Addr High] [Addr Low] [Control]
//!
//! Control:
//!   [7:3] Block Select (BSB)
//!   [2]   R/W (0 = read, 1 = write)
//!   [1:0] Operation Mode (OM)
//! ```
//!
//! [`build_header`] is the only place that packs these bits.

mod address;
mod block;
mod header;
mod op_mode;

pub use address::RegisterAddress;
pub use block::{Block, BlockKind, SOCKET_COUNT};
pub use header::{build_header, Access, SpiHeader, HEADER_LEN};
pub use op_mode::OpMode;
