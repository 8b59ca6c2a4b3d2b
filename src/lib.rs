#![doc = include_str!("../README.md")]

mod error;
mod framer;
mod message;
mod packet;
mod stats;

pub mod cycle;
pub mod sniffer;

pub use error::{Error, Result};
pub use framer::Framer;
pub use message::MessageAssembler;
pub use packet::{Packet, Sample, FREQ_HZ_PER_TICK};
pub use stats::{FreqStats, FreqSummary};
