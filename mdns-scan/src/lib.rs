//! mDNS service-discovery scanner.
//!
//! Sweeps an address range with multicast DNS `ANY` queries and aggregates the
//! PTR, SRV, TXT, A and AAAA records every responder returns into a registry
//! keyed by source address.

pub mod config;
pub mod dns;
pub mod interface;
pub mod interpret;
pub mod report;
pub mod scan;
