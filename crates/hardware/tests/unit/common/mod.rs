//! Common type tests.
//!
//! This module contains unit tests for the address types and the memory-access packet.


/// Unit tests for packet construction, payload access and response conversion.
pub mod packet;
