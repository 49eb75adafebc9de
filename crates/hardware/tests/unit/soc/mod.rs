//! SoC component tests.
