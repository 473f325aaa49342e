//! Protocol module

pub mod ntp;
