#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "vpio-peripherals")]
pub mod vpio;
