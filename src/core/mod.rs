//! Core, platform independent gateway code.

pub mod arp_cache;
pub mod dev;
pub mod fifo;
pub mod platform;
pub mod repr;
pub mod service;
pub mod storage;
