//! LCD controller drivers.

pub mod sed1520;
