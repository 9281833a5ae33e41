//! Source of the current day of month

use chrono::{Datelike, Local};
use std::fmt::Debug;

/// Supplies the day of month used for calendar icons
pub trait DateSource: Send + Sync + Debug {
    /// Current day of month, 1 based
    fn day_of_month(&self) -> u32;
}

/// Local wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDate;

impl DateSource for SystemDate {
    fn day_of_month(&self) -> u32 {
        Local::now().day()
    }
}
