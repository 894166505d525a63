#[inline]
pub(crate) const fn round_down(value: u64, unit: u64) -> u64 {
    value - value % unit
}

#[inline]
pub(crate) const fn round_up(value: u64, unit: u64) -> u64 {
    if value % unit == 0 {
        value
    } else {
        (value / unit + 1) * unit
    }
}
