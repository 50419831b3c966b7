/// Equivalent to `f32::round` but suitable on `no_std`, rounds half away from zero.
#[inline]
pub(crate) fn round(value: f32) -> f32 {
    libm::roundf(value)
}

/// Equivalent to `f64::round` but suitable on `no_std`, rounds half away from zero.
#[inline]
pub(crate) fn round64(value: f64) -> f64 {
    libm::round(value)
}

/// Equivalent to `f64::floor` but suitable on `no_std`.
#[inline]
pub(crate) fn floor64(value: f64) -> f64 {
    libm::floor(value)
}

/// Equivalent to `f32::abs` but suitable on `no_std`.
#[inline]
pub(crate) fn abs(value: f32) -> f32 {
    libm::fabsf(value)
}
