use crate::MvaError;

/// Scalar type of every rate, time and queue length.
pub type Real = f64;

/// Checks an input parameter (service time, visit count, arrival rate).
///
/// NaN and infinities are reported before the sign.
pub fn ensure_non_negative(v: Real, what: &'static str) -> Result<Real, MvaError> {
    if !v.is_finite() {
        return Err(MvaError::NonFinite { what, value: v });
    }
    if v < 0.0 {
        return Err(MvaError::Negative { what, value: v });
    }
    Ok(v)
}

/// `x` clamped at zero; used for quantities that round slightly negative.
#[inline]
pub fn positive(x: Real) -> Real {
    if x > 0.0 { x } else { 0.0 }
}

#[inline]
pub fn square(x: Real) -> Real {
    x * x
}
