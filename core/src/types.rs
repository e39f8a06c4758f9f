//! Shared primitive types used across the entire pipeline.

/// A stable, unique identifier for a synthetic customer (`CUST_000001`).
pub type CustomerId = String;

/// The canonical run identifier. One run = one generate/analyze pass.
pub type RunId = String;

/// Whole days. Tenure and acquisition offsets are counted in these.
pub type Days = i64;

/// Round to `places` decimal places, ties to even.
///
/// Ties are decided on the exact product `value * 10^places`, so a
/// binary value just below a decimal half (`2.675`) rounds down while
/// an exact half (`0.125`) goes to the even neighbour. Every stored
/// derived field goes through this.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    let floor = scaled.floor();
    let rounded = if scaled - floor != 0.5 {
        scaled.round()
    } else {
        // `scaled` is itself rounded; the fused residual is the part it lost.
        let residual = value.mul_add(factor, -scaled);
        if residual > 0.0 {
            floor + 1.0
        } else if residual < 0.0 || floor % 2.0 == 0.0 {
            floor
        } else {
            floor + 1.0
        }
    };
    rounded / factor
}
