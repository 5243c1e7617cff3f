/// Percentage reached after `current` of `total` steps of a phase that spans
/// `base_percent..top_percent` of the whole job.
///
/// `top_percent` is clamped to 100 and a `total` of zero counts as one step.
/// Intermediate values are exact; the result saturates at `i32::MIN` on the
/// low side.
/// The result is `floor(min(100, base + current / total * (top - base)))`,
/// which lies in `0..=100` whenever `0 <= base_percent <= top_percent` and
/// `current <= total`. With `base_percent > top_percent` the same formula is
/// applied as written and progress moves backwards.
pub fn calculate_progress(current: u32, total: u32, base_percent: i32, top_percent: i32) -> i32 {
    let total = i128::from(total.max(1));
    let base = i128::from(base_percent);
    let top = i128::from(top_percent.min(100));

    // base is whole, so flooring the fraction alone floors the sum
    let advanced = (i128::from(current) * (top - base)).div_euclid(total);
    (base + advanced).clamp(i128::from(i32::MIN), 100) as i32
}
