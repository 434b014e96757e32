/// rounds to the nearest multiple of `accuracy_factor`, halves round up
pub fn round_to_accuracy(value: u64, accuracy_factor: u64) -> u64 {
    if accuracy_factor <= 1 {
        return value;
    }
    let half = accuracy_factor / 2;
    let factor = accuracy_factor as u128;
    let rounded = (value as u128 + half as u128) / factor * factor;
    // the only way to exceed u64 is rounding up from the top bucket
    u64::try_from(rounded).unwrap_or(value - value % accuracy_factor)
}

/// whether an amount is already aligned to the accuracy factor
pub fn is_rounded(value: u64, accuracy_factor: u64) -> bool {
    accuracy_factor == 0 || value % accuracy_factor == 0
}
