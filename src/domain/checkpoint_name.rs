// ============================================================
// Layer 3 — Checkpoint Naming Convention
// ============================================================
// A checkpoint file name binds an epoch number to a parameter
// snapshot:
//
//   epoch_0000.params
//   epoch_0010.params
//   epoch_0123.params
//
// Format: fixed prefix "epoch_", exactly four zero-padded
// decimal digits, fixed suffix ".params". Parsing is a strict
// pattern match: anything not shaped exactly like that is
// rejected, so format → parse is lossless for 0..=9999.

/// Fixed filename prefix
pub const CHECKPOINT_PREFIX: &str = "epoch_";

/// Fixed filename suffix, also the discovery filter
pub const CHECKPOINT_SUFFIX: &str = ".params";

/// Width of the zero-padded epoch field
pub const EPOCH_DIGITS: usize = 4;

/// Largest epoch that fits in the fixed-width field
pub const MAX_EPOCH: usize = 9999;

/// Format the checkpoint filename for an epoch.
/// Returns `None` when the epoch does not fit in four digits.
pub fn format_checkpoint_name(epoch: usize) -> Option<String> {
    if epoch > MAX_EPOCH {
        return None;
    }
    Some(format!(
        "{CHECKPOINT_PREFIX}{epoch:0width$}{CHECKPOINT_SUFFIX}",
        width = EPOCH_DIGITS
    ))
}

/// Parse the epoch out of a checkpoint filename.
/// Returns `None` unless the name matches the pattern exactly.
pub fn parse_checkpoint_name(name: &str) -> Option<usize> {
    let digits = name
        .strip_prefix(CHECKPOINT_PREFIX)?
        .strip_suffix(CHECKPOINT_SUFFIX)?;

    if digits.len() != EPOCH_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// True for every name the discovery scan must account for,
/// well-formed or not.
pub fn has_checkpoint_suffix(name: &str) -> bool {
    name.ends_with(CHECKPOINT_SUFFIX)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_every_epoch() {
        for epoch in 0..=MAX_EPOCH {
            let name = format_checkpoint_name(epoch).unwrap();
            assert_eq!(parse_checkpoint_name(&name), Some(epoch), "{name}");
        }
    }

    #[test]
    fn test_zero_padding() {
        assert_eq!(format_checkpoint_name(0).unwrap(), "epoch_0000.params");
        assert_eq!(format_checkpoint_name(12).unwrap(), "epoch_0012.params");
        assert_eq!(format_checkpoint_name(9999).unwrap(), "epoch_9999.params");
    }

    #[test]
    fn test_epoch_out_of_range() {
        assert_eq!(format_checkpoint_name(10_000), None);
    }

    #[test]
    fn test_rejects_malformed_names() {
        for name in [
            "epoch_abcd.params",
            "epoch_12.params",
            "epoch_00012.params",
            "epoch_+012.params",
            "epoch_-001.params",
            "epoch_ 012.params",
            "Epoch_0012.params",
            "model.params",
            "epoch_0012.params.bak",
            "epoch_0012.PARAMS",
            "xepoch_0012.params",
        ] {
            assert_eq!(parse_checkpoint_name(name), None, "{name}");
        }
    }

    #[test]
    fn test_suffix_filter() {
        assert!(has_checkpoint_suffix("epoch_abcd.params"));
        assert!(has_checkpoint_suffix("model.params"));
        assert!(!has_checkpoint_suffix("train_config.json"));
        assert!(!has_checkpoint_suffix(".tmpA1b2C3"));
    }
}
