//! Deterministic object-key derivation.
//!
//! The key is the idempotency mechanism for asset publication: the same
//! `(campaign, variant, format)` triple always maps to the same key, so a
//! retried upload after a crash finds the object already in place.
//! Stability contract: changing this layout requires a storage migration.

/// Object key for a rendered creative asset:
/// `{campaignId}/variants/{variantId}/{formatName}.png`
pub fn variant_object_key(campaign_id: &str, variant_id: &str, format_name: &str) -> String {
    format!("{}/variants/{}/{}.png", campaign_id, variant_id, format_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_object_key_layout() {
        assert_eq!(
            variant_object_key("camp1", "var1", "1x1"),
            "camp1/variants/var1/1x1.png"
        );
    }

    #[test]
    fn test_variant_object_key_is_deterministic() {
        let a = variant_object_key("c-42", "v-7", "9x16");
        let b = variant_object_key("c-42", "v-7", "9x16");
        assert_eq!(a, b);
    }
}
