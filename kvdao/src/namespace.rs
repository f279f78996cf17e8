//! Qualified key composition: `{prefix}:{instance}[:{sub_key}]`.

/// Builds the qualified key sent on the wire.
///
/// A sub-key that is empty or only spaces addresses the instance key itself.
pub fn compose(prefix: &str, instance: &str, sub_key: &str) -> String {
    if sub_key.trim_matches(' ').is_empty() {
        format!("{}:{}", prefix, instance)
    } else {
        format!("{}:{}:{}", prefix, instance, sub_key)
    }
}
