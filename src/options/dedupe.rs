//! Hook list deduplication across re-merges

use std::slice;

use super::value::OptionValue;

/// Dedupe a field that was modified after its constructor was sealed.
///
/// Non-list values come back unchanged. For lists, an entry of `latest` is
/// kept when it was explicitly declared (`extended`) or was not part of the
/// sealed snapshot; entries only carried over from the previous merge are
/// dropped so the next merge does not add them twice.
pub fn dedupe(
    latest: &OptionValue,
    extended: Option<&OptionValue>,
    sealed: Option<&OptionValue>,
) -> OptionValue {
    let Some(items) = latest.as_list() else {
        return latest.clone();
    };

    let sealed = as_slice(sealed);
    let extended = as_slice(extended);

    let kept = items
        .iter()
        .filter(|item| {
            OptionValue::position_in(extended, item).is_some()
                || OptionValue::position_in(sealed, item).is_none()
        })
        .cloned()
        .collect();

    OptionValue::list(kept)
}

/// A list as-is, a scalar as a one-element list, absence as empty
fn as_slice(value: Option<&OptionValue>) -> &[OptionValue] {
    match value {
        Some(OptionValue::List(items)) => items.as_slice(),
        Some(other) => slice::from_ref(other),
        None => &[],
    }
}
