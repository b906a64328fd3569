//! Helpers for partial-update request bodies.

use serde::{Deserialize, Deserializer};

/// Distinguishes an absent field (`None`) from an explicit null (`Some(None)`).
/// Use with `#[serde(default, deserialize_with = "nullable")]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Apply a tri-state patch to an optional field.
pub fn apply<T>(current: Option<T>, patch: Option<Option<T>>) -> Option<T> {
    match patch {
        Some(v) => v,
        None => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Body {
        #[serde(default, deserialize_with = "nullable")]
        parent_id: Option<Option<u32>>,
    }

    #[test]
    fn absent_null_and_value() {
        let b: Body = serde_json::from_value(json!({})).unwrap();
        assert_eq!(b.parent_id, None);
        let b: Body = serde_json::from_value(json!({ "parent_id": null })).unwrap();
        assert_eq!(b.parent_id, Some(None));
        let b: Body = serde_json::from_value(json!({ "parent_id": 7 })).unwrap();
        assert_eq!(b.parent_id, Some(Some(7)));
        assert_eq!(apply(Some(1), None), Some(1));
        assert_eq!(apply(Some(1), Some(None)), None);
    }
}
