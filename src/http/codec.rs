//! JSON decoding shared by request bodies and uploaded files.

use serde::de::DeserializeOwned;

/// Decode the first JSON value in `bytes`, ignoring anything after it.
///
/// Blank input reports the usual end-of-input error.
pub fn decode_first<T: DeserializeOwned>(bytes: &[u8]) -> serde_json::Result<T> {
    match serde_json::Deserializer::from_slice(bytes).into_iter::<T>().next() {
        Some(result) => result,
        None => serde_json::from_slice(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        a: i64,
    }

    #[test]
    fn test_trailing_values_ignored() {
        let item: Item = decode_first(br#"{"a":1} {"a":2}"#).unwrap();
        assert_eq!(item, Item { a: 1 });
    }

    #[test]
    fn test_blank_input_is_eof() {
        let err = decode_first::<Item>(b"  \n").unwrap_err();
        assert!(err.is_eof());
    }

    #[test]
    fn test_malformed_first_value() {
        let err = decode_first::<Item>(br#"{"a":x}"#).unwrap_err();
        assert!(err.is_syntax());
    }
}
