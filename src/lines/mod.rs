//! Line-based intermediate representation (LBIR).
//!
//! One clause per line:
//!
//! ```text
//! severity gt 5
//! license_plate_number regex '^MH12'
//! camera_id = 3
//! involved_persons in ['driver','pedestrian']
//! sort timestamp -1
//! limit = 50
//! ```
//!
//! `<key> = <value>` is an equality, `<key> <op> <value>` one operator of
//! an operator object (written without its `$`). Reserved keys carry
//! cursor options and the `_original_numbers` and `_float_leaves` side
//! tables:
//!
//! ```text
//! speed gt 80
//! _float_leaves speed ['gt']
//! ```

pub mod decode;
pub mod encode;

pub use decode::decode;
pub use encode::encode;

use crate::ast::flat::{FLOAT_LEAVES_KEY, ORIGINAL_NUMBERS_KEY};

/// Keys whose object value is written one entry per line.
pub const ENTRY_KEYS: [&str; 5] = [
    "sort",
    "order_by",
    "projection",
    ORIGINAL_NUMBERS_KEY,
    FLOAT_LEAVES_KEY,
];

/// Keys that take a single value whatever the operator token says.
pub const VALUE_KEYS: [&str; 3] = ["limit", "skip", "offset"];

/// Operators whose empty value means an empty list.
pub const LIST_OPERATORS: [&str; 3] = ["in", "nin", "all"];

/// Equality token.
pub const EQUALS: &str = "=";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FlatPredicate, Predicate};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn flat(v: serde_json::Value) -> FlatPredicate {
        let Predicate::Object(fields) = Predicate::from_json(v) else {
            panic!("not an object")
        };
        FlatPredicate::from(fields)
    }

    #[test]
    fn test_round_trip() {
        let p = flat(json!({
            "severity": {"$gt": 5, "$lte": 9},
            "license_plate_number": {"$regex": "^MH12", "$options": "i"},
            "camera_id": 3,
            "camera_name": "Gate 4",
            "involved": {"$in": ["driver", "it's"]},
            "speed": {"$gte": 20.5},
            "flagged": false,
            "zone": {"$ne": ""},
            "tags": {"$nin": []},
            "location": {"lat": 1.5},
            "sort": {"timestamp": -1},
            "projection": {"_id": 0},
            "limit": 50,
            "skip": 10
        }));
        assert_eq!(decode(&encode(&p)).unwrap(), p);
    }

    #[test]
    fn test_encode_decode_encode_is_stable() {
        let p = flat(json!({
            "a": null,
            "b": "",
            "c": [],
            "d": {},
            "e": 0,
            "f": {"$gt": 2.0},
            "g": {"$ne": [1, 2]}
        }));
        let once = encode(&p);
        assert_eq!(encode(&decode(&once).unwrap()), once);
        assert_eq!(once, "e = 0\nf gt 2\ng ne [1,2]\n_float_leaves f ['gt']");
    }

    #[test]
    fn test_ints_next_to_integral_floats_stay_ints() {
        let p = flat(json!({
            "severity": 20,
            "speed": {"$gt": 20.0},
            "camera_id": 3,
            "camera_name": "cam3.0",
            "temperature": 3.0
        }));
        let decoded = decode(&encode(&p)).unwrap();
        assert_eq!(decoded, p);
        assert_eq!(decoded.get("severity"), Some(&Predicate::int(20)));
        assert_eq!(decoded.get("camera_id"), Some(&Predicate::int(3)));
    }

    #[test]
    fn test_control_characters_round_trip() {
        let p = flat(json!({
            "note": "line one\nline two",
            "tags": {"$in": ["a\tb", "c\rd"]},
            "plate": {"$regex": "^A\nB", "$options": "i"}
        }));
        assert_eq!(decode(&encode(&p)).unwrap(), p);
    }
}
