//! Leaf traversal over nested predicates.

use super::Predicate;

/// Receives every leaf of a predicate tree together with its dot path.
///
/// Leaves are literals, operator objects, sequences and empty objects.
pub trait PredicateVisitor<'a> {
    fn visit_leaf(&mut self, path: &str, leaf: &'a Predicate);
}

impl Predicate {
    /// Walk the tree depth-first, joining keys with `.`.
    ///
    /// The root itself is never reported as a leaf when it is an object;
    /// a non-object root is reported under the empty path.
    pub fn walk<'a, V: PredicateVisitor<'a> + ?Sized>(&'a self, visitor: &mut V) {
        match self {
            Predicate::Object(fields) => {
                for (key, child) in fields.iter() {
                    child.walk_at(key, visitor);
                }
            }
            leaf => visitor.visit_leaf("", leaf),
        }
    }

    fn walk_at<'a, V: PredicateVisitor<'a> + ?Sized>(&'a self, path: &str, visitor: &mut V) {
        match self {
            Predicate::Object(fields) if !fields.is_empty() => {
                for (key, child) in fields.iter() {
                    child.walk_at(&format!("{}.{}", path, key), visitor);
                }
            }
            leaf => visitor.visit_leaf(path, leaf),
        }
    }

    /// Collect `(dot_path, leaf)` pairs in traversal order.
    pub fn leaves(&self) -> Vec<(String, &Predicate)> {
        let mut out = Leaves(Vec::new());
        self.walk(&mut out);
        out.0
    }
}

struct Leaves<'a>(Vec<(String, &'a Predicate)>);

impl<'a> PredicateVisitor<'a> for Leaves<'a> {
    fn visit_leaf(&mut self, path: &str, leaf: &'a Predicate) {
        self.0.push((path.to_string(), leaf));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Paths(Vec<String>);

    impl<'a> PredicateVisitor<'a> for Paths {
        fn visit_leaf(&mut self, path: &str, _leaf: &'a Predicate) {
            self.0.push(path.to_string());
        }
    }

    #[test]
    fn test_walk_stops_at_operators() {
        let p = Predicate::from_json(json!({
            "vehicle_details": {"license_plate_number": {"$regex": "^MH12"}, "color": "red"},
            "severity": {"$gt": 5},
            "tags": ["a", "b"],
            "meta": {}
        }));
        let mut paths = Paths(Vec::new());
        p.walk(&mut paths);
        assert_eq!(
            paths.0,
            vec![
                "vehicle_details.license_plate_number",
                "vehicle_details.color",
                "severity",
                "tags",
                "meta",
            ]
        );
    }

    #[test]
    fn test_leaves_match_walk() {
        let p = Predicate::from_json(json!({"a": {"b": 1, "c": {"$ne": 2}}}));
        let leaves: Vec<String> = p.leaves().into_iter().map(|(k, _)| k).collect();
        assert_eq!(leaves, vec!["a.b", "a.c"]);
    }
}
