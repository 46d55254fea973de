/// Builds a [`Bson`](crate::Bson) value with JSON-like syntax.
///
/// Arrays get the canonical keys `"0"`, `"1"`, ...; objects become embedded
/// documents; any other expression goes through `Bson::from`.
///
/// ```rust
/// use ndbson::{bson, Bson};
///
/// let range = bson!({ "$gt": 5, "$lt": 10.5 });
/// let doc = range.as_document().unwrap();
/// assert_eq!(doc.get("$gt"), Some(&Bson::Int32(5)));
/// assert_eq!(doc.get("$lt"), Some(&Bson::Double(10.5)));
///
/// let tags = bson!(["a", "b", null]);
/// assert_eq!(tags.as_array().map(|a| a.len()), Some(3));
/// ```
#[macro_export]
macro_rules! bson {
    (null) => {
        $crate::Bson::Null
    };

    (true) => {
        $crate::Bson::Bool(true)
    };

    (false) => {
        $crate::Bson::Bool(false)
    };

    ([]) => {
        $crate::Bson::array(::std::vec::Vec::new())
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Bson::array(vec![$($crate::bson!($elem)),*])
    };

    ({}) => {
        $crate::Bson::SubDocument($crate::Document::new())
    };

    ({ $($key:literal : $value:tt),* $(,)? }) => {
        $crate::Bson::SubDocument($crate::doc! { $($key : $value),* })
    };

    ($e:expr) => {
        $crate::Bson::from($e)
    };
}

/// Builds a top-level [`Document`](crate::Document).
///
/// ```rust
/// use ndbson::{doc, Bson};
///
/// let query = doc! { "name": "sensor", "gain": { "$gte": 0.5 } };
/// assert_eq!(query.len(), 2);
/// assert_eq!(query.get("name"), Some(&Bson::from("sensor")));
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Document::new()
    };

    ( $($key:literal : $value:tt),* $(,)? ) => {{
        let mut document = $crate::Document::new();
        $(
            document.insert($key, $crate::bson!($value));
        )*
        document
    }};
}

#[cfg(test)]
mod tests {
    use crate::{Bson, Document};

    #[test]
    fn test_bson_macro_primitives() {
        assert_eq!(bson!(null), Bson::Null);
        assert_eq!(bson!(true), Bson::Bool(true));
        assert_eq!(bson!(false), Bson::Bool(false));
        assert_eq!(bson!(42), Bson::Int32(42));
        assert_eq!(bson!(42i64), Bson::Int64(42));
        assert_eq!(bson!(3.5), Bson::Double(3.5));
        assert_eq!(bson!("hello"), Bson::Str("hello".to_string()));
    }

    #[test]
    fn test_bson_macro_arrays() {
        assert_eq!(bson!([]), Bson::SubArray(Document::new()));

        let arr = bson!([1, 2, 3]);
        let doc = arr.as_array().unwrap();
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["0", "1", "2"]);
        assert_eq!(doc.get("2"), Some(&Bson::Int32(3)));
    }

    #[test]
    fn test_doc_macro_nesting() {
        assert_eq!(doc! {}, Document::new());

        let d = doc! {
            "name": "Alice",
            "scores": [1.5, 2.5],
            "meta": { "active": true }
        };
        assert_eq!(d.len(), 3);
        assert_eq!(d.get("name"), Some(&Bson::Str("Alice".to_string())));
        assert!(d.get("scores").and_then(Bson::as_array).is_some());
        let meta = d.get("meta").and_then(Bson::as_document).unwrap();
        assert_eq!(meta.get("active"), Some(&Bson::Bool(true)));
    }
}
