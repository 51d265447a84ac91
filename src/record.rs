// Record trait for collections persisted as whole JSON arrays

use serde::{Serialize, de::DeserializeOwned};

/// Core trait that any persisted collection element must implement
pub trait Record: Serialize + DeserializeOwned + Clone + 'static {
    /// Unique identifier for this record within its collection
    fn id(&self) -> &str;

    /// Key the whole collection is stored under (e.g., "tasks", "tags")
    fn collection_key() -> &'static str
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct TestRecord {
        id: String,
        name: String,
    }

    impl Record for TestRecord {
        fn id(&self) -> &str {
            &self.id
        }

        fn collection_key() -> &'static str {
            "test"
        }
    }

    #[test]
    fn test_record_trait_implementation() {
        let record = TestRecord {
            id: "test-1".to_string(),
            name: "Test".to_string(),
        };

        assert_eq!(record.id(), "test-1");
        assert_eq!(record.name, "Test");
        assert_eq!(TestRecord::collection_key(), "test");
    }

    #[test]
    fn test_collection_keys_for_models() {
        assert_eq!(crate::models::Task::collection_key(), "tasks");
        assert_eq!(crate::models::Tag::collection_key(), "tags");
    }
}
