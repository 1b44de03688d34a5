use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Allocate a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Opaque identifier of a user.
    UserId
);
string_id!(
    /// Opaque identifier of a group.
    GroupId
);
string_id!(
    /// Opaque identifier of an expense.
    ExpenseId
);
string_id!(
    /// Opaque identifier of a friendship link.
    FriendshipId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(UserId::generate(), UserId::generate());
    }

    #[test]
    fn ids_order_lexicographically() {
        let mut ids = vec![UserId::from("carol"), UserId::from("alice"), UserId::from("bob")];
        ids.sort();
        let names: Vec<_> = ids.iter().map(UserId::as_str).collect();
        assert_eq!(names, ["alice", "bob", "carol"]);
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&GroupId::from("trip")).unwrap();
        assert_eq!(json, "\"trip\"");
    }
}
