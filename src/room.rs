use mongodb::bson::oid::ObjectId;
use sha2::{Digest, Sha256};

/// Canonical ordering for a user pair. Both the chat room key and the
/// conversation document rely on this so (A,B) and (B,A) are the same pair.
pub fn sort_pair(a: ObjectId, b: ObjectId) -> (ObjectId, ObjectId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Broadcast-room key for a pair of users: the sorted hex ids joined with
/// "$" and hashed. A routing key, not a security boundary.
pub fn room_id(a: ObjectId, b: ObjectId) -> String {
    let (first, second) = sort_pair(a, b);
    let digest = Sha256::digest(format!("{}${}", first.to_hex(), second.to_hex()));

    format!("{:x}", digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_in_argument_order() {
        let a = ObjectId::new();
        let b = ObjectId::new();

        assert_eq!(room_id(a, b), room_id(b, a));
        assert_eq!(sort_pair(a, b), sort_pair(b, a));
    }

    #[test]
    fn deterministic_across_calls() {
        let a = ObjectId::new();
        let b = ObjectId::new();

        assert_eq!(room_id(a, b), room_id(a, b));
    }

    #[test]
    fn distinct_pairs_get_distinct_rooms() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let c = ObjectId::new();

        assert_ne!(room_id(a, b), room_id(a, c));
    }

    #[test]
    fn fixed_length_hex_output() {
        let id = room_id(ObjectId::new(), ObjectId::new());

        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
