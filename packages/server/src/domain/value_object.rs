//! Value objects.
//!
//! Identifiers and user-supplied text are validated once, at the boundary,
//! and carried around as these types afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ValueObjectError;

/// Declare a validated string newtype.
///
/// `$max` is the maximum length in characters; `$strict` restricts the value
/// to ASCII alphanumerics plus `-`, `_`, `.` and `@`.
macro_rules! string_value_object {
    ($(#[$meta:meta])* $name:ident, $field:literal, $max:expr, $strict:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(value: String) -> Result<Self, ValueObjectError> {
                let value = value.trim().to_string();
                if value.is_empty() {
                    return Err(ValueObjectError::Empty($field));
                }
                if value.chars().count() > $max {
                    return Err(ValueObjectError::TooLong {
                        field: $field,
                        max: $max,
                    });
                }
                if $strict && !value.chars().all(is_identifier_char) {
                    return Err(ValueObjectError::InvalidCharacters($field));
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValueObjectError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@')
}

string_value_object!(
    /// Room identifier.
    RoomId,
    "room_id",
    64,
    true
);

string_value_object!(
    /// User identifier, issued by the external auth service.
    UserId,
    "user_id",
    64,
    true
);

string_value_object!(
    /// Display name shown to other participants.
    Username,
    "username",
    64,
    false
);

string_value_object!(
    /// Room title.
    RoomTitle,
    "title",
    120,
    false
);

string_value_object!(
    /// Chat message body.
    ChatText,
    "text",
    2000,
    false
);

string_value_object!(
    /// Client-generated stroke identifier.
    StrokeId,
    "stroke_id",
    64,
    true
);

string_value_object!(
    /// Stroke color, e.g. `#ff0000` or `red`.
    Color,
    "color",
    32,
    false
);

/// Factory for server-generated room ids.
pub struct RoomIdFactory;

impl RoomIdFactory {
    pub fn generate() -> Result<RoomId, ValueObjectError> {
        RoomId::new(Uuid::new_v4().to_string())
    }
}

/// Unix timestamp in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Milliseconds elapsed from `earlier` to `self` (zero if `earlier` is later).
    pub fn millis_since(&self, earlier: Timestamp) -> i64 {
        (self.0 - earlier.0).max(0)
    }
}

/// Room-assigned stroke order. Starts at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceNumber(u64);

impl SequenceNumber {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Identifies one transport connection of a participant.
///
/// A participant that reconnects gets a new id, so that late notifications
/// from the superseded socket can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Maximum number of participants in a room. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity(u32);

impl Capacity {
    /// Returns `None` for zero or negative values.
    pub fn new(value: i64) -> Option<Self> {
        if value <= 0 {
            return None;
        }
        u32::try_from(value).ok().map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn admits(&self, current: usize) -> bool {
        current < self.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_rejects_empty_and_whitespace() {
        // テスト項目: 空白のみの UserId は拒否される
        // given (前提条件):
        let value = "   ".to_string();

        // when (操作):
        let result = UserId::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::Empty("user_id")));
    }

    #[test]
    fn test_user_id_rejects_invalid_characters() {
        // テスト項目: 空白や記号を含む UserId は拒否される
        // given (前提条件):
        let value = "alice bob".to_string();

        // when (操作):
        let result = UserId::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::InvalidCharacters("user_id")));
    }

    #[test]
    fn test_username_allows_spaces_and_trims() {
        // テスト項目: Username は空白を許容し、前後の空白を取り除く
        // given (前提条件):
        let value = "  Alice Smith ".to_string();

        // when (操作):
        let username = Username::new(value).unwrap();

        // then (期待する結果):
        assert_eq!(username.as_str(), "Alice Smith");
    }

    #[test]
    fn test_chat_text_length_limit() {
        // テスト項目: ChatText は 2000 文字を超えると拒否される
        // given (前提条件):
        let ok = "あ".repeat(2000);
        let too_long = "あ".repeat(2001);

        // when (操作):
        let ok_result = ChatText::new(ok);
        let err_result = ChatText::new(too_long);

        // then (期待する結果):
        assert!(ok_result.is_ok());
        assert_eq!(
            err_result,
            Err(ValueObjectError::TooLong {
                field: "text",
                max: 2000
            })
        );
    }

    #[test]
    fn test_room_id_factory_generates_valid_unique_ids() {
        // テスト項目: RoomIdFactory が有効で一意な RoomId を生成する
        // given (前提条件):

        // when (操作):
        let first = RoomIdFactory::generate().unwrap();
        let second = RoomIdFactory::generate().unwrap();

        // then (期待する結果):
        assert_ne!(first, second);
        assert_eq!(first.as_str().len(), 36);
    }

    #[test]
    fn test_capacity_rejects_non_positive_values() {
        // テスト項目: 0 以下の定員は作成できない
        // given (前提条件):

        // when (操作):
        let zero = Capacity::new(0);
        let negative = Capacity::new(-3);
        let two = Capacity::new(2).unwrap();

        // then (期待する結果):
        assert!(zero.is_none());
        assert!(negative.is_none());
        assert!(two.admits(1));
        assert!(!two.admits(2));
    }

    #[test]
    fn test_user_id_deserializes_with_validation() {
        // テスト項目: serde 経由でもバリデーションが行われる
        // given (前提条件):
        let valid = "\"alice\"";
        let invalid = "\"\"";

        // when (操作):
        let ok: Result<UserId, _> = serde_json::from_str(valid);
        let err: Result<UserId, _> = serde_json::from_str(invalid);

        // then (期待する結果):
        assert_eq!(ok.unwrap().as_str(), "alice");
        assert!(err.is_err());
    }

    #[test]
    fn test_timestamp_millis_since_never_negative() {
        // テスト項目: millis_since は過去の時刻との差を返し、負にならない
        // given (前提条件):
        let earlier = Timestamp::new(1_000);
        let later = Timestamp::new(1_750);

        // when (操作):

        // then (期待する結果):
        assert_eq!(later.millis_since(earlier), 750);
        assert_eq!(earlier.millis_since(later), 0);
    }
}
