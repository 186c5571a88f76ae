//! Serialization for cards: always the scanner token string.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::cards_types::Card;

impl Serialize for Card {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<Card>()
            .map_err(|_| serde::de::Error::custom(format!("Invalid card token: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cards_serialize_as_tokens() {
        let cards: Vec<Card> = serde_json::from_str(r#"["1AC","6KD"]"#).unwrap();
        assert_eq!(serde_json::to_string(&cards).unwrap(), r#"["1AC","6KD"]"#);
    }

    #[test]
    fn invalid_token_fails_to_deserialize() {
        assert!(serde_json::from_str::<Card>(r#""1XC""#).is_err());
    }
}
