//! Decoded map items
//!
//! Only the item kinds that reference DLC-provided content carry fields here;
//! everything else a sector can hold collapses into [`MapItem::Other`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Alphabet of packed SCS tokens, indexed by digit value
const TOKEN_ALPHABET: &[u8; 38] = b"\00123456789abcdefghijklmnopqrstuvwxyz_";

/// Longest token a packed `u64` can hold
pub const TOKEN_MAX_LEN: usize = 12;

/// A unit name as referenced from a map item
///
/// Sector data stores these as packed base-38 integers; dumps and tests
/// usually carry the text form. Both deserialize into the same value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawToken", into = "String")]
pub struct Token(String);

impl Token {
    pub fn new(text: impl Into<String>) -> Self {
        Token(text.into())
    }

    /// Unpack a base-38 token, least significant digit first
    pub fn from_packed(mut value: u64) -> Self {
        let mut text = String::with_capacity(TOKEN_MAX_LEN);
        while value > 0 {
            let digit = (value % 38) as usize;
            // digit 0 is padding and never part of the name
            if digit != 0 {
                text.push(TOKEN_ALPHABET[digit] as char);
            }
            value /= 38;
        }
        Token(text)
    }

    /// Pack into the base-38 form, `None` if the text can't be represented
    pub fn to_packed(&self) -> Option<u64> {
        if self.0.len() > TOKEN_MAX_LEN {
            return None;
        }
        let mut value = 0u64;
        for byte in self.0.bytes().rev() {
            let digit = TOKEN_ALPHABET[1..].iter().position(|&c| c == byte)? as u64 + 1;
            value = value * 38 + digit;
        }
        Some(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Token {
    fn from(text: &str) -> Self {
        Token(text.to_string())
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawToken {
    Text(String),
    Packed(u64),
}

impl From<RawToken> for Token {
    fn from(raw: RawToken) -> Self {
        match raw {
            RawToken::Text(text) => Token(text),
            RawToken::Packed(value) => Token::from_packed(value),
        }
    }
}

/// A decoded map item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapItem {
    Building(Building),
    CityArea(CityArea),
    Curve(Curve),
    FarModel(FarModel),
    Ferry(Ferry),
    Model(Model),
    Mover(Mover),
    Prefab(Prefab),
    Road(Road),
    Sign(Sign),
    /// Any item kind that references no DLC content
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Building {
    pub name: Token,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CityArea {
    pub name: Token,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Curve {
    pub model: Token,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FarModel {
    pub models: Vec<FarModelEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FarModelEntry {
    pub model: Token,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ferry {
    pub port: Token,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub name: Token,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mover {
    pub model: Token,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prefab {
    pub model: Token,
    pub corners: Vec<PrefabCorner>,
    pub semaphore_profile: Token,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefabCorner {
    pub model: Token,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Road {
    pub road_type: Token,
    pub material: Token,
    pub left: RoadSide,
    pub right: RoadSide,
}

/// One side of a road, seen in driving direction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadSide {
    pub sidewalk: Sidewalk,
    pub left_edge: Token,
    pub right_edge: Token,
    pub railings: Vec<Railing>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sidewalk {
    pub material: Token,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Railing {
    pub model: Token,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sign {
    pub model: Token,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_packing() {
        let token = Token::new("pfb_highway");
        let packed = token.to_packed().unwrap();
        assert_eq!(Token::from_packed(packed), token);

        // "a" is digit 11
        assert_eq!(Token::from_packed(11).as_str(), "a");
        assert_eq!(Token::from_packed(0).as_str(), "");
    }

    #[test]
    fn test_token_not_packable() {
        assert!(Token::new("UPPER").to_packed().is_none());
        assert!(Token::new("much_too_long_name").to_packed().is_none());
    }

    #[test]
    fn test_item_from_json() {
        let json = r#"{"type": "prefab", "model": "pfb_highway",
            "corners": [{"model": "bridge01"}], "semaphore_profile": "sem1"}"#;
        let item: MapItem = serde_json::from_str(json).unwrap();
        let MapItem::Prefab(prefab) = item else {
            panic!("expected prefab, got {:?}", item);
        };
        assert_eq!(prefab.model.as_str(), "pfb_highway");
        assert_eq!(prefab.corners.len(), 1);
        assert_eq!(prefab.semaphore_profile.as_str(), "sem1");
    }

    #[test]
    fn test_item_packed_token() {
        let json = r#"{"type": "model", "name": 11}"#;
        let item: MapItem = serde_json::from_str(json).unwrap();
        assert_eq!(item, MapItem::Model(Model { name: "a".into() }));
    }

    #[test]
    fn test_unknown_item_kind() {
        let json = r#"{"type": "trigger"}"#;
        let item: MapItem = serde_json::from_str(json).unwrap();
        assert_eq!(item, MapItem::Other);
    }

    #[test]
    fn test_missing_fields_default_empty() {
        let json = r#"{"type": "road", "road_type": "rd_1"}"#;
        let item: MapItem = serde_json::from_str(json).unwrap();
        let MapItem::Road(road) = item else {
            panic!("expected road");
        };
        assert!(road.material.is_empty());
        assert!(road.left.railings.is_empty());
    }
}
