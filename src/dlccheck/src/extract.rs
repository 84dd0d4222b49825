//! Reduce map items to the asset keys they reference
//!
//! Each referenced unit is keyed as `category.token`, which is the same
//! naming the definition files use, so keys can be looked up directly in the
//! [`OriginIndex`](crate::OriginIndex).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::item::{MapItem, RoadSide, Token};

/// Unit categories map items refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    BuildingScheme,
    City,
    Corner,
    Curve,
    FarModel,
    Ferry,
    Model,
    Mover,
    Prefab,
    Railing,
    Road,
    RoadEdge,
    RoadMaterial,
    Sidewalk,
    SemaphoreProfile,
    Sign,
}

impl Category {
    /// Unit name prefix used by the definition files
    pub fn prefix(self) -> &'static str {
        match self {
            Category::BuildingScheme => "bld_scheme",
            Category::City => "city",
            Category::Corner => "corner",
            Category::Curve => "curve",
            Category::FarModel => "far_model",
            Category::Ferry => "ferry",
            Category::Model => "model",
            Category::Mover => "mover",
            Category::Prefab => "prefab",
            Category::Railing => "railing",
            Category::Road => "road",
            Category::RoadEdge => "road_edge",
            Category::RoadMaterial => "road_mat",
            Category::Sidewalk => "sidewalk",
            Category::SemaphoreProfile => "tr_sem_prof",
            Category::Sign => "sign",
        }
    }
}

/// Canonical `category.token` reference to a content unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetKey(String);

impl AssetKey {
    pub fn new(category: Category, token: &Token) -> Self {
        AssetKey(format!("{}.{}", category.prefix(), token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetKey {
    fn from(key: &str) -> Self {
        AssetKey(key.to_string())
    }
}

/// What to do with an item field that holds no token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyTokens {
    /// Drop the reference
    #[default]
    Skip,
    /// Record it as a bare `category.` key
    Emit,
}

/// Every asset key referenced by a map so far
///
/// Only grows; inserting a key twice has no effect.
#[derive(Debug, Clone, Default)]
pub struct FoundAssets {
    keys: HashSet<AssetKey>,
}

impl FoundAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the key was not already present
    pub fn insert(&mut self, key: AssetKey) -> bool {
        self.keys.insert(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(&AssetKey::from(key))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetKey> {
        self.keys.iter()
    }
}

impl Extend<AssetKey> for FoundAssets {
    fn extend<I: IntoIterator<Item = AssetKey>>(&mut self, iter: I) {
        self.keys.extend(iter);
    }
}

/// Applies the per-kind extraction rules to map items
#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor {
    empty_tokens: EmptyTokens,
}

impl Extractor {
    pub fn new(empty_tokens: EmptyTokens) -> Self {
        Self { empty_tokens }
    }

    /// Add every key `item` references to `found`
    pub fn extract(&self, item: &MapItem, found: &mut FoundAssets) {
        let mut add = |category: Category, token: &Token| {
            if token.is_empty() && self.empty_tokens == EmptyTokens::Skip {
                return;
            }
            found.insert(AssetKey::new(category, token));
        };

        match item {
            MapItem::Building(building) => add(Category::BuildingScheme, &building.name),
            MapItem::CityArea(city) => add(Category::City, &city.name),
            MapItem::Curve(curve) => add(Category::Curve, &curve.model),
            MapItem::FarModel(far_model) => {
                for entry in &far_model.models {
                    add(Category::FarModel, &entry.model);
                }
            }
            MapItem::Ferry(ferry) => add(Category::Ferry, &ferry.port),
            MapItem::Model(model) => add(Category::Model, &model.name),
            MapItem::Mover(mover) => add(Category::Mover, &mover.model),
            MapItem::Prefab(prefab) => {
                add(Category::Prefab, &prefab.model);
                for corner in &prefab.corners {
                    add(Category::Corner, &corner.model);
                }
                add(Category::SemaphoreProfile, &prefab.semaphore_profile);
            }
            MapItem::Road(road) => {
                add(Category::Road, &road.road_type);
                add(Category::RoadMaterial, &road.material);
                for side in [&road.left, &road.right] {
                    extract_road_side(side, &mut add);
                }
            }
            MapItem::Sign(sign) => add(Category::Sign, &sign.model),
            MapItem::Other => {}
        }
    }

    /// Keys of a single item, for callers that merge deltas themselves
    pub fn keys_of(&self, item: &MapItem) -> FoundAssets {
        let mut found = FoundAssets::new();
        self.extract(item, &mut found);
        found
    }
}

fn extract_road_side(side: &RoadSide, add: &mut impl FnMut(Category, &Token)) {
    add(Category::Sidewalk, &side.sidewalk.material);
    add(Category::RoadEdge, &side.left_edge);
    add(Category::RoadEdge, &side.right_edge);
    for railing in &side.railings {
        add(Category::Railing, &railing.model);
    }
}
