//! Catalog items: the five kinds of thing a rating can be about.
//!
//! Each item type has its own attribute set and a natural key that must be
//! unique within the type. Attributes are stored as a JSON payload next to
//! the type tag, the same way [`ItemValue::to_json`] and
//! [`ItemValue::from_parts`] split and rejoin them.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{Error, Result};

// ─── Identity ────────────────────────────────────────────────────────────────

/// The closed set of catalog item types. The kebab-case form is the wire tag.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ItemType {
  Cheese,
  Wine,
  Gin,
  Coffee,
  ChiliSauce,
}

impl ItemType {
  /// Parse a wire tag, rejecting anything outside the closed set.
  pub fn parse(tag: &str) -> Result<Self> {
    Self::from_str(tag).map_err(|_| Error::UnknownItemType(tag.to_owned()))
  }

  pub fn as_str(self) -> &'static str { self.into() }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl fmt::Display for ItemId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// A typed reference to a catalog item: the pair that ratings point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
  pub item_type: ItemType,
  pub item_id:   ItemId,
}

impl ItemRef {
  pub fn new(item_type: ItemType, item_id: i64) -> Self {
    Self { item_type, item_id: ItemId(item_id) }
  }
}

impl fmt::Display for ItemRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.item_type, self.item_id)
  }
}

// ─── Attribute enums ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WineColor {
  Rouge,
  Blanc,
  #[serde(rename = "Rosé")]
  Rose,
  Mousseux,
  Orange,
}

impl WineColor {
  fn as_str(self) -> &'static str {
    match self {
      Self::Rouge => "Rouge",
      Self::Blanc => "Blanc",
      Self::Rose => "Rosé",
      Self::Mousseux => "Mousseux",
      Self::Orange => "Orange",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpiceLevel {
  Mild,
  Medium,
  Hot,
  #[serde(rename = "Extra Hot")]
  ExtraHot,
  Extreme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoffeeSpecies {
  Arabica,
  Robusta,
  #[serde(rename = "Libérica")]
  Liberica,
  Excelsa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingMethod {
  #[serde(rename = "Lavé")]
  Washed,
  Nature,
  Honey,
  #[serde(rename = "Anaérobie")]
  Anaerobic,
  #[serde(rename = "Macération Carbonique")]
  CarbonicMaceration,
  #[serde(rename = "Décortiqué Humide")]
  WetHulled,
  #[serde(rename = "Nature Dépulpé")]
  PulpedNatural,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoastLevel {
  #[serde(rename = "Pâle")]
  Light,
  #[serde(rename = "Moyen")]
  Medium,
  #[serde(rename = "Foncé")]
  Dark,
}

/// Shared scale for coffee acidity, body and sweetness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intensity {
  #[serde(rename = "Faible")]
  Low,
  #[serde(rename = "Moyen")]
  Medium,
  #[serde(rename = "Élevé")]
  High,
}

// ─── Per-type attributes ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cheese {
  pub name:        String,
  #[serde(rename = "type")]
  pub kind:        String,
  #[serde(default)]
  pub origin:      Option<String>,
  #[serde(default)]
  pub producer:    Option<String>,
  #[serde(default)]
  pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wine {
  pub name:        String,
  #[serde(default)]
  pub producer:    Option<String>,
  pub country:     String,
  #[serde(default)]
  pub region:      Option<String>,
  pub color:       WineColor,
  #[serde(default)]
  pub grape:       Option<String>,
  /// Percent by volume.
  #[serde(default)]
  pub alcohol:     Option<f32>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub designation: Option<String>,
  /// Residual sugar in g/L.
  #[serde(default)]
  pub sugar:       Option<f32>,
  #[serde(default)]
  pub organic:     bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gin {
  pub name:        String,
  pub producer:    String,
  #[serde(default)]
  pub origin:      Option<String>,
  pub profile:     String,
  #[serde(default)]
  pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coffee {
  pub name:              String,
  pub roaster:           String,
  #[serde(default)]
  pub country:           Option<String>,
  #[serde(default)]
  pub region:            Option<String>,
  #[serde(default)]
  pub farm:              Option<String>,
  /// Metres above sea level.
  #[serde(default)]
  pub altitude:          Option<i32>,
  #[serde(default)]
  pub species:           Option<CoffeeSpecies>,
  #[serde(default)]
  pub variety:           Option<String>,
  #[serde(default)]
  pub processing_method: Option<ProcessingMethod>,
  #[serde(default)]
  pub decaffeinated:     bool,
  #[serde(default)]
  pub roast_level:       Option<RoastLevel>,
  #[serde(default)]
  pub tasting_notes:     Vec<String>,
  #[serde(default)]
  pub acidity:           Option<Intensity>,
  #[serde(default)]
  pub body:              Option<Intensity>,
  #[serde(default)]
  pub sweetness:         Option<Intensity>,
  #[serde(default)]
  pub organic:           bool,
  #[serde(default)]
  pub fair_trade:        bool,
  #[serde(default)]
  pub description:       Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChiliSauce {
  pub name:        String,
  pub brand:       String,
  pub spice_level: SpiceLevel,
  #[serde(default)]
  pub chilis:      Option<String>,
  #[serde(default)]
  pub description: Option<String>,
}

// ─── ItemValue ───────────────────────────────────────────────────────────────

/// The attributes of one catalog item, tagged with its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "item_type", content = "data", rename_all = "kebab-case")]
pub enum ItemValue {
  Cheese(Cheese),
  Wine(Wine),
  Gin(Gin),
  Coffee(Coffee),
  ChiliSauce(ChiliSauce),
}

impl ItemValue {
  pub fn item_type(&self) -> ItemType {
    match self {
      Self::Cheese(_) => ItemType::Cheese,
      Self::Wine(_) => ItemType::Wine,
      Self::Gin(_) => ItemType::Gin,
      Self::Coffee(_) => ItemType::Coffee,
      Self::ChiliSauce(_) => ItemType::ChiliSauce,
    }
  }

  pub fn name(&self) -> &str {
    match self {
      Self::Cheese(v) => &v.name,
      Self::Wine(v) => &v.name,
      Self::Gin(v) => &v.name,
      Self::Coffee(v) => &v.name,
      Self::ChiliSauce(v) => &v.name,
    }
  }

  /// The per-type uniqueness key. Components are trimmed and joined with a
  /// unit separator so no attribute value can forge a collision.
  pub fn natural_key(&self) -> String {
    let join = |a: &str, b: &str| format!("{}\u{1f}{}", a.trim(), b.trim());
    match self {
      Self::Cheese(v) => v.name.trim().to_owned(),
      Self::Wine(v) => join(&v.name, v.color.as_str()),
      Self::Gin(v) => join(&v.name, &v.producer),
      Self::Coffee(v) => join(&v.name, &v.roaster),
      Self::ChiliSauce(v) => join(&v.name, &v.brand),
    }
  }

  /// Required text attributes must be non-blank.
  pub fn validate(&self) -> Result<()> {
    let required: Vec<(&str, &str)> = match self {
      Self::Cheese(v) => vec![("name", v.name.as_str()), ("type", v.kind.as_str())],
      Self::Wine(v) => vec![("name", v.name.as_str()), ("country", v.country.as_str())],
      Self::Gin(v) => vec![
        ("name", v.name.as_str()),
        ("producer", v.producer.as_str()),
        ("profile", v.profile.as_str()),
      ],
      Self::Coffee(v) => vec![("name", v.name.as_str()), ("roaster", v.roaster.as_str())],
      Self::ChiliSauce(v) => vec![("name", v.name.as_str()), ("brand", v.brand.as_str())],
    };
    match required.iter().find(|(_, value)| value.trim().is_empty()) {
      Some((field, _)) => Err(Error::validation(format!(
        "{} requires a non-empty {field}",
        self.item_type()
      ))),
      None => Ok(()),
    }
  }

  /// Serialise the inner attributes (without the type tag) for storage.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(full.get("data").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Rebuild from a stored type tag and attribute payload.
  pub fn from_parts(item_type: ItemType, data: serde_json::Value) -> Result<Self> {
    let wrapped = serde_json::json!({ "item_type": item_type, "data": data });
    Ok(serde_json::from_value(wrapped)?)
  }

  /// Like [`Self::from_parts`] but for client input: malformed attributes are
  /// a validation failure rather than an internal one.
  pub fn parse(item_type: ItemType, data: serde_json::Value) -> Result<Self> {
    let value = Self::from_parts(item_type, data).map_err(|e| match e {
      Error::Serialization(e) => {
        Error::validation(format!("invalid {item_type} attributes: {e}"))
      }
      other => other,
    })?;
    value.validate()?;
    Ok(value)
  }
}

// ─── Item ────────────────────────────────────────────────────────────────────

/// A stored catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
  pub id:         ItemId,
  #[serde(flatten)]
  pub value:      ItemValue,
  /// Reference produced by the external image pipeline, if any.
  pub image_url:  Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Item {
  pub fn item_ref(&self) -> ItemRef {
    ItemRef { item_type: self.value.item_type(), item_id: self.id }
  }
}
