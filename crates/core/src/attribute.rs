//! The fixed set of annotated attributes and the regions cropped from each capture.
//!
//! Both sets are closed enumerations. Anything that needs to pick a counter
//! pair, a database column or a stored image for one of them goes through an
//! exhaustive `match` here, so adding a variant is a compile error everywhere
//! it is not handled.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Attribute
// ---------------------------------------------------------------------------

/// A binary property humans vote on for every picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Attribute {
    /// Water is present in the water bowl.
    Water,
    /// Food is present in the food bowl.
    Food,
    /// A cat is at the feeding station.
    Cat,
}

const VALID_ATTRIBUTE_STRINGS: &[&str] = &["water", "food", "cat"];

impl Attribute {
    /// Every attribute, in storage order.
    pub const ALL: [Attribute; 3] = [Attribute::Water, Attribute::Food, Attribute::Cat];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Food => "food",
            Self::Cat => "cat",
        }
    }

    /// Name of the derived consensus label for this attribute.
    pub fn label_name(&self) -> &'static str {
        match self {
            Self::Water => "water_in_bowl",
            Self::Food => "food_in_bowl",
            Self::Cat => "cat_at_bowl",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attribute {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "water" => Ok(Self::Water),
            "food" => Ok(Self::Food),
            "cat" => Ok(Self::Cat),
            _ => Err(CoreError::Validation(format!(
                "Invalid attribute '{s}'. Must be one of: {}",
                VALID_ATTRIBUTE_STRINGS.join(", ")
            ))),
        }
    }
}

impl TryFrom<String> for Attribute {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ---------------------------------------------------------------------------
// Picture type (region of interest)
// ---------------------------------------------------------------------------

/// A rectangular crop window, `y`/`x` of the top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub y: u32,
    pub x: u32,
    pub height: u32,
    pub width: u32,
}

/// Food bowl region of a full station capture.
pub const FOOD_BOWL_CROP_WINDOW: CropWindow = CropWindow {
    y: 250,
    x: 450,
    height: 700,
    width: 700,
};

/// Water bowl region of a full station capture.
pub const WATER_BOWL_CROP_WINDOW: CropWindow = CropWindow {
    y: 600,
    x: 1200,
    height: 700,
    width: 700,
};

/// Which stored crop of a capture an operation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum PictureType {
    #[default]
    WaterBowl,
    FoodBowl,
}

const VALID_PICTURE_TYPE_STRINGS: &[&str] = &["water_bowl", "food_bowl"];

impl PictureType {
    /// Every region, in the order crops are produced on upload.
    pub const ALL: [PictureType; 2] = [PictureType::WaterBowl, PictureType::FoodBowl];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WaterBowl => "water_bowl",
            Self::FoodBowl => "food_bowl",
        }
    }

    /// Attribute naturally judged from this crop.
    pub fn default_attribute(&self) -> Attribute {
        match self {
            Self::WaterBowl => Attribute::Water,
            Self::FoodBowl => Attribute::Food,
        }
    }

    pub fn crop_window(&self) -> CropWindow {
        match self {
            Self::WaterBowl => WATER_BOWL_CROP_WINDOW,
            Self::FoodBowl => FOOD_BOWL_CROP_WINDOW,
        }
    }

    /// Filename prefix for stored crops of this region.
    pub fn file_prefix(&self) -> &'static str {
        match self {
            Self::WaterBowl => "water",
            Self::FoodBowl => "food",
        }
    }
}

impl fmt::Display for PictureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PictureType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "water_bowl" => Ok(Self::WaterBowl),
            "food_bowl" => Ok(Self::FoodBowl),
            _ => Err(CoreError::Validation(format!(
                "Invalid picture type '{s}'. Must be one of: {}",
                VALID_PICTURE_TYPE_STRINGS.join(", ")
            ))),
        }
    }
}

impl TryFrom<String> for PictureType {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
