use std::str::FromStr;

use thiserror::Error;

use crate::map::CustomProperties;

use super::entity::Material;

pub const LIGHT_BRIGHTNESS: &str = "LIGHTBRIGHTNESS";
pub const LIGHT_COLOR: &str = "LIGHTCOLOR";
pub const SPRITESHEET_NAME: &str = "SPRITESHEETNAME";
pub const MATERIAL: &str = "MATERIAL";
pub const INDESTRUCTIBLE: &str = "INDESTRUCTIBLE";
pub const HEALTH: &str = "HEALTH";
pub const COLLISION: &str = "COLLISION";
pub const COLLISION_BOX_WIDTH_FACTOR: &str = "COLLISIONBOXWIDTHFACTOR";
pub const COLLISION_BOX_HEIGHT_FACTOR: &str = "COLLISIONBOXHEIGHTFACTOR";
pub const TEAM: &str = "TEAM";
pub const MOB_TYPE: &str = "MOBTYPE";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    #[error("missing required property {name}")]
    Missing { name: String },
    #[error("property {name} has invalid value '{value}'; expected {expected}")]
    Invalid {
        name: String,
        value: String,
        expected: &'static str,
    },
}

/// Typed view over an object's custom properties. Blank values count as absent.
#[derive(Debug, Clone, Copy)]
pub struct PropertyReader<'a> {
    properties: &'a CustomProperties,
}

impl<'a> PropertyReader<'a> {
    pub fn new(properties: &'a CustomProperties) -> Self {
        Self { properties }
    }

    pub fn text(&self, name: &str) -> Option<&'a str> {
        self.properties
            .get(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn has(&self, name: &str) -> bool {
        self.text(name).is_some()
    }

    pub fn required_text(&self, name: &str) -> Result<&'a str, PropertyError> {
        self.text(name).ok_or_else(|| PropertyError::Missing {
            name: name.to_string(),
        })
    }

    pub fn i32(&self, name: &str) -> Result<Option<i32>, PropertyError> {
        self.parsed(name, "an integer")
    }

    pub fn u32(&self, name: &str) -> Result<Option<u32>, PropertyError> {
        self.parsed(name, "a non-negative integer")
    }

    pub fn u8(&self, name: &str) -> Result<Option<u8>, PropertyError> {
        self.parsed(name, "an integer between 0 and 255")
    }

    pub fn f32(&self, name: &str) -> Result<Option<f32>, PropertyError> {
        match self.parsed::<f32>(name, "a finite number")? {
            Some(value) if !value.is_finite() => Err(self.invalid(name, "a finite number")),
            other => Ok(other),
        }
    }

    /// `true` (any case) is true; every other value is false.
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.text(name)
            .map(|value| value.eq_ignore_ascii_case("true"))
    }

    pub fn required_bool(&self, name: &str) -> Result<bool, PropertyError> {
        self.bool(name).ok_or_else(|| PropertyError::Missing {
            name: name.to_string(),
        })
    }

    /// Accepts `#RRGGBB`, `0xRRGGBB` and plain decimal.
    pub fn rgb(&self, name: &str) -> Result<Option<u32>, PropertyError> {
        let Some(value) = self.text(name) else {
            return Ok(None);
        };
        let parsed = if let Some(hex) = value.strip_prefix('#') {
            u32::from_str_radix(hex, 16).ok()
        } else if let Some(hex) = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
        {
            u32::from_str_radix(hex, 16).ok()
        } else {
            value.parse::<u32>().ok()
        };
        match parsed {
            Some(rgb) if rgb <= 0xFF_FF_FF => Ok(Some(rgb)),
            _ => Err(self.invalid(name, "an RGB color like #RRGGBB")),
        }
    }

    pub fn material(&self, name: &str) -> Result<Option<Material>, PropertyError> {
        self.parsed(name, "a material name")
    }

    fn parsed<T: FromStr>(
        &self,
        name: &str,
        expected: &'static str,
    ) -> Result<Option<T>, PropertyError> {
        match self.text(name) {
            None => Ok(None),
            Some(value) => value
                .parse::<T>()
                .map(Some)
                .map_err(|_| self.invalid(name, expected)),
        }
    }

    fn invalid(&self, name: &str, expected: &'static str) -> PropertyError {
        PropertyError::Invalid {
            name: name.to_string(),
            value: self.properties.get(name).unwrap_or_default().to_string(),
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties_of(pairs: &[(&str, &str)]) -> CustomProperties {
        pairs.iter().copied().collect()
    }

    #[test]
    fn blank_values_are_absent() {
        let properties = properties_of(&[(HEALTH, "  "), (TEAM, "2")]);
        let reader = PropertyReader::new(&properties);
        assert_eq!(reader.i32(HEALTH), Ok(None));
        assert_eq!(reader.i32(TEAM), Ok(Some(2)));
        assert_eq!(
            reader.required_text(HEALTH),
            Err(PropertyError::Missing {
                name: HEALTH.to_string()
            })
        );
    }

    #[test]
    fn malformed_numbers_report_value() {
        let properties = properties_of(&[(HEALTH, "lots"), (COLLISION_BOX_WIDTH_FACTOR, "NaN")]);
        let reader = PropertyReader::new(&properties);
        assert!(matches!(
            reader.u32(HEALTH),
            Err(PropertyError::Invalid { ref value, .. }) if value == "lots"
        ));
        assert!(reader.f32(COLLISION_BOX_WIDTH_FACTOR).is_err());
    }

    #[test]
    fn bools_follow_true_only_rule() {
        let properties = properties_of(&[(COLLISION, "TRUE"), (INDESTRUCTIBLE, "yes")]);
        let reader = PropertyReader::new(&properties);
        assert_eq!(reader.bool(COLLISION), Some(true));
        assert_eq!(reader.bool(INDESTRUCTIBLE), Some(false));
        assert_eq!(reader.bool(TEAM), None);
    }

    #[test]
    fn colors_accept_hex_and_decimal() {
        let properties = properties_of(&[
            ("A", "#ff8000"),
            ("B", "0x00FF00"),
            ("C", "255"),
            ("D", "#1000000"),
            ("E", "red"),
        ]);
        let reader = PropertyReader::new(&properties);
        assert_eq!(reader.rgb("A"), Ok(Some(0xff8000)));
        assert_eq!(reader.rgb("B"), Ok(Some(0x00ff00)));
        assert_eq!(reader.rgb("C"), Ok(Some(255)));
        assert!(reader.rgb("D").is_err());
        assert!(reader.rgb("E").is_err());
        assert_eq!(reader.rgb("F"), Ok(None));
    }

    #[test]
    fn material_lookup() {
        let properties = properties_of(&[(MATERIAL, "metal")]);
        let reader = PropertyReader::new(&properties);
        assert_eq!(reader.material(MATERIAL), Ok(Some(Material::Metal)));
    }
}
