//! Address value records.
//!
//! An [`AddressData`] is a plain value: two records with the same field values
//! are the same address. Identity only exists once a record is placed into an
//! address book and becomes an [`Address`] with an [`AddressId`].

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::types::AddressId;

/// Which default pointer an operation affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    /// Address used for invoicing.
    Billing,
    /// Address goods are delivered to.
    Shipping,
}

impl AddressType {
    /// All address types, in a stable order.
    pub const ALL: [Self; 2] = [Self::Billing, Self::Shipping];

    /// Get the string form used in storage and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Billing => "billing",
            Self::Shipping => "shipping",
        }
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`AddressType`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid address type: {0}")]
pub struct AddressTypeError(String);

impl std::str::FromStr for AddressType {
    type Err = AddressTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "billing" => Ok(Self::Billing),
            "shipping" => Ok(Self::Shipping),
            _ => Err(AddressTypeError(s.to_owned())),
        }
    }
}

/// The value fields of a postal address.
///
/// Empty strings mean "not provided". Equality and hashing cover every field,
/// which is what address books use to deduplicate entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressData {
    /// Recipient first name.
    pub first_name: String,
    /// Recipient last name.
    pub last_name: String,
    /// Company name.
    pub company_name: String,
    /// First street line.
    pub street_address_1: String,
    /// Second street line (apartment, suite, unit).
    pub street_address_2: String,
    /// City.
    pub city: String,
    /// District or neighbourhood within the city.
    pub city_area: String,
    /// Postal or ZIP code.
    pub postal_code: String,
    /// Country code (ISO 3166-1 alpha-2).
    pub country: String,
    /// State, province or region.
    pub country_area: String,
    /// Phone number.
    pub phone: String,
}

impl AddressData {
    /// Return a copy with surrounding whitespace trimmed from every field and
    /// the country code upper-cased.
    ///
    /// Address books store normalized records so that cosmetic differences in
    /// input do not produce duplicate entries.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            first_name: trimmed(self.first_name),
            last_name: trimmed(self.last_name),
            company_name: trimmed(self.company_name),
            street_address_1: trimmed(self.street_address_1),
            street_address_2: trimmed(self.street_address_2),
            city: trimmed(self.city),
            city_area: trimmed(self.city_area),
            postal_code: trimmed(self.postal_code),
            country: self.country.trim().to_ascii_uppercase(),
            country_area: trimmed(self.country_area),
            phone: trimmed(self.phone),
        }
    }

    /// Return a copy with personal fields masked.
    ///
    /// Names, company, street lines and phone keep the first character of each
    /// word and replace the rest with `.`. City, postal code and country are
    /// left intact so shipping zones still resolve. Masking an already masked
    /// record returns it unchanged.
    #[must_use]
    pub fn obfuscated(&self) -> Self {
        Self {
            first_name: mask_words(&self.first_name),
            last_name: mask_words(&self.last_name),
            company_name: mask_words(&self.company_name),
            street_address_1: mask_words(&self.street_address_1),
            street_address_2: mask_words(&self.street_address_2),
            phone: mask_words(&self.phone),
            ..self.clone()
        }
    }

    /// Full recipient name, or `None` if both name fields are empty.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (true, true) => None,
            (false, true) => Some(self.first_name.clone()),
            (true, false) => Some(self.last_name.clone()),
            (false, false) => Some(format!("{} {}", self.first_name, self.last_name)),
        }
    }
}

/// An address stored in a user's address book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Identity within the address book.
    pub id: AddressId,
    /// The address value.
    #[serde(flatten)]
    pub data: AddressData,
}

impl Address {
    /// Create a new address record.
    #[must_use]
    pub const fn new(id: AddressId, data: AddressData) -> Self {
        Self { id, data }
    }
}

fn trimmed(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.len() == value.len() {
        value
    } else {
        trimmed.to_owned()
    }
}

fn mask_words(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                let mut masked = String::with_capacity(word.len());
                masked.push(first);
                masked.extend(chars.map(|_| '.'));
                masked
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> AddressData {
        AddressData {
            first_name: "Ada".to_owned(),
            last_name: "Lovelace".to_owned(),
            street_address_1: "12 Main St".to_owned(),
            city: "London".to_owned(),
            postal_code: "N1 9GU".to_owned(),
            country: "GB".to_owned(),
            phone: "+44 20 7946 0958".to_owned(),
            ..AddressData::default()
        }
    }

    #[test]
    fn test_address_type_round_trip_str() {
        for address_type in AddressType::ALL {
            let parsed: AddressType = address_type.to_string().parse().unwrap();
            assert_eq!(parsed, address_type);
        }
        assert_eq!("SHIPPING".parse::<AddressType>().unwrap(), AddressType::Shipping);
        assert!("home".parse::<AddressType>().is_err());
    }

    #[test]
    fn test_address_type_serde() {
        let json = serde_json::to_string(&AddressType::Billing).unwrap();
        assert_eq!(json, "\"billing\"");
    }

    #[test]
    fn test_normalized_trims_and_uppercases_country() {
        let raw = AddressData {
            street_address_1: "  12 Main St ".to_owned(),
            country: " gb".to_owned(),
            ..sample()
        };
        let normalized = raw.normalized();
        assert_eq!(normalized.street_address_1, "12 Main St");
        assert_eq!(normalized.country, "GB");
        assert_eq!(normalized, sample());
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(sample(), sample());
        let other = AddressData {
            city: "Leeds".to_owned(),
            ..sample()
        };
        assert_ne!(sample(), other);
    }

    #[test]
    fn test_obfuscated_masks_personal_fields() {
        let masked = sample().obfuscated();
        assert_eq!(masked.first_name, "A..");
        assert_eq!(masked.last_name, "L.......");
        assert_eq!(masked.street_address_1, "1. M... S.");
        assert_eq!(masked.phone, "+.. 2. 7... 0...");
    }

    #[test]
    fn test_obfuscated_keeps_location_fields() {
        let masked = sample().obfuscated();
        assert_eq!(masked.city, "London");
        assert_eq!(masked.postal_code, "N1 9GU");
        assert_eq!(masked.country, "GB");
    }

    #[test]
    fn test_obfuscated_is_idempotent() {
        let once = sample().obfuscated();
        assert_eq!(once.obfuscated(), once);
    }

    #[test]
    fn test_full_name() {
        assert_eq!(sample().full_name().as_deref(), Some("Ada Lovelace"));
        assert_eq!(AddressData::default().full_name(), None);
    }

    #[test]
    fn test_address_serializes_flat() {
        let address = Address::new(AddressId::generate(), sample());
        let value = serde_json::to_value(&address).unwrap();
        assert_eq!(value["city"], "London");
        assert!(value.get("data").is_none());
    }
}
