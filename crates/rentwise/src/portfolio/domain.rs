use serde::{Deserialize, Serialize};

use crate::money::Cents;
use crate::workflows::leasing::document::DocumentId;
use crate::workflows::leasing::jurisdiction::StateCode;

string_id!(LandlordId);
string_id!(PropertyId);
string_id!(UnitId);
string_id!(TenantId);

/// Account owner managing one or more properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Landlord {
    pub id: LandlordId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

impl Landlord {
    /// Name used on lease documents: the company when present, else the individual.
    pub fn display_name(&self) -> &str {
        self.company_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: StateCode,
    pub postal_code: String,
}

impl Address {
    pub fn one_line(&self) -> String {
        match &self.line2 {
            Some(line2) => format!(
                "{}, {}, {}, {} {}",
                self.line1, line2, self.city, self.state, self.postal_code
            ),
            None => format!(
                "{}, {}, {} {}",
                self.line1, self.city, self.state, self.postal_code
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub landlord_id: LandlordId,
    pub name: String,
    pub address: Address,
    pub year_built: Option<u16>,
    #[serde(default)]
    pub flood_zone: bool,
    #[serde(default)]
    pub shared_utilities: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_lease_document: Option<DocumentId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Vacant,
    Reserved,
    Occupied,
    Offline,
}

impl UnitStatus {
    pub const fn label(self) -> &'static str {
        match self {
            UnitStatus::Vacant => "vacant",
            UnitStatus::Reserved => "reserved",
            UnitStatus::Occupied => "occupied",
            UnitStatus::Offline => "offline",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub property_id: PropertyId,
    pub label: String,
    pub bedrooms: u8,
    pub bathrooms: f32,
    pub market_rent: Cents,
    pub status: UnitStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub full_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Payloads accepted when registering portfolio records; ids are assigned by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLandlord {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProperty {
    pub landlord_id: LandlordId,
    pub name: String,
    pub address: Address,
    #[serde(default)]
    pub year_built: Option<u16>,
    #[serde(default)]
    pub flood_zone: bool,
    #[serde(default)]
    pub shared_utilities: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUnit {
    pub property_id: PropertyId,
    pub label: String,
    pub bedrooms: u8,
    pub bathrooms: f32,
    pub market_rent: Cents,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTenant {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}
