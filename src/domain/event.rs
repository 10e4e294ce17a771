use crate::error::{RegistrationError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Catalog shipped with the binary, used when no catalog file is configured.
pub const BUNDLED_CATALOG: &str = include_str!("../../assets/events.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinators {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faculty: Option<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student: Option<Contact>,
}

/// An immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    pub department: String,
    pub max_team_size: u32,
    /// Per-participant fee in major currency units.
    #[serde(with = "rust_decimal::serde::float")]
    pub entry_fee: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinators: Option<Coordinators>,
}

impl Event {
    /// Team size must lie in `[1, max_team_size]`.
    pub fn check_team_size(&self, team_size: u32) -> Result<()> {
        if (1..=self.max_team_size).contains(&team_size) {
            Ok(())
        } else {
            Err(RegistrationError::ValidationError(format!(
                "Team size {team_size} is not allowed for {}: expected 1 to {}",
                self.id, self.max_team_size
            )))
        }
    }
}

/// Total fee for a team, in major currency units.
///
/// Shared by order creation and registration validation so both sides agree
/// on what a team owes.
pub fn compute_fee(event: &Event, team_size: u32) -> Result<Decimal> {
    event.check_team_size(team_size)?;
    Ok(event.entry_fee * Decimal::from(team_size))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub name: String,
    pub events: Vec<Event>,
}

#[derive(Deserialize)]
struct CatalogFile {
    departments: Vec<Department>,
}

/// Read-only event lookup, built once at startup.
#[derive(Debug, Clone)]
pub struct EventCatalog {
    departments: Vec<Department>,
    index: HashMap<String, (usize, usize)>,
}

impl EventCatalog {
    pub fn new(departments: Vec<Department>) -> Result<Self> {
        let mut index = HashMap::new();
        for (d, department) in departments.iter().enumerate() {
            for (e, event) in department.events.iter().enumerate() {
                if event.id.trim().is_empty() {
                    return Err(RegistrationError::CatalogError(format!(
                        "Event with empty id in department {}",
                        department.id
                    )));
                }
                if event.max_team_size == 0 {
                    return Err(RegistrationError::CatalogError(format!(
                        "Event {} has a maximum team size of 0",
                        event.id
                    )));
                }
                if event.entry_fee.is_sign_negative() {
                    return Err(RegistrationError::CatalogError(format!(
                        "Event {} has a negative entry fee",
                        event.id
                    )));
                }
                if index.insert(event.id.clone(), (d, e)).is_some() {
                    return Err(RegistrationError::CatalogError(format!(
                        "Duplicate event id {}",
                        event.id
                    )));
                }
            }
        }
        Ok(Self { departments, index })
    }

    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_CATALOG)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| RegistrationError::CatalogError(format!("Invalid catalog: {e}")))?;
        Self::new(file.departments)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn get(&self, event_id: &str) -> Option<&Event> {
        self.index
            .get(event_id)
            .map(|&(d, e)| &self.departments[d].events[e])
    }

    /// Like [`get`](Self::get), but an unknown id is a validation failure.
    pub fn require(&self, event_id: &str) -> Result<&Event> {
        self.get(event_id).ok_or_else(|| {
            RegistrationError::ValidationError(format!("Unknown event: {event_id}"))
        })
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.departments.iter().flat_map(|d| d.events.iter())
    }

    pub fn departments(&self) -> &[Department] {
        &self.departments
    }

    /// Events of one department; empty for an unknown department.
    pub fn department_events(&self, department_id: &str) -> &[Event] {
        self.departments
            .iter()
            .find(|d| d.id == department_id)
            .map(|d| d.events.as_slice())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
