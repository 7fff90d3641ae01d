//! Zone state table

use dashmap::DashMap;
use thudp_core::ZONE_LEN;

use crate::error::{DeviceError, Result};

/// Last known readings of one zone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneState {
    /// Measured temperature, NaN until reported
    pub value: f32,
    /// Desired temperature, NaN until set
    pub setpoint: f32,
}

impl Default for ZoneState {
    fn default() -> Self {
        Self {
            value: f32::NAN,
            setpoint: f32::NAN,
        }
    }
}

/// Concurrent table of zones keyed by name
#[derive(Debug, Default)]
pub struct ZoneTable {
    zones: DashMap<String, ZoneState>,
}

impl ZoneTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a zone (or reset its setpoint) with an initial setpoint
    pub fn insert(&self, name: &str, setpoint: f32) -> Result<()> {
        validate_name(name)?;
        self.zones.entry(name.to_string()).or_default().setpoint = setpoint;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<ZoneState> {
        self.zones.get(name).map(|z| *z)
    }

    /// Apply a value and/or setpoint, creating the zone if needed.
    /// Returns the state after the update.
    pub fn apply(&self, name: &str, value: Option<f32>, setpoint: Option<f32>) -> Result<ZoneState> {
        validate_name(name)?;
        let mut zone = self.zones.entry(name.to_string()).or_default();
        if let Some(value) = value {
            zone.value = value;
        }
        if let Some(setpoint) = setpoint {
            zone.setpoint = setpoint;
        }
        Ok(*zone)
    }

    /// All zones, sorted by name
    pub fn snapshot(&self) -> Vec<(String, ZoneState)> {
        let mut zones: Vec<_> = self
            .zones
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        zones.sort_by(|a, b| a.0.cmp(&b.0));
        zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > ZONE_LEN {
        return Err(DeviceError::InvalidZone(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_zone_is_nan() {
        let table = ZoneTable::new();
        let state = table.apply("hall", None, None).unwrap();
        assert!(state.value.is_nan());
        assert!(state.setpoint.is_nan());
    }

    #[test]
    fn test_apply_partial() {
        let table = ZoneTable::new();
        table.insert("hall", 20.0).unwrap();

        let state = table.apply("hall", Some(18.5), None).unwrap();
        assert_eq!(state.value, 18.5);
        assert_eq!(state.setpoint, 20.0);

        let state = table.apply("hall", None, Some(21.0)).unwrap();
        assert_eq!(state.value, 18.5);
        assert_eq!(state.setpoint, 21.0);
    }

    #[test]
    fn test_invalid_names() {
        let table = ZoneTable::new();
        assert!(matches!(table.insert("", 1.0), Err(DeviceError::InvalidZone(_))));
        assert!(matches!(
            table.apply("much-too-long", None, None),
            Err(DeviceError::InvalidZone(_))
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn test_snapshot_sorted() {
        let table = ZoneTable::new();
        table.insert("office", 19.0).unwrap();
        table.insert("attic", 15.0).unwrap();
        table.insert("kitchen", 21.0).unwrap();

        let names: Vec<_> = table.snapshot().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["attic", "kitchen", "office"]);
        assert_eq!(table.len(), 3);
    }
}
