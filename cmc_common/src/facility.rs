//! Facility error registry.
//!
//! Each subsystem registers a three-letter facility name and a table of
//! four-letter error descriptions. Reporting an error latches an 8-byte
//! status record:
//!
//! ```text
//! [0..3]  facility name
//! [3..7]  error description
//! [7]     (facility << 5) | (code & 0x1F)
//! ```
//!
//! Facility 0 is the registry itself (`ERR`). The record holds the most
//! recent report only; [`FacilityRegistry::clear`] zeroes it.

use heapless::Vec;
use thiserror::Error;
use tracing::warn;

use crate::consts::MAX_FACILITIES;

/// Length of a facility name.
pub const FACILITY_NAME_LEN: usize = 3;

/// Length of an error description.
pub const DESCRIPTION_LEN: usize = 4;

/// One entry of a facility's error table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FacilityCode {
    pub code: u8,
    /// Four ASCII characters.
    pub description: &'static str,
}

impl FacilityCode {
    pub const fn new(code: u8, description: &'static str) -> Self {
        Self { code, description }
    }
}

/// Error codes of the registry facility.
pub mod registry_codes {
    use super::FacilityCode;

    pub const NO_ERROR: u8 = 0;
    pub const NO_MEMORY: u8 = 1;
    pub const ALREADY_INITIALIZED: u8 = 2;
    pub const NOT_INITIALIZED: u8 = 3;
    pub const TOO_MANY_DEVICES: u8 = 4;
    pub const NOT_REGISTERED: u8 = 5;

    pub const TABLE: &[FacilityCode] = &[
        FacilityCode::new(NO_ERROR, "NoEr"),
        FacilityCode::new(NO_MEMORY, "NMem"),
        FacilityCode::new(ALREADY_INITIALIZED, "AIni"),
        FacilityCode::new(NOT_INITIALIZED, "NIni"),
        FacilityCode::new(TOO_MANY_DEVICES, "DMax"),
        FacilityCode::new(NOT_REGISTERED, "DNRg"),
    ];
}

/// Identifier returned by [`FacilityRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FacilityId(u8);

impl FacilityId {
    /// The registry's own facility.
    pub const REGISTRY: FacilityId = FacilityId(0);

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }
}

/// Registry failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FacilityError {
    #[error("requested {requested} facilities, at most {max} supported")]
    TooManyDevices { requested: usize, max: usize },

    #[error("facility '{0}' not accounted for at initialization")]
    NotRegistered(String),

    #[error("facility name '{0}' must be three ASCII characters")]
    InvalidName(String),
}

#[derive(Debug, Clone, Copy)]
struct Facility {
    name: &'static str,
    codes: &'static [FacilityCode],
}

/// Registry of facilities plus the latched status record.
#[derive(Debug)]
pub struct FacilityRegistry {
    facilities: Vec<Facility, MAX_FACILITIES>,
    devices: usize,
    status: [u8; 8],
}

impl FacilityRegistry {
    /// Create a registry accepting `devices` facilities besides itself.
    ///
    /// # Errors
    ///
    /// `TooManyDevices` when `devices` does not fit next to the registry
    /// facility. The refusal is also latched in the status record.
    pub fn new(devices: usize) -> Result<Self, FacilityError> {
        let mut registry = Self {
            facilities: Vec::new(),
            devices: 0,
            status: [0; 8],
        };
        // Capacity is MAX_FACILITIES and the vector is empty.
        let _ = registry.facilities.push(Facility {
            name: "ERR",
            codes: registry_codes::TABLE,
        });

        if devices >= MAX_FACILITIES {
            registry.report(FacilityId::REGISTRY, registry_codes::TOO_MANY_DEVICES);
            return Err(FacilityError::TooManyDevices {
                requested: devices,
                max: MAX_FACILITIES - 1,
            });
        }
        registry.devices = devices;
        Ok(registry)
    }

    /// Register a facility, or return its id if the name is already known.
    pub fn register(
        &mut self,
        name: &'static str,
        codes: &'static [FacilityCode],
    ) -> Result<FacilityId, FacilityError> {
        if name.len() != FACILITY_NAME_LEN || !name.is_ascii() {
            return Err(FacilityError::InvalidName(name.to_string()));
        }

        if let Some(index) = self.facilities.iter().skip(1).position(|f| f.name == name) {
            return Ok(FacilityId(index as u8 + 1));
        }

        if self.facilities.len() > self.devices {
            self.report(FacilityId::REGISTRY, registry_codes::NOT_REGISTERED);
            return Err(FacilityError::NotRegistered(name.to_string()));
        }

        let id = FacilityId(self.facilities.len() as u8);
        self.facilities
            .push(Facility { name, codes })
            .map_err(|_| FacilityError::NotRegistered(name.to_string()))?;
        Ok(id)
    }

    /// Latch an error for `facility` and return the status byte.
    ///
    /// An unknown facility latches the registry's `DNRg` instead. A code
    /// missing from the facility's table latches `????` as description.
    pub fn report(&mut self, facility: FacilityId, code: u8) -> u8 {
        let Some(entry) = self.facilities.get(facility.0 as usize).copied() else {
            return self.report(FacilityId::REGISTRY, registry_codes::NOT_REGISTERED);
        };

        let description = entry
            .codes
            .iter()
            .find(|c| c.code == code)
            .map_or("????", |c| c.description);

        self.status[..FACILITY_NAME_LEN].copy_from_slice(entry.name.as_bytes());
        let descr = description.as_bytes();
        let n = descr.len().min(DESCRIPTION_LEN);
        self.status[FACILITY_NAME_LEN..FACILITY_NAME_LEN + DESCRIPTION_LEN].fill(b' ');
        self.status[FACILITY_NAME_LEN..FACILITY_NAME_LEN + n].copy_from_slice(&descr[..n]);
        self.status[7] = (facility.0 << 5) | (code & 0x1F);

        warn!(
            facility = entry.name,
            code,
            description,
            status = self.status[7],
            "facility error"
        );
        self.status[7]
    }

    /// Latched status record.
    #[inline]
    pub fn status(&self) -> [u8; 8] {
        self.status
    }

    /// Zero the status record.
    pub fn clear(&mut self) {
        self.status = [0; 8];
    }

    /// Name of a registered facility.
    pub fn name(&self, facility: FacilityId) -> Option<&'static str> {
        self.facilities.get(facility.0 as usize).map(|f| f.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADC_CODES: &[FacilityCode] = &[
        FacilityCode::new(1, "ChOR"),
        FacilityCode::new(2, "MdOR"),
        FacilityCode::new(3, "CROR"),
    ];

    const OWB_CODES: &[FacilityCode] = &[FacilityCode::new(1, "NDev")];

    #[test]
    fn too_many_devices_is_refused() {
        let err = FacilityRegistry::new(MAX_FACILITIES).unwrap_err();
        assert_eq!(
            err,
            FacilityError::TooManyDevices {
                requested: MAX_FACILITIES,
                max: MAX_FACILITIES - 1
            }
        );
    }

    #[test]
    fn register_is_idempotent() {
        let mut reg = FacilityRegistry::new(2).unwrap();
        let adc = reg.register("ADC", ADC_CODES).unwrap();
        let owb = reg.register("OWB", OWB_CODES).unwrap();
        assert_eq!(adc.get(), 1);
        assert_eq!(owb.get(), 2);
        assert_eq!(reg.register("ADC", ADC_CODES).unwrap(), adc);
        assert_eq!(reg.name(owb), Some("OWB"));
    }

    #[test]
    fn register_beyond_capacity_latches_dnrg() {
        let mut reg = FacilityRegistry::new(1).unwrap();
        reg.register("ADC", ADC_CODES).unwrap();
        let err = reg.register("OWB", OWB_CODES).unwrap_err();
        assert_eq!(err, FacilityError::NotRegistered("OWB".to_string()));
        assert_eq!(&reg.status(), b"ERRDNRg\x05");
    }

    #[test]
    fn invalid_name_is_rejected() {
        let mut reg = FacilityRegistry::new(1).unwrap();
        assert!(matches!(
            reg.register("ADCX", ADC_CODES),
            Err(FacilityError::InvalidName(_))
        ));
    }

    #[test]
    fn report_layout() {
        let mut reg = FacilityRegistry::new(1).unwrap();
        let adc = reg.register("ADC", ADC_CODES).unwrap();
        let byte = reg.report(adc, 2);
        assert_eq!(byte, (1 << 5) | 2);
        assert_eq!(&reg.status(), b"ADCMdOR\x22");
    }

    #[test]
    fn report_unknown_facility_falls_back_to_registry() {
        let mut reg = FacilityRegistry::new(1).unwrap();
        let byte = reg.report(FacilityId(6), 1);
        assert_eq!(byte, registry_codes::NOT_REGISTERED);
        assert_eq!(&reg.status()[..3], b"ERR");
    }

    #[test]
    fn clear_zeroes_status() {
        let mut reg = FacilityRegistry::new(1).unwrap();
        let adc = reg.register("ADC", ADC_CODES).unwrap();
        reg.report(adc, 1);
        reg.clear();
        assert_eq!(reg.status(), [0; 8]);
    }
}
