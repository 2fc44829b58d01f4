use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::{AuthResponse, Role};

/// Keys mirror the browser front-end's localStorage slots one-to-one, so
/// the flows that pass data between views keep their original contract.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const USER_ROLE: &str = "userRole";
    pub const USER_NAME: &str = "userName";
    pub const USER_ID: &str = "userId";
    pub const BOOKING_STATUS: &str = "bookingStatus";
    pub const BOOKING_STATION: &str = "bookingStation";
    pub const STAFF_STATION_ID: &str = "staffStationId";
}

pub const BOOKING_PENDING: &str = "pending";
pub const BOOKING_SUCCESS: &str = "success";
pub const BOOKING_CANCEL: &str = "cancel";

/// Subset of a station's fields serialized into the store when a booking
/// starts, read back by the payment view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedStation {
    pub id: u64,
    pub name: String,
    pub address: String,
    pub connector: String,
    pub power_kw: f64,
    pub price_per_kwh: i64,
}

#[derive(Debug, Clone)]
pub struct BookingResult {
    pub status: String,
    pub station: Option<BookedStation>,
}

/// Flat JSON key-value file shared between views. One writer at a time by
/// construction of the mode flow; nothing here locks.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

pub fn data_dir() -> Option<PathBuf> {
    let mut path = dirs::home_dir()?;
    path.push(".evcharge");
    Some(path)
}

impl SessionStore {
    pub fn open_default() -> io::Result<Self> {
        let dir = data_dir()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Home directory not found"))?;
        fs::create_dir_all(&dir)?;
        Ok(Self {
            path: dir.join("session.json"),
        })
    }

    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.read_map().remove(key)
    }

    pub fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut map = self.read_map();
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    pub fn remove(&self, key: &str) -> io::Result<()> {
        let mut map = self.read_map();
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }

    /// Drops every key. Invoked on a 401 the same way the browser client
    /// cleared localStorage before bouncing to the login page.
    pub fn clear(&self) -> io::Result<()> {
        self.write_map(&BTreeMap::new())
    }

    pub fn access_token(&self) -> Option<String> {
        self.get(keys::ACCESS_TOKEN)
    }

    pub fn role(&self) -> Option<Role> {
        self.get(keys::USER_ROLE).and_then(|v| Role::parse(&v))
    }

    pub fn user_name(&self) -> Option<String> {
        self.get(keys::USER_NAME)
    }

    pub fn user_id(&self) -> Option<u64> {
        self.get(keys::USER_ID).and_then(|v| v.parse().ok())
    }

    pub fn store_auth(&self, auth: &AuthResponse) -> io::Result<()> {
        let mut map = self.read_map();
        map.insert(keys::ACCESS_TOKEN.to_string(), auth.access_token.clone());
        match &auth.refresh_token {
            Some(token) => {
                map.insert(keys::REFRESH_TOKEN.to_string(), token.clone());
            }
            None => {
                map.remove(keys::REFRESH_TOKEN);
            }
        }
        map.insert(keys::USER_ROLE.to_string(), auth.role.as_str().to_string());
        map.insert(keys::USER_NAME.to_string(), auth.user_name.clone());
        map.insert(keys::USER_ID.to_string(), auth.user_id.to_string());
        self.write_map(&map)
    }

    pub fn staff_station_id(&self) -> Option<u64> {
        self.get(keys::STAFF_STATION_ID).and_then(|v| v.parse().ok())
    }

    pub fn set_staff_station_id(&self, id: u64) -> io::Result<()> {
        self.set(keys::STAFF_STATION_ID, &id.to_string())
    }

    /// Writes the station subset and flips `bookingStatus` to `pending`.
    /// Must happen before the transition into the payment view.
    pub fn begin_booking(&self, station: &BookedStation) -> io::Result<()> {
        let encoded = serde_json::to_string(station)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;
        let mut map = self.read_map();
        map.insert(keys::BOOKING_STATION.to_string(), encoded);
        map.insert(keys::BOOKING_STATUS.to_string(), BOOKING_PENDING.to_string());
        self.write_map(&map)
    }

    pub fn set_booking_status(&self, status: &str) -> io::Result<()> {
        self.set(keys::BOOKING_STATUS, status)
    }

    pub fn booking_status(&self) -> Option<String> {
        self.get(keys::BOOKING_STATUS)
    }

    pub fn booking_station(&self) -> Option<BookedStation> {
        self.get(keys::BOOKING_STATION)
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }

    /// Reads the booking outcome and removes both keys no matter what the
    /// outcome was or whether the station payload still parses.
    pub fn take_booking_result(&self) -> io::Result<Option<BookingResult>> {
        let mut map = self.read_map();
        let status = map.remove(keys::BOOKING_STATUS);
        let station = map
            .remove(keys::BOOKING_STATION)
            .and_then(|raw| serde_json::from_str(&raw).ok());
        if status.is_none() && station.is_none() {
            return Ok(None);
        }
        self.write_map(&map)?;
        Ok(status.map(|status| BookingResult { status, station }))
    }

    fn read_map(&self) -> BTreeMap<String, String> {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return BTreeMap::new();
        };
        serde_json::from_str(&contents).unwrap_or_default()
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> io::Result<()> {
        let json = serde_json::to_string_pretty(map)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;
        fs::write(&self.path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use tempfile::tempdir;

    fn store_in(dir: &tempfile::TempDir) -> SessionStore {
        SessionStore::at(dir.path().join("session.json"))
    }

    fn sample_station() -> BookedStation {
        BookedStation {
            id: 7,
            name: "Binh Thanh 1".to_string(),
            address: "123 Nguyen Van Cu".to_string(),
            connector: "CCS".to_string(),
            power_kw: 50.0,
            price_per_kwh: 3500,
        }
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.access_token(), None);
        assert!(store.take_booking_result().unwrap().is_none());
    }

    #[test]
    fn begin_booking_sets_pending_and_station() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        store.begin_booking(&sample_station()).unwrap();

        assert_eq!(store.booking_status().as_deref(), Some(BOOKING_PENDING));
        assert_eq!(store.booking_station(), Some(sample_station()));
    }

    #[test]
    fn take_booking_result_clears_both_keys() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        store.begin_booking(&sample_station()).unwrap();
        store.set_booking_status(BOOKING_SUCCESS).unwrap();

        let result = store.take_booking_result().unwrap().unwrap();
        assert_eq!(result.status, BOOKING_SUCCESS);
        assert_eq!(result.station, Some(sample_station()));

        assert_eq!(store.booking_status(), None);
        assert_eq!(store.booking_station(), None);
        assert!(store.take_booking_result().unwrap().is_none());
    }

    #[test]
    fn take_booking_result_clears_even_when_station_is_corrupt() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        store.set(keys::BOOKING_STATION, "{not json").unwrap();
        store.set(keys::BOOKING_STATUS, BOOKING_SUCCESS).unwrap();

        let result = store.take_booking_result().unwrap().unwrap();
        assert_eq!(result.status, BOOKING_SUCCESS);
        assert!(result.station.is_none());
        assert_eq!(store.get(keys::BOOKING_STATION), None);
    }

    #[test]
    fn store_auth_round_trips() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        store
            .store_auth(&crate::models::AuthResponse {
                access_token: "tok".to_string(),
                refresh_token: Some("refresh".to_string()),
                role: Role::Staff,
                user_id: 42,
                user_name: "Lan".to_string(),
            })
            .unwrap();

        assert_eq!(store.access_token().as_deref(), Some("tok"));
        assert_eq!(store.get(keys::REFRESH_TOKEN).as_deref(), Some("refresh"));
        assert_eq!(store.role(), Some(Role::Staff));
        assert_eq!(store.user_id(), Some(42));
        assert_eq!(store.user_name().as_deref(), Some("Lan"));
    }

    #[test]
    fn clear_wipes_everything() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        store.set(keys::ACCESS_TOKEN, "tok").unwrap();
        store.set_staff_station_id(3).unwrap();
        store.clear().unwrap();

        assert_eq!(store.access_token(), None);
        assert_eq!(store.staff_station_id(), None);
    }
}
