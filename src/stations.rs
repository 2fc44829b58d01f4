use thiserror::Error;

use crate::models::Station;
use crate::storage::{BookedStation, BookingResult, BOOKING_SUCCESS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Busy,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BookError {
    #[error("Không tìm thấy trạm để đặt chỗ.")]
    NotFound,
    #[error("Trạm đang bận hoặc không tồn tại!")]
    Busy,
}

/// Flattened view of one station, the map-marker analog. Display fields
/// come from the first charger the way the map card did.
#[derive(Debug, Clone)]
pub struct StationEntry {
    pub id: u64,
    pub name: String,
    pub address: String,
    pub connector: String,
    pub power_kw: f64,
    pub price_per_kwh: i64,
    pub availability: Availability,
    pub visible: bool,
}

impl StationEntry {
    fn from_station(station: &Station) -> Self {
        let first = station.chargers.first();
        Self {
            id: station.id,
            name: station.name.clone(),
            address: station.address.clone(),
            connector: first
                .map(|c| c.connector_type.clone())
                .unwrap_or_else(|| "Type 2".to_string()),
            power_kw: first.map(|c| c.power_capacity).unwrap_or(50.0),
            price_per_kwh: first.map(|c| c.price_per_kwh).unwrap_or(3500),
            availability: if station.available_chargers > 0 {
                Availability::Available
            } else {
                Availability::Busy
            },
            visible: true,
        }
    }

    pub fn is_available(&self) -> bool {
        self.availability == Availability::Available
    }

    fn to_booked(&self) -> BookedStation {
        BookedStation {
            id: self.id,
            name: self.name.clone(),
            address: self.address.clone(),
            connector: self.connector.clone(),
            power_kw: self.power_kw,
            price_per_kwh: self.price_per_kwh,
        }
    }
}

/// The station dataset behind the map view. Built once per fetch;
/// filtering only toggles the per-entry `visible` flag.
#[derive(Debug, Clone, Default)]
pub struct StationDirectory {
    entries: Vec<StationEntry>,
}

impl StationDirectory {
    pub fn from_stations(stations: &[Station]) -> Self {
        Self {
            entries: stations.iter().map(StationEntry::from_station).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[StationEntry] {
        &self.entries
    }

    pub fn visible(&self) -> impl Iterator<Item = &StationEntry> {
        self.entries.iter().filter(|entry| entry.visible)
    }

    pub fn visible_count(&self) -> usize {
        self.visible().count()
    }

    /// Text query matches name or address, case-insensitively; an empty
    /// query matches everything. Connector and availability filters
    /// intersect with the text match.
    pub fn apply_filter(
        &mut self,
        query: &str,
        connector: Option<&str>,
        availability: Option<Availability>,
    ) {
        let query = query.trim().to_lowercase();
        for entry in &mut self.entries {
            let matches_query = query.is_empty()
                || entry.name.to_lowercase().contains(&query)
                || entry.address.to_lowercase().contains(&query);
            let matches_connector = connector.is_none_or(|c| entry.connector == c);
            let matches_availability = availability.is_none_or(|a| entry.availability == a);
            entry.visible = matches_query && matches_connector && matches_availability;
        }
    }

    /// Booking does not hold or lock anything server-side; it only hands
    /// the station subset to the payment view. The status flip happens
    /// when the payment result comes back.
    pub fn book(&self, id: u64) -> Result<BookedStation, BookError> {
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.id == id)
            .ok_or(BookError::NotFound)?;
        if !entry.is_available() {
            return Err(BookError::Busy);
        }
        Ok(entry.to_booked())
    }

    pub fn mark_busy(&mut self, id: u64) -> bool {
        match self.entries.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.availability = Availability::Busy;
                true
            }
            None => false,
        }
    }

    /// Applies a booking outcome read back from the session store: only a
    /// `success` flips the booked station busy; any other outcome is a
    /// no-op here (the store already cleared the keys either way).
    pub fn apply_booking_result(&mut self, result: &BookingResult) -> bool {
        if result.status != BOOKING_SUCCESS {
            return false;
        }
        match &result.station {
            Some(station) => self.mark_busy(station.id),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Charger, ChargerStatus};

    fn station(id: u64, name: &str, address: &str, available: u32) -> Station {
        Station {
            id,
            name: name.to_string(),
            latitude: 10.77,
            longitude: 106.70,
            address: address.to_string(),
            status: None,
            available_chargers: available,
            chargers: vec![Charger {
                id: id * 10,
                station_id: id,
                name: format!("{name} #1"),
                connector_type: "CCS".to_string(),
                power_capacity: 50.0,
                price_per_kwh: 3500,
                status: ChargerStatus::Available,
            }],
        }
    }

    fn sample_directory() -> StationDirectory {
        StationDirectory::from_stations(&[
            station(1, "Binh Thanh 1", "123 Nguyen Van Cu", 2),
            station(2, "Quan 1", "789 Nguyen Hue", 0),
            station(3, "Sai Gon 3", "3 Pasteur", 1),
        ])
    }

    #[test]
    fn empty_query_shows_everything() {
        let mut directory =
            StationDirectory::from_stations(&[station(1, "A", "somewhere", 1)]);
        directory.apply_filter("", None, None);
        assert_eq!(directory.visible_count(), 1);
    }

    #[test]
    fn unmatched_query_hides_everything() {
        let mut directory =
            StationDirectory::from_stations(&[station(1, "A", "somewhere", 1)]);
        directory.apply_filter("zzz", None, None);
        assert_eq!(directory.visible_count(), 0);
    }

    #[test]
    fn query_matches_name_or_address_case_insensitively() {
        let mut directory = sample_directory();
        directory.apply_filter("NGUYEN", None, None);
        let names: Vec<_> = directory.visible().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Binh Thanh 1", "Quan 1"]);

        directory.apply_filter("sai gon", None, None);
        let names: Vec<_> = directory.visible().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Sai Gon 3"]);
    }

    #[test]
    fn visible_set_equals_matching_subset() {
        let mut directory = sample_directory();
        for query in ["", "1", "pasteur", "nope", "NG"] {
            directory.apply_filter(query, None, None);
            let lowered = query.to_lowercase();
            for entry in directory.entries() {
                let should_match = lowered.is_empty()
                    || entry.name.to_lowercase().contains(&lowered)
                    || entry.address.to_lowercase().contains(&lowered);
                assert_eq!(entry.visible, should_match, "query {query:?}");
            }
        }
    }

    #[test]
    fn filter_toggles_visibility_without_rebuilding() {
        let mut directory = sample_directory();
        directory.apply_filter("zzz", None, None);
        assert_eq!(directory.len(), 3);
        directory.apply_filter("", None, None);
        assert_eq!(directory.visible_count(), 3);
    }

    #[test]
    fn connector_and_availability_filters_intersect() {
        let mut directory = sample_directory();
        directory.apply_filter("", Some("CCS"), Some(Availability::Available));
        let names: Vec<_> = directory.visible().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Binh Thanh 1", "Sai Gon 3"]);

        directory.apply_filter("", Some("CHAdeMO"), None);
        assert_eq!(directory.visible_count(), 0);
    }

    #[test]
    fn booking_a_busy_station_is_rejected() {
        let directory = sample_directory();
        assert_eq!(directory.book(2), Err(BookError::Busy));
        assert_eq!(directory.book(99), Err(BookError::NotFound));
    }

    #[test]
    fn booking_returns_the_station_subset() {
        let directory = sample_directory();
        let booked = directory.book(1).unwrap();
        assert_eq!(booked.id, 1);
        assert_eq!(booked.name, "Binh Thanh 1");
        assert_eq!(booked.connector, "CCS");
        assert_eq!(booked.price_per_kwh, 3500);
    }

    #[test]
    fn successful_booking_result_flips_exactly_the_booked_station() {
        let mut directory = sample_directory();
        let booked = directory.book(1).unwrap();
        let flipped = directory.apply_booking_result(&BookingResult {
            status: BOOKING_SUCCESS.to_string(),
            station: Some(booked),
        });
        assert!(flipped);
        assert!(!directory.entries()[0].is_available());
        assert!(directory.entries()[2].is_available());
    }

    #[test]
    fn cancelled_booking_result_changes_nothing() {
        let mut directory = sample_directory();
        let booked = directory.book(1).unwrap();
        let flipped = directory.apply_booking_result(&BookingResult {
            status: "cancel".to_string(),
            station: Some(booked),
        });
        assert!(!flipped);
        assert!(directory.entries()[0].is_available());
    }
}
