use serde::{Deserialize, Serialize};

/// Account roles as the backend spells them. The API has returned both
/// `EV_DRIVER` and the older `DRIVER` for the same role; accept either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Role {
    #[serde(rename = "EV_DRIVER", alias = "DRIVER")]
    Driver,
    #[serde(rename = "CS_STAFF")]
    Staff,
    #[serde(rename = "ADMIN")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Driver => "EV_DRIVER",
            Role::Staff => "CS_STAFF",
            Role::Admin => "ADMIN",
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "EV_DRIVER" | "DRIVER" => Some(Role::Driver),
            "CS_STAFF" => Some(Role::Staff),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargerStatus {
    Available,
    Occupied,
    Maintenance,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Active,
    Completed,
    Stopped,
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "ACTIVE",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Stopped => "STOPPED",
            SessionStatus::Error => "ERROR",
        }
    }
}

/// Status carried by a live charging update, distinct from the session
/// lifecycle status above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeState {
    Charging,
    Completed,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub available_chargers: u32,
    #[serde(default)]
    pub chargers: Vec<Charger>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Charger {
    pub id: u64,
    #[serde(default)]
    pub station_id: u64,
    #[serde(default)]
    pub name: String,
    pub connector_type: String,
    #[serde(default)]
    pub power_capacity: f64,
    #[serde(default)]
    pub price_per_kwh: i64,
    pub status: ChargerStatus,
}

/// Envelope returned by the public station listing.
#[derive(Debug, Clone, Deserialize)]
pub struct StationsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub stations: Vec<Station>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: u64,
    #[serde(default)]
    pub station_name: String,
    #[serde(default)]
    pub charger_name: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub soc_start: f64,
    #[serde(default)]
    pub soc_end: f64,
    #[serde(default)]
    pub energy_consumed: f64,
    #[serde(default)]
    pub cost: i64,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: u64,
    #[serde(default)]
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub wallet_balance: i64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WalletInfo {
    #[serde(default)]
    pub balance: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub role: Role,
    pub user_id: u64,
    #[serde(default)]
    pub user_name: String,
}

/// One message on the live charging topic. Fields the server omits fall
/// back to zero; name fields stay `None` so the previous value survives.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    #[serde(default)]
    pub state_of_charge: f64,
    #[serde(default)]
    pub energy_consumed: f64,
    #[serde(default)]
    pub current_cost: i64,
    #[serde(default)]
    pub time_remaining: i64,
    #[serde(default)]
    pub power_output: f64,
    #[serde(default)]
    pub station_name: Option<String>,
    #[serde(default)]
    pub charger_name: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub status: Option<ChargeState>,
    #[serde(default)]
    pub alert_message: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsOverview {
    #[serde(default)]
    pub total_stations: u32,
    #[serde(default)]
    pub total_chargers: u32,
    #[serde(default)]
    pub total_users: u32,
    #[serde(default)]
    pub active_sessions: u32,
    #[serde(default)]
    pub revenue_today: i64,
    #[serde(default)]
    pub energy_today: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenuePoint {
    pub label: String,
    #[serde(default)]
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    #[serde(default)]
    pub total_sessions: u64,
    #[serde(default)]
    pub total_energy: f64,
    #[serde(default)]
    pub total_revenue: i64,
    #[serde(default)]
    pub new_users: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyPoint {
    pub label: String,
    #[serde(default)]
    pub kwh: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGrowthPoint {
    pub label: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopStation {
    #[serde(default)]
    pub station_name: String,
    #[serde(default)]
    pub sessions: u64,
    #[serde(default)]
    pub revenue: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationPayload {
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargerPayload {
    pub station_id: u64,
    pub name: String,
    pub connector_type: String,
    pub power_capacity: f64,
    pub price_per_kwh: i64,
    pub status: ChargerStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartRequest {
    pub charger_id: u64,
    pub user_id: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashConfirmRequest {
    pub session_id: u64,
    pub method: String,
    pub amount_tendered: i64,
    pub change: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub change: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationStatusRequest {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_accepts_both_driver_spellings() {
        let a: Role = serde_json::from_str("\"EV_DRIVER\"").unwrap();
        let b: Role = serde_json::from_str("\"DRIVER\"").unwrap();
        assert_eq!(a, Role::Driver);
        assert_eq!(b, Role::Driver);
        assert_eq!(Role::parse("DRIVER"), Some(Role::Driver));
        assert_eq!(Role::parse("CS_STAFF"), Some(Role::Staff));
        assert_eq!(Role::parse("root"), None);
    }

    #[test]
    fn role_round_trips_through_storage_string() {
        for role in [Role::Driver, Role::Staff, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn status_update_defaults_missing_fields() {
        let update: StatusUpdate =
            serde_json::from_str(r#"{"stateOfCharge": 42.5, "status": "CHARGING"}"#).unwrap();
        assert_eq!(update.state_of_charge, 42.5);
        assert_eq!(update.energy_consumed, 0.0);
        assert_eq!(update.current_cost, 0);
        assert_eq!(update.status, Some(ChargeState::Charging));
        assert!(update.station_name.is_none());
        assert!(update.alert_message.is_none());
    }

    #[test]
    fn charger_status_uses_wire_spelling() {
        let status: ChargerStatus = serde_json::from_str("\"MAINTENANCE\"").unwrap();
        assert_eq!(status, ChargerStatus::Maintenance);
        assert_eq!(
            serde_json::to_string(&ChargerStatus::Available).unwrap(),
            "\"AVAILABLE\""
        );
    }

    #[test]
    fn station_tolerates_missing_charger_list() {
        let station: Station = serde_json::from_str(
            r#"{"id": 1, "name": "Binh Thanh 1", "address": "123 Nguyen Van Cu"}"#,
        )
        .unwrap();
        assert!(station.chargers.is_empty());
        assert_eq!(station.available_chargers, 0);
    }
}
