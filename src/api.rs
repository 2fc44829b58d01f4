use reqwest::blocking::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::{
    AuthResponse, CashConfirmRequest, Charger, ChargerPayload, EnergyPoint, LoginRequest,
    PaymentReceipt, Profile, RegisterRequest, RevenuePoint, Role, Session, SessionStartRequest,
    Station, StationPayload, StationStatusRequest, StationsResponse, StatisticsOverview,
    SummaryReport, TopStation, UserAccount, UserGrowthPoint, UserPayload, WalletInfo,
};

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Session expired. Please login again.")]
    Unauthorized,
    #[error("You do not have permission to perform this action.")]
    Forbidden,
    #[error("{0}")]
    Server(String),
    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        let client = Client::builder()
            .user_agent("evcharge-tui")
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    // --- auth ---

    pub fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.post("/auth/login", request)
    }

    pub fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        self.post_unit("/auth/register", request)
    }

    // --- public map ---

    pub fn stations(&self) -> Result<Vec<Station>, ApiError> {
        let response: StationsResponse = self.get("/stations")?;
        Ok(response.stations)
    }

    // --- driver ---

    pub fn profile(&self) -> Result<Profile, ApiError> {
        self.get("/profile")
    }

    pub fn update_profile(&self, profile: &Profile) -> Result<(), ApiError> {
        self.put_unit("/profile", profile)
    }

    pub fn wallet(&self) -> Result<WalletInfo, ApiError> {
        self.get("/profile/wallet")
    }

    pub fn charging_history(&self) -> Result<Vec<Session>, ApiError> {
        self.get("/charging/history")
    }

    pub fn session_detail(&self, id: u64) -> Result<Session, ApiError> {
        self.get(&format!("/charging/session/{id}"))
    }

    pub fn stop_charging(&self, session_id: u64) -> Result<(), ApiError> {
        self.post_unit(
            &format!("/stations/chargers/{session_id}/stop-charging"),
            &serde_json::json!({}),
        )
    }

    // --- admin ---

    pub fn admin_stations(&self) -> Result<Vec<Station>, ApiError> {
        self.get("/admin/stations")
    }

    pub fn create_station(&self, payload: &StationPayload) -> Result<(), ApiError> {
        self.post_unit("/admin/stations", payload)
    }

    pub fn update_station(&self, id: u64, payload: &StationPayload) -> Result<(), ApiError> {
        self.put_unit(&format!("/admin/stations/{id}"), payload)
    }

    pub fn delete_station(&self, id: u64) -> Result<(), ApiError> {
        self.delete(&format!("/admin/stations/{id}"))
    }

    pub fn admin_chargers(&self) -> Result<Vec<Charger>, ApiError> {
        self.get("/admin/chargers")
    }

    pub fn create_charger(&self, payload: &ChargerPayload) -> Result<(), ApiError> {
        self.post_unit("/admin/chargers", payload)
    }

    pub fn update_charger(&self, id: u64, payload: &ChargerPayload) -> Result<(), ApiError> {
        self.put_unit(&format!("/admin/chargers/{id}"), payload)
    }

    pub fn delete_charger(&self, id: u64) -> Result<(), ApiError> {
        self.delete(&format!("/admin/chargers/{id}"))
    }

    pub fn admin_users(&self, role: Option<Role>) -> Result<Vec<UserAccount>, ApiError> {
        match role {
            Some(role) => {
                let url = reqwest::Url::parse_with_params(
                    &format!("{}/admin/users", self.base_url),
                    &[("role", role.as_str())],
                )
                .map_err(|err| ApiError::Network(err.to_string()))?;
                self.execute(self.client.get(url))
            }
            None => self.get("/admin/users"),
        }
    }

    pub fn create_user(&self, payload: &UserPayload) -> Result<(), ApiError> {
        self.post_unit("/admin/users", payload)
    }

    pub fn update_user(&self, id: u64, payload: &UserPayload) -> Result<(), ApiError> {
        self.put_unit(&format!("/admin/users/{id}"), payload)
    }

    pub fn delete_user(&self, id: u64) -> Result<(), ApiError> {
        self.delete(&format!("/admin/users/{id}"))
    }

    pub fn admin_staff(&self) -> Result<Vec<UserAccount>, ApiError> {
        self.get("/admin/staff")
    }

    pub fn statistics_overview(&self) -> Result<StatisticsOverview, ApiError> {
        self.get("/admin/statistics/overview")
    }

    pub fn statistics_revenue(&self, period: &str) -> Result<Vec<RevenuePoint>, ApiError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/admin/statistics/revenue", self.base_url),
            &[("period", period)],
        )
        .map_err(|err| ApiError::Network(err.to_string()))?;
        self.execute(self.client.get(url))
    }

    pub fn report_summary(&self) -> Result<SummaryReport, ApiError> {
        self.get("/admin/reports/summary")
    }

    pub fn report_revenue(&self) -> Result<Vec<RevenuePoint>, ApiError> {
        self.get("/admin/reports/revenue")
    }

    pub fn report_energy(&self) -> Result<Vec<EnergyPoint>, ApiError> {
        self.get("/admin/reports/energy")
    }

    pub fn report_user_growth(&self) -> Result<Vec<UserGrowthPoint>, ApiError> {
        self.get("/admin/reports/user-growth")
    }

    pub fn report_top_stations(&self) -> Result<Vec<TopStation>, ApiError> {
        self.get("/admin/reports/top-stations")
    }

    pub fn report_recent_sessions(&self) -> Result<Vec<Session>, ApiError> {
        self.get("/admin/reports/recent-sessions")
    }

    // --- staff ---

    pub fn staff_stations(&self) -> Result<Vec<Station>, ApiError> {
        self.get("/staff/stations")
    }

    pub fn staff_update_station_status(&self, id: u64, status: &str) -> Result<(), ApiError> {
        self.put_unit(
            &format!("/staff/station/{id}/status"),
            &StationStatusRequest {
                status: status.to_string(),
            },
        )
    }

    /// Staff monitoring reads sessions through the plural path; the driver
    /// history screen uses the singular one.
    pub fn staff_session(&self, id: u64) -> Result<Session, ApiError> {
        self.get(&format!("/charging/sessions/{id}"))
    }

    pub fn staff_start_session(&self, request: &SessionStartRequest) -> Result<Session, ApiError> {
        self.post("/staff/sessions/start", request)
    }

    pub fn staff_stop_session(&self, id: u64) -> Result<(), ApiError> {
        self.post_unit(&format!("/staff/sessions/{id}/stop"), &serde_json::json!({}))
    }

    pub fn staff_confirm_payment(
        &self,
        request: &CashConfirmRequest,
    ) -> Result<PaymentReceipt, ApiError> {
        self.post("/staff/payments/confirm", request)
    }

    // --- plumbing ---

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(self.client.get(self.url(path)))
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.execute(self.client.post(self.url(path)).json(body))
    }

    fn post_unit<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        self.execute_unit(self.client.post(self.url(path)).json(body))
    }

    fn put_unit<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        self.execute_unit(self.client.put(self.url(path)).json(body))
    }

    fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute_unit(self.client.delete(self.url(path)))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, request: RequestBuilder) -> Result<reqwest::blocking::Response, ApiError> {
        let request = match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        };
        let response = request
            .header("Content-Type", "application/json")
            .send()
            .map_err(|err| ApiError::Network(err.to_string()))?;

        let status = response.status();
        if status == 401 {
            return Err(ApiError::Unauthorized);
        }
        if status == 403 {
            return Err(ApiError::Forbidden);
        }
        if !status.is_success() {
            let message = response
                .text()
                .ok()
                .and_then(|body| serde_json::from_str::<ErrorBody>(&body).ok())
                .and_then(|body| body.message)
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(ApiError::Server(message));
        }
        Ok(response)
    }

    fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        self.send(request)?
            .json::<T>()
            .map_err(|err| ApiError::Network(err.to_string()))
    }

    fn execute_unit(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.send(request).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:8080/api/", None);
        assert_eq!(
            client.url("/auth/login"),
            "http://localhost:8080/api/auth/login"
        );
    }
}
