//! Admin and staff console state. Every entity screen is the same loop:
//! fetch the collection, populate rows, act on a row through a popup, and
//! on success re-fetch; failures stay on screen as an inline string.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::widgets::ListState;

use crate::api::{ApiClient, ApiError};
use crate::models::{
    CashConfirmRequest, Charger, ChargerPayload, ChargerStatus, EnergyPoint, RevenuePoint, Role,
    Session, SessionStartRequest, Station, StationPayload, StatisticsOverview, SummaryReport,
    TopStation, UserAccount, UserGrowthPoint, UserPayload,
};
use crate::payment::format_vnd;

/// What a console key press asks the app shell to do.
pub enum ConsoleOutcome {
    None,
    Toast(String),
    Refetch,
    Error(ApiError),
    SelectStaffStation(u64),
}

pub const STATION_STATUS_CYCLE: [&str; 3] = ["ACTIVE", "MAINTENANCE", "INACTIVE"];

pub fn next_station_status(current: Option<&str>) -> &'static str {
    let index = current
        .and_then(|value| STATION_STATUS_CYCLE.iter().position(|s| *s == value))
        .map(|i| (i + 1) % STATION_STATUS_CYCLE.len())
        .unwrap_or(0);
    STATION_STATUS_CYCLE[index]
}

// --- form popup ---

#[derive(Debug, Clone)]
pub struct FormField {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormIntent {
    CreateStation,
    EditStation(u64),
    CreateCharger,
    EditCharger(u64),
    CreateUser,
    EditUser(u64),
    StartSession,
    ConfirmCash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    None,
    Submit,
    Close,
}

#[derive(Debug, Clone)]
pub struct FormPopup {
    pub title: String,
    pub intent: FormIntent,
    pub fields: Vec<FormField>,
    pub active: usize,
    pub error: Option<String>,
}

impl FormPopup {
    fn new(title: &str, intent: FormIntent, fields: &[(&'static str, String)]) -> Self {
        Self {
            title: title.to_string(),
            intent,
            fields: fields
                .iter()
                .map(|&(label, ref value)| FormField {
                    label,
                    value: value.clone(),
                })
                .collect(),
            active: 0,
            error: None,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormAction {
        match key.code {
            KeyCode::Tab | KeyCode::Down => {
                self.active = (self.active + 1) % self.fields.len();
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.active = if self.active == 0 {
                    self.fields.len() - 1
                } else {
                    self.active - 1
                };
            }
            KeyCode::Backspace => {
                self.fields[self.active].value.pop();
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                self.fields[self.active].value.push(ch);
            }
            KeyCode::Enter => return FormAction::Submit,
            KeyCode::Esc => return FormAction::Close,
            _ => {}
        }
        FormAction::None
    }

    fn value(&self, index: usize) -> &str {
        self.fields[index].value.trim()
    }
}

fn parse_f64(form: &FormPopup, index: usize) -> Result<f64, String> {
    form.value(index)
        .parse()
        .map_err(|_| format!("{} must be a number", form.fields[index].label))
}

fn parse_u64(form: &FormPopup, index: usize) -> Result<u64, String> {
    form.value(index)
        .parse()
        .map_err(|_| format!("{} must be a number", form.fields[index].label))
}

fn parse_i64(form: &FormPopup, index: usize) -> Result<i64, String> {
    form.value(index)
        .parse()
        .map_err(|_| format!("{} must be a number", form.fields[index].label))
}

fn require(form: &FormPopup, index: usize) -> Result<String, String> {
    let value = form.value(index);
    if value.is_empty() {
        Err(format!("{} is required", form.fields[index].label))
    } else {
        Ok(value.to_string())
    }
}

fn station_payload(form: &FormPopup) -> Result<StationPayload, String> {
    Ok(StationPayload {
        name: require(form, 0)?,
        address: require(form, 1)?,
        latitude: parse_f64(form, 2)?,
        longitude: parse_f64(form, 3)?,
    })
}

fn charger_payload(form: &FormPopup) -> Result<ChargerPayload, String> {
    let status = match form.value(5).to_uppercase().as_str() {
        "AVAILABLE" => ChargerStatus::Available,
        "OCCUPIED" => ChargerStatus::Occupied,
        "MAINTENANCE" => ChargerStatus::Maintenance,
        "OFFLINE" => ChargerStatus::Offline,
        _ => {
            return Err(
                "Status must be AVAILABLE, OCCUPIED, MAINTENANCE or OFFLINE".to_string(),
            );
        }
    };
    Ok(ChargerPayload {
        station_id: parse_u64(form, 0)?,
        name: require(form, 1)?,
        connector_type: require(form, 2)?,
        power_capacity: parse_f64(form, 3)?,
        price_per_kwh: parse_i64(form, 4)?,
        status,
    })
}

fn user_payload(form: &FormPopup, require_password: bool) -> Result<UserPayload, String> {
    let role = Role::parse(&form.value(2).to_uppercase())
        .ok_or_else(|| "Role must be EV_DRIVER, CS_STAFF or ADMIN".to_string())?;
    let active = match form.value(3).to_lowercase().as_str() {
        "yes" | "y" | "true" => true,
        "no" | "n" | "false" => false,
        _ => return Err("Active must be yes or no".to_string()),
    };
    let password = form.value(4);
    if require_password && password.is_empty() {
        return Err("Password is required".to_string());
    }
    Ok(UserPayload {
        full_name: require(form, 0)?,
        email: require(form, 1)?,
        role,
        active,
        password: if password.is_empty() {
            None
        } else {
            Some(password.to_string())
        },
    })
}

fn session_start_request(form: &FormPopup) -> Result<SessionStartRequest, String> {
    Ok(SessionStartRequest {
        charger_id: parse_u64(form, 0)?,
        user_id: parse_u64(form, 1)?,
    })
}

fn cash_request(form: &FormPopup) -> Result<CashConfirmRequest, String> {
    let session_id = parse_u64(form, 0)?;
    let total = parse_i64(form, 1)?;
    let tendered = parse_i64(form, 2)?;
    if tendered < total {
        return Err("Amount tendered is less than the total due".to_string());
    }
    Ok(CashConfirmRequest {
        session_id,
        method: "CASH".to_string(),
        amount_tendered: tendered,
        change: tendered - total,
    })
}

// --- admin console ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminTab {
    Stations,
    Chargers,
    Users,
    Staff,
    Statistics,
    Reports,
}

impl AdminTab {
    pub const ALL: [AdminTab; 6] = [
        AdminTab::Stations,
        AdminTab::Chargers,
        AdminTab::Users,
        AdminTab::Staff,
        AdminTab::Statistics,
        AdminTab::Reports,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            AdminTab::Stations => "Stations",
            AdminTab::Chargers => "Chargers",
            AdminTab::Users => "Users",
            AdminTab::Staff => "Staff",
            AdminTab::Statistics => "Statistics",
            AdminTab::Reports => "Reports",
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|tab| tab == self).unwrap_or(0)
    }

    fn next(&self) -> AdminTab {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn prev(&self) -> AdminTab {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Summary,
    Revenue,
    Energy,
    UserGrowth,
    TopStations,
    RecentSessions,
}

impl ReportKind {
    pub const ALL: [ReportKind; 6] = [
        ReportKind::Summary,
        ReportKind::Revenue,
        ReportKind::Energy,
        ReportKind::UserGrowth,
        ReportKind::TopStations,
        ReportKind::RecentSessions,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ReportKind::Summary => "Summary",
            ReportKind::Revenue => "Revenue",
            ReportKind::Energy => "Energy delivered",
            ReportKind::UserGrowth => "User growth",
            ReportKind::TopStations => "Top stations",
            ReportKind::RecentSessions => "Recent sessions",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum ReportData {
    #[default]
    None,
    Summary(SummaryReport),
    Revenue(Vec<RevenuePoint>),
    Energy(Vec<EnergyPoint>),
    UserGrowth(Vec<UserGrowthPoint>),
    TopStations(Vec<TopStation>),
    RecentSessions(Vec<Session>),
}

#[derive(Debug, Clone, Copy)]
pub enum PendingDelete {
    Station(u64),
    Charger(u64),
    User(u64),
}

impl PendingDelete {
    pub fn label(&self) -> String {
        match self {
            PendingDelete::Station(id) => format!("station {id}"),
            PendingDelete::Charger(id) => format!("charger {id}"),
            PendingDelete::User(id) => format!("user {id}"),
        }
    }
}

pub struct AdminConsole {
    pub tab: AdminTab,
    pub stations: Vec<Station>,
    pub chargers: Vec<Charger>,
    pub users: Vec<UserAccount>,
    pub staff: Vec<UserAccount>,
    pub role_filter: Option<Role>,
    pub overview: Option<StatisticsOverview>,
    pub revenue_period: &'static str,
    pub revenue: Vec<RevenuePoint>,
    pub report_state: ListState,
    pub report: ReportData,
    pub table_state: ListState,
    pub form: Option<FormPopup>,
    pub pending_delete: Option<PendingDelete>,
    pub error: Option<String>,
    pending_toast: Option<String>,
}

const PERIODS: [&str; 3] = ["day", "week", "month"];

impl Default for AdminConsole {
    fn default() -> Self {
        let mut table_state = ListState::default();
        table_state.select(Some(0));
        let mut report_state = ListState::default();
        report_state.select(Some(0));
        Self {
            tab: AdminTab::Stations,
            stations: Vec::new(),
            chargers: Vec::new(),
            users: Vec::new(),
            staff: Vec::new(),
            role_filter: None,
            overview: None,
            revenue_period: PERIODS[0],
            revenue: Vec::new(),
            report_state,
            report: ReportData::None,
            table_state,
            form: None,
            pending_delete: None,
            error: None,
            pending_toast: None,
        }
    }
}

impl AdminConsole {
    pub fn refresh(&mut self, api: &ApiClient) -> Result<(), ApiError> {
        self.error = None;
        match self.tab {
            AdminTab::Stations => self.stations = api.admin_stations()?,
            AdminTab::Chargers => self.chargers = api.admin_chargers()?,
            AdminTab::Users => self.users = api.admin_users(self.role_filter)?,
            AdminTab::Staff => self.staff = api.admin_staff()?,
            AdminTab::Statistics => {
                self.overview = Some(api.statistics_overview()?);
                self.revenue = api.statistics_revenue(self.revenue_period)?;
            }
            AdminTab::Reports => {}
        }
        self.clamp_selection();
        Ok(())
    }

    pub fn rows_len(&self) -> usize {
        match self.tab {
            AdminTab::Stations => self.stations.len(),
            AdminTab::Chargers => self.chargers.len(),
            AdminTab::Users => self.users.len(),
            AdminTab::Staff => self.staff.len(),
            AdminTab::Statistics => self.revenue.len(),
            AdminTab::Reports => ReportKind::ALL.len(),
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.rows_len();
        let selected = self.table_state.selected().unwrap_or(0);
        if len == 0 {
            self.table_state.select(Some(0));
        } else if selected >= len {
            self.table_state.select(Some(len - 1));
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, api: &ApiClient) -> ConsoleOutcome {
        if self.form.is_some() {
            return self.handle_form_key(key, api);
        }
        if let Some(pending) = self.pending_delete {
            return self.handle_delete_key(key, pending, api);
        }

        match key.code {
            KeyCode::Tab | KeyCode::Right => {
                self.switch_tab(self.tab.next());
                ConsoleOutcome::Refetch
            }
            KeyCode::BackTab | KeyCode::Left => {
                self.switch_tab(self.tab.prev());
                ConsoleOutcome::Refetch
            }
            KeyCode::Char(ch @ '1'..='6') => {
                let index = ch as usize - '1' as usize;
                self.switch_tab(AdminTab::ALL[index]);
                ConsoleOutcome::Refetch
            }
            KeyCode::Up => {
                self.move_selection(-1);
                ConsoleOutcome::None
            }
            KeyCode::Down => {
                self.move_selection(1);
                ConsoleOutcome::None
            }
            KeyCode::Char('r') => ConsoleOutcome::Refetch,
            KeyCode::Char('n') => {
                self.open_create_form();
                ConsoleOutcome::None
            }
            KeyCode::Char('e') => {
                self.open_edit_form();
                ConsoleOutcome::None
            }
            KeyCode::Char('d') => {
                self.arm_delete();
                ConsoleOutcome::None
            }
            KeyCode::Char('f') if self.tab == AdminTab::Users => {
                self.role_filter = match self.role_filter {
                    None => Some(Role::Driver),
                    Some(Role::Driver) => Some(Role::Staff),
                    Some(Role::Staff) => Some(Role::Admin),
                    Some(Role::Admin) => None,
                };
                ConsoleOutcome::Refetch
            }
            KeyCode::Char('p') if self.tab == AdminTab::Statistics => {
                let index = PERIODS
                    .iter()
                    .position(|p| *p == self.revenue_period)
                    .unwrap_or(0);
                self.revenue_period = PERIODS[(index + 1) % PERIODS.len()];
                ConsoleOutcome::Refetch
            }
            KeyCode::Enter if self.tab == AdminTab::Reports => self.fetch_report(api),
            _ => ConsoleOutcome::None,
        }
    }

    fn switch_tab(&mut self, tab: AdminTab) {
        self.tab = tab;
        self.table_state.select(Some(0));
        self.error = None;
    }

    fn move_selection(&mut self, delta: i32) {
        if self.tab == AdminTab::Reports {
            move_list(&mut self.report_state, ReportKind::ALL.len(), delta);
        } else {
            let len = self.rows_len();
            move_list(&mut self.table_state, len, delta);
        }
    }

    fn open_create_form(&mut self) {
        self.form = match self.tab {
            AdminTab::Stations => Some(FormPopup::new(
                "New station",
                FormIntent::CreateStation,
                &[
                    ("Name", String::new()),
                    ("Address", String::new()),
                    ("Latitude", String::new()),
                    ("Longitude", String::new()),
                ],
            )),
            AdminTab::Chargers => Some(FormPopup::new(
                "New charger",
                FormIntent::CreateCharger,
                &[
                    ("Station ID", String::new()),
                    ("Name", String::new()),
                    ("Connector", String::new()),
                    ("Power (kW)", String::new()),
                    ("Price per kWh", String::new()),
                    ("Status", "AVAILABLE".to_string()),
                ],
            )),
            AdminTab::Users => Some(FormPopup::new(
                "New user",
                FormIntent::CreateUser,
                &[
                    ("Full name", String::new()),
                    ("Email", String::new()),
                    ("Role", "EV_DRIVER".to_string()),
                    ("Active", "yes".to_string()),
                    ("Password", String::new()),
                ],
            )),
            _ => None,
        };
    }

    fn open_edit_form(&mut self) {
        let selected = self.table_state.selected().unwrap_or(0);
        self.form = match self.tab {
            AdminTab::Stations => self.stations.get(selected).map(|station| {
                FormPopup::new(
                    "Edit station",
                    FormIntent::EditStation(station.id),
                    &[
                        ("Name", station.name.clone()),
                        ("Address", station.address.clone()),
                        ("Latitude", station.latitude.to_string()),
                        ("Longitude", station.longitude.to_string()),
                    ],
                )
            }),
            AdminTab::Chargers => self.chargers.get(selected).map(|charger| {
                FormPopup::new(
                    "Edit charger",
                    FormIntent::EditCharger(charger.id),
                    &[
                        ("Station ID", charger.station_id.to_string()),
                        ("Name", charger.name.clone()),
                        ("Connector", charger.connector_type.clone()),
                        ("Power (kW)", charger.power_capacity.to_string()),
                        ("Price per kWh", charger.price_per_kwh.to_string()),
                        (
                            "Status",
                            serde_json::to_value(charger.status)
                                .ok()
                                .and_then(|v| v.as_str().map(str::to_string))
                                .unwrap_or_else(|| "AVAILABLE".to_string()),
                        ),
                    ],
                )
            }),
            AdminTab::Users => self.users.get(selected).map(|user| {
                FormPopup::new(
                    "Edit user",
                    FormIntent::EditUser(user.id),
                    &[
                        ("Full name", user.full_name.clone()),
                        ("Email", user.email.clone()),
                        ("Role", user.role.as_str().to_string()),
                        ("Active", if user.active { "yes" } else { "no" }.to_string()),
                        ("Password", String::new()),
                    ],
                )
            }),
            _ => None,
        };
    }

    fn arm_delete(&mut self) {
        let selected = self.table_state.selected().unwrap_or(0);
        self.pending_delete = match self.tab {
            AdminTab::Stations => self.stations.get(selected).map(|s| PendingDelete::Station(s.id)),
            AdminTab::Chargers => self.chargers.get(selected).map(|c| PendingDelete::Charger(c.id)),
            AdminTab::Users => self.users.get(selected).map(|u| PendingDelete::User(u.id)),
            _ => None,
        };
    }

    fn handle_form_key(&mut self, key: KeyEvent, api: &ApiClient) -> ConsoleOutcome {
        let Some(form) = self.form.as_mut() else {
            return ConsoleOutcome::None;
        };
        match form.handle_key(key) {
            FormAction::None => ConsoleOutcome::None,
            FormAction::Close => {
                self.form = None;
                ConsoleOutcome::None
            }
            FormAction::Submit => self.submit_form(api),
        }
    }

    fn submit_form(&mut self, api: &ApiClient) -> ConsoleOutcome {
        let Some(form) = self.form.as_mut() else {
            return ConsoleOutcome::None;
        };
        let result: Result<&str, ApiError> = match form.intent {
            FormIntent::CreateStation => match station_payload(form) {
                Ok(payload) => api.create_station(&payload).map(|_| "Station created."),
                Err(message) => {
                    form.error = Some(message);
                    return ConsoleOutcome::None;
                }
            },
            FormIntent::EditStation(id) => match station_payload(form) {
                Ok(payload) => api.update_station(id, &payload).map(|_| "Station updated."),
                Err(message) => {
                    form.error = Some(message);
                    return ConsoleOutcome::None;
                }
            },
            FormIntent::CreateCharger => match charger_payload(form) {
                Ok(payload) => api.create_charger(&payload).map(|_| "Charger created."),
                Err(message) => {
                    form.error = Some(message);
                    return ConsoleOutcome::None;
                }
            },
            FormIntent::EditCharger(id) => match charger_payload(form) {
                Ok(payload) => api.update_charger(id, &payload).map(|_| "Charger updated."),
                Err(message) => {
                    form.error = Some(message);
                    return ConsoleOutcome::None;
                }
            },
            FormIntent::CreateUser => match user_payload(form, true) {
                Ok(payload) => api.create_user(&payload).map(|_| "User created."),
                Err(message) => {
                    form.error = Some(message);
                    return ConsoleOutcome::None;
                }
            },
            FormIntent::EditUser(id) => match user_payload(form, false) {
                Ok(payload) => api.update_user(id, &payload).map(|_| "User updated."),
                Err(message) => {
                    form.error = Some(message);
                    return ConsoleOutcome::None;
                }
            },
            FormIntent::StartSession | FormIntent::ConfirmCash => return ConsoleOutcome::None,
        };

        match result {
            Ok(message) => {
                self.form = None;
                self.error = None;
                // A successful mutation re-fetches the collection; the
                // toast rides along with the refetch request.
                self.pending_toast = Some(message.to_string());
                ConsoleOutcome::Refetch
            }
            Err(ApiError::Unauthorized) => ConsoleOutcome::Error(ApiError::Unauthorized),
            Err(err) => {
                form.error = Some(err.to_string());
                ConsoleOutcome::None
            }
        }
    }

    fn handle_delete_key(
        &mut self,
        key: KeyEvent,
        pending: PendingDelete,
        api: &ApiClient,
    ) -> ConsoleOutcome {
        match key.code {
            KeyCode::Char('y') => {
                self.pending_delete = None;
                let result = match pending {
                    PendingDelete::Station(id) => api.delete_station(id),
                    PendingDelete::Charger(id) => api.delete_charger(id),
                    PendingDelete::User(id) => api.delete_user(id),
                };
                match result {
                    Ok(()) => {
                        self.pending_toast = Some(format!("Deleted {}.", pending.label()));
                        ConsoleOutcome::Refetch
                    }
                    Err(ApiError::Unauthorized) => ConsoleOutcome::Error(ApiError::Unauthorized),
                    Err(err) => {
                        self.error = Some(err.to_string());
                        ConsoleOutcome::None
                    }
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.pending_delete = None;
                ConsoleOutcome::None
            }
            _ => ConsoleOutcome::None,
        }
    }

    pub fn selected_report(&self) -> ReportKind {
        let index = self.report_state.selected().unwrap_or(0);
        ReportKind::ALL[index.min(ReportKind::ALL.len() - 1)]
    }

    fn fetch_report(&mut self, api: &ApiClient) -> ConsoleOutcome {
        let result = match self.selected_report() {
            ReportKind::Summary => api.report_summary().map(ReportData::Summary),
            ReportKind::Revenue => api.report_revenue().map(ReportData::Revenue),
            ReportKind::Energy => api.report_energy().map(ReportData::Energy),
            ReportKind::UserGrowth => api.report_user_growth().map(ReportData::UserGrowth),
            ReportKind::TopStations => api.report_top_stations().map(ReportData::TopStations),
            ReportKind::RecentSessions => {
                api.report_recent_sessions().map(ReportData::RecentSessions)
            }
        };
        match result {
            Ok(report) => {
                self.report = report;
                self.error = None;
                ConsoleOutcome::None
            }
            Err(ApiError::Unauthorized) => ConsoleOutcome::Error(ApiError::Unauthorized),
            Err(err) => {
                self.error = Some(err.to_string());
                ConsoleOutcome::None
            }
        }
    }

    pub fn take_toast(&mut self) -> Option<String> {
        self.pending_toast.take()
    }
}

// --- staff console ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffTab {
    Stations,
    Sessions,
    Payments,
}

impl StaffTab {
    pub const ALL: [StaffTab; 3] = [StaffTab::Stations, StaffTab::Sessions, StaffTab::Payments];

    pub fn title(&self) -> &'static str {
        match self {
            StaffTab::Stations => "Stations",
            StaffTab::Sessions => "Sessions",
            StaffTab::Payments => "Payments",
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|tab| tab == self).unwrap_or(0)
    }

    fn next(&self) -> StaffTab {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn prev(&self) -> StaffTab {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

pub struct StaffConsole {
    pub tab: StaffTab,
    pub stations: Vec<Station>,
    /// Sessions started or monitored during this shift. A view array, not
    /// a mirror of any server collection.
    pub sessions: Vec<Session>,
    pub selected_station: Option<u64>,
    pub table_state: ListState,
    pub form: Option<FormPopup>,
    pub pending_stop: Option<u64>,
    pub error: Option<String>,
    pending_toast: Option<String>,
}

impl Default for StaffConsole {
    fn default() -> Self {
        let mut table_state = ListState::default();
        table_state.select(Some(0));
        Self {
            tab: StaffTab::Stations,
            stations: Vec::new(),
            sessions: Vec::new(),
            selected_station: None,
            table_state,
            form: None,
            pending_stop: None,
            error: None,
            pending_toast: None,
        }
    }
}

impl StaffConsole {
    pub fn refresh(&mut self, api: &ApiClient) -> Result<(), ApiError> {
        self.error = None;
        self.stations = api.staff_stations()?;
        for session in &mut self.sessions {
            match api.staff_session(session.id) {
                Ok(fresh) => *session = fresh,
                Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized),
                // Leave the row stale; the next refresh will try again.
                Err(_) => {}
            }
        }
        let len = self.rows_len();
        if self.table_state.selected().unwrap_or(0) >= len.max(1) {
            self.table_state.select(Some(0));
        }
        Ok(())
    }

    pub fn rows_len(&self) -> usize {
        match self.tab {
            StaffTab::Stations => self.stations.len(),
            StaffTab::Sessions | StaffTab::Payments => self.sessions.len(),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, api: &ApiClient) -> ConsoleOutcome {
        if self.form.is_some() {
            return self.handle_form_key(key, api);
        }
        if let Some(session_id) = self.pending_stop {
            return self.handle_stop_key(key, session_id, api);
        }

        match key.code {
            KeyCode::Tab | KeyCode::Right => {
                self.tab = self.tab.next();
                self.table_state.select(Some(0));
                ConsoleOutcome::None
            }
            KeyCode::BackTab | KeyCode::Left => {
                self.tab = self.tab.prev();
                self.table_state.select(Some(0));
                ConsoleOutcome::None
            }
            KeyCode::Char(ch @ '1'..='3') => {
                self.tab = StaffTab::ALL[ch as usize - '1' as usize];
                self.table_state.select(Some(0));
                ConsoleOutcome::None
            }
            KeyCode::Up => {
                let len = self.rows_len();
                move_list(&mut self.table_state, len, -1);
                ConsoleOutcome::None
            }
            KeyCode::Down => {
                let len = self.rows_len();
                move_list(&mut self.table_state, len, 1);
                ConsoleOutcome::None
            }
            KeyCode::Char('r') => ConsoleOutcome::Refetch,
            KeyCode::Enter if self.tab == StaffTab::Stations => {
                match self.selected_station_row() {
                    Some(station) => {
                        let id = station.id;
                        self.selected_station = Some(id);
                        ConsoleOutcome::SelectStaffStation(id)
                    }
                    None => ConsoleOutcome::None,
                }
            }
            KeyCode::Char('u') if self.tab == StaffTab::Stations => self.update_status(api),
            KeyCode::Char('s') if self.tab == StaffTab::Sessions => {
                self.form = Some(FormPopup::new(
                    "Start session",
                    FormIntent::StartSession,
                    &[("Charger ID", String::new()), ("Driver user ID", String::new())],
                ));
                ConsoleOutcome::None
            }
            KeyCode::Char('x') if self.tab == StaffTab::Sessions => {
                self.pending_stop = self.selected_session().map(|session| session.id);
                ConsoleOutcome::None
            }
            KeyCode::Enter if self.tab == StaffTab::Payments => {
                if let Some(session) = self.selected_session() {
                    self.form = Some(FormPopup::new(
                        "Confirm cash payment",
                        FormIntent::ConfirmCash,
                        &[
                            ("Session ID", session.id.to_string()),
                            ("Total due", session.cost.to_string()),
                            ("Amount tendered", String::new()),
                        ],
                    ));
                }
                ConsoleOutcome::None
            }
            _ => ConsoleOutcome::None,
        }
    }

    fn selected_station_row(&self) -> Option<&Station> {
        self.stations.get(self.table_state.selected().unwrap_or(0))
    }

    fn selected_session(&self) -> Option<&Session> {
        self.sessions.get(self.table_state.selected().unwrap_or(0))
    }

    fn update_status(&mut self, api: &ApiClient) -> ConsoleOutcome {
        let Some(station) = self.selected_station_row() else {
            return ConsoleOutcome::None;
        };
        let id = station.id;
        let next = next_station_status(station.status.as_deref());
        match api.staff_update_station_status(id, next) {
            Ok(()) => {
                self.pending_toast = Some(format!("Station {id} set to {next}."));
                ConsoleOutcome::Refetch
            }
            Err(ApiError::Unauthorized) => ConsoleOutcome::Error(ApiError::Unauthorized),
            Err(err) => {
                self.error = Some(err.to_string());
                ConsoleOutcome::None
            }
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent, api: &ApiClient) -> ConsoleOutcome {
        let Some(form) = self.form.as_mut() else {
            return ConsoleOutcome::None;
        };
        match form.handle_key(key) {
            FormAction::None => ConsoleOutcome::None,
            FormAction::Close => {
                self.form = None;
                ConsoleOutcome::None
            }
            FormAction::Submit => match form.intent {
                FormIntent::StartSession => match session_start_request(form) {
                    Ok(request) => match api.staff_start_session(&request) {
                        Ok(session) => {
                            let id = session.id;
                            self.sessions.insert(0, session);
                            self.form = None;
                            ConsoleOutcome::Toast(format!("Session {id} started."))
                        }
                        Err(ApiError::Unauthorized) => {
                            ConsoleOutcome::Error(ApiError::Unauthorized)
                        }
                        Err(err) => {
                            form.error = Some(err.to_string());
                            ConsoleOutcome::None
                        }
                    },
                    Err(message) => {
                        form.error = Some(message);
                        ConsoleOutcome::None
                    }
                },
                FormIntent::ConfirmCash => match cash_request(form) {
                    Ok(request) => match api.staff_confirm_payment(&request) {
                        Ok(receipt) => {
                            self.form = None;
                            self.pending_toast = Some(format!(
                                "Cash confirmed · {} · change {}",
                                receipt.transaction_id,
                                format_vnd(request.change)
                            ));
                            ConsoleOutcome::Refetch
                        }
                        Err(ApiError::Unauthorized) => {
                            ConsoleOutcome::Error(ApiError::Unauthorized)
                        }
                        Err(err) => {
                            form.error = Some(err.to_string());
                            ConsoleOutcome::None
                        }
                    },
                    Err(message) => {
                        form.error = Some(message);
                        ConsoleOutcome::None
                    }
                },
                _ => ConsoleOutcome::None,
            },
        }
    }

    fn handle_stop_key(
        &mut self,
        key: KeyEvent,
        session_id: u64,
        api: &ApiClient,
    ) -> ConsoleOutcome {
        match key.code {
            KeyCode::Char('y') => {
                self.pending_stop = None;
                match api.staff_stop_session(session_id) {
                    Ok(()) => {
                        self.pending_toast = Some(format!("Session {session_id} stopped."));
                        ConsoleOutcome::Refetch
                    }
                    Err(ApiError::Unauthorized) => ConsoleOutcome::Error(ApiError::Unauthorized),
                    Err(err) => {
                        self.error = Some(err.to_string());
                        ConsoleOutcome::None
                    }
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.pending_stop = None;
                ConsoleOutcome::None
            }
            _ => ConsoleOutcome::None,
        }
    }

    pub fn take_toast(&mut self) -> Option<String> {
        self.pending_toast.take()
    }
}

fn move_list(state: &mut ListState, len: usize, delta: i32) {
    if len == 0 {
        return;
    }
    let selected = state.selected().unwrap_or(0);
    let next = if delta < 0 {
        if selected == 0 { len - 1 } else { selected - 1 }
    } else if selected + 1 >= len {
        0
    } else {
        selected + 1
    };
    state.select(Some(next));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::from(code)
    }

    fn filled(form: &mut FormPopup, values: &[&str]) {
        for (field, value) in form.fields.iter_mut().zip(values) {
            field.value = value.to_string();
        }
    }

    #[test]
    fn station_status_cycle_wraps() {
        assert_eq!(next_station_status(Some("ACTIVE")), "MAINTENANCE");
        assert_eq!(next_station_status(Some("MAINTENANCE")), "INACTIVE");
        assert_eq!(next_station_status(Some("INACTIVE")), "ACTIVE");
        assert_eq!(next_station_status(None), "ACTIVE");
        assert_eq!(next_station_status(Some("???")), "ACTIVE");
    }

    #[test]
    fn form_keys_edit_the_active_field() {
        let mut form = FormPopup::new(
            "New station",
            FormIntent::CreateStation,
            &[("Name", String::new()), ("Address", String::new())],
        );
        assert_eq!(form.handle_key(key(KeyCode::Char('A'))), FormAction::None);
        form.handle_key(key(KeyCode::Char('n')));
        form.handle_key(key(KeyCode::Tab));
        form.handle_key(key(KeyCode::Char('x')));
        form.handle_key(key(KeyCode::Backspace));
        assert_eq!(form.fields[0].value, "An");
        assert_eq!(form.fields[1].value, "");
        assert_eq!(form.handle_key(key(KeyCode::Enter)), FormAction::Submit);
        assert_eq!(form.handle_key(key(KeyCode::Esc)), FormAction::Close);
    }

    #[test]
    fn station_payload_requires_numeric_coordinates() {
        let mut form = FormPopup::new(
            "New station",
            FormIntent::CreateStation,
            &[
                ("Name", String::new()),
                ("Address", String::new()),
                ("Latitude", String::new()),
                ("Longitude", String::new()),
            ],
        );
        filled(&mut form, &["Binh Thanh 1", "123 Nguyen Van Cu", "10.82", "east"]);
        let err = station_payload(&form).unwrap_err();
        assert_eq!(err, "Longitude must be a number");

        filled(&mut form, &["Binh Thanh 1", "123 Nguyen Van Cu", "10.82", "106.62"]);
        let payload = station_payload(&form).unwrap();
        assert_eq!(payload.name, "Binh Thanh 1");
        assert_eq!(payload.longitude, 106.62);
    }

    #[test]
    fn charger_payload_rejects_unknown_status() {
        let mut form = FormPopup::new(
            "New charger",
            FormIntent::CreateCharger,
            &[
                ("Station ID", String::new()),
                ("Name", String::new()),
                ("Connector", String::new()),
                ("Power (kW)", String::new()),
                ("Price per kWh", String::new()),
                ("Status", String::new()),
            ],
        );
        filled(&mut form, &["1", "DC-01", "CCS", "50", "3500", "BROKEN"]);
        assert!(charger_payload(&form).unwrap_err().contains("Status"));

        filled(&mut form, &["1", "DC-01", "CCS", "50", "3500", "available"]);
        let payload = charger_payload(&form).unwrap();
        assert_eq!(payload.status, ChargerStatus::Available);
        assert_eq!(payload.price_per_kwh, 3500);
    }

    #[test]
    fn user_payload_parses_role_and_active_flag() {
        let mut form = FormPopup::new(
            "New user",
            FormIntent::CreateUser,
            &[
                ("Full name", String::new()),
                ("Email", String::new()),
                ("Role", String::new()),
                ("Active", String::new()),
                ("Password", String::new()),
            ],
        );
        filled(&mut form, &["Lan", "lan@example.com", "cs_staff", "yes", "secret"]);
        let payload = user_payload(&form, true).unwrap();
        assert_eq!(payload.role, Role::Staff);
        assert!(payload.active);

        filled(&mut form, &["Lan", "lan@example.com", "CS_STAFF", "maybe", "secret"]);
        assert!(user_payload(&form, true).unwrap_err().contains("Active"));

        filled(&mut form, &["Lan", "lan@example.com", "CS_STAFF", "no", ""]);
        assert!(user_payload(&form, true).unwrap_err().contains("Password"));
        let payload = user_payload(&form, false).unwrap();
        assert!(payload.password.is_none());
        assert!(!payload.active);
    }

    #[test]
    fn cash_request_computes_change_and_rejects_short_payment() {
        let mut form = FormPopup::new(
            "Confirm cash payment",
            FormIntent::ConfirmCash,
            &[
                ("Session ID", String::new()),
                ("Total due", String::new()),
                ("Amount tendered", String::new()),
            ],
        );
        filled(&mut form, &["12", "51000", "60000"]);
        let request = cash_request(&form).unwrap();
        assert_eq!(request.session_id, 12);
        assert_eq!(request.change, 9_000);
        assert_eq!(request.method, "CASH");

        filled(&mut form, &["12", "51000", "50000"]);
        assert!(cash_request(&form).unwrap_err().contains("less than"));
    }

    #[test]
    fn admin_tab_cycles_forward_and_back() {
        assert_eq!(AdminTab::Stations.next(), AdminTab::Chargers);
        assert_eq!(AdminTab::Reports.next(), AdminTab::Stations);
        assert_eq!(AdminTab::Stations.prev(), AdminTab::Reports);
    }
}
