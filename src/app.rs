use std::time::{Duration, Instant};

use arboard::Clipboard;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::ListState;
use tracing::warn;

use crate::api::{ApiClient, ApiError};
use crate::charging::ChargingView;
use crate::console::{AdminConsole, ConsoleOutcome, StaffConsole};
use crate::models::{LoginRequest, Profile, RegisterRequest, Role, Session, SessionStatus};
use crate::payment::{self, Method, Plan, WalletOutcome};
use crate::stations::{Availability, StationDirectory};
use crate::storage::{BOOKING_CANCEL, BOOKING_SUCCESS, BookedStation, SessionStore};
use crate::ws::{FeedEvent, StatusFeed};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Loading,
    Login,
    Register,
    Map,
    Payment,
    Charging,
    History,
    SessionDetail,
    Profile,
    Admin,
    Staff,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapFocus {
    Search,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Email,
    Password,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentFocus {
    Form,
    Otp,
}

#[derive(Debug, Clone)]
pub enum PaymentOrigin {
    /// Reached from the map: a tentative booking sits in the store.
    Booking(BookedStation),
    /// Reached from stopping a live session: the session total is known.
    Session {
        session_id: u64,
        station_name: String,
        charger_name: String,
        cost: i64,
    },
}

#[derive(Debug, Clone)]
pub struct PaymentState {
    pub origin: PaymentOrigin,
    pub balance: Option<i64>,
    pub plan: Plan,
    pub method: Method,
    pub focus: PaymentFocus,
    pub otp: String,
}

impl PaymentState {
    fn for_booking(station: BookedStation) -> Self {
        Self {
            origin: PaymentOrigin::Booking(station),
            balance: None,
            plan: Plan::Flexible,
            method: Method::Wallet,
            focus: PaymentFocus::Form,
            otp: String::new(),
        }
    }

    fn for_session(view: &ChargingView) -> Self {
        Self {
            origin: PaymentOrigin::Session {
                session_id: view.session_id,
                station_name: view.station_name.clone(),
                charger_name: view.charger_name.clone(),
                cost: view.cost,
            },
            balance: None,
            plan: Plan::Flexible,
            method: Method::Wallet,
            focus: PaymentFocus::Form,
            otp: String::new(),
        }
    }

    pub fn session_cost(&self) -> Option<i64> {
        match &self.origin {
            PaymentOrigin::Session { cost, .. } => Some(*cost),
            PaymentOrigin::Booking(_) => None,
        }
    }

    pub fn total(&self) -> i64 {
        self.plan.amount(self.session_cost())
    }

    fn is_booking(&self) -> bool {
        matches!(self.origin, PaymentOrigin::Booking(_))
    }
}

pub struct App {
    pub should_quit: bool,
    pub needs_refresh: bool,
    pub mode: Mode,
    pub status: Option<String>,
    pub show_help: bool,

    pub store: SessionStore,
    pub api: ApiClient,
    ws_url: String,
    pub role: Option<Role>,
    pub user_name: Option<String>,

    pub login_focus: LoginField,
    pub login_email: String,
    pub login_password: String,
    pub register_fields: [String; 4],
    pub register_focus: usize,

    pub directory: StationDirectory,
    pub search: String,
    pub map_focus: MapFocus,
    pub station_state: ListState,
    pub connector_filter: Option<String>,
    pub availability_filter: Option<Availability>,

    pub payment: Option<PaymentState>,

    pub charging: Option<ChargingView>,
    feed: Option<StatusFeed>,
    pub confirm_stop: bool,

    pub sessions: Vec<Session>,
    pub session_state: ListState,
    pub session_detail: Option<Session>,

    pub profile_name: String,
    pub profile_email: String,
    pub profile_phone: String,
    pub profile_focus: usize,

    pub admin: AdminConsole,
    pub staff: StaffConsole,

    toast: Option<Toast>,
}

pub const REGISTER_LABELS: [&str; 4] = ["Full name", "Email", "Password", "Phone (optional)"];
pub const PROFILE_LABELS: [&str; 3] = ["Full name", "Email", "Phone"];

impl App {
    pub fn new(api: ApiClient, store: SessionStore, ws_url: String) -> Self {
        let token = store.access_token();
        let role = store.role();
        let user_name = store.user_name();
        let mode = if token.is_some() {
            Mode::Loading
        } else {
            Mode::Login
        };
        let mut station_state = ListState::default();
        station_state.select(Some(0));
        let mut session_state = ListState::default();
        session_state.select(Some(0));

        let mut staff = StaffConsole::default();
        staff.selected_station = store.staff_station_id();

        App {
            should_quit: false,
            needs_refresh: token.is_some(),
            mode,
            status: None,
            show_help: false,
            store,
            api,
            ws_url,
            role,
            user_name,
            login_focus: LoginField::Email,
            login_email: String::new(),
            login_password: String::new(),
            register_fields: Default::default(),
            register_focus: 0,
            directory: StationDirectory::default(),
            search: String::new(),
            map_focus: MapFocus::List,
            station_state,
            connector_filter: None,
            availability_filter: None,
            payment: None,
            charging: None,
            feed: None,
            confirm_stop: false,
            sessions: Vec::new(),
            session_state,
            session_detail: None,
            profile_name: String::new(),
            profile_email: String::new(),
            profile_phone: String::new(),
            profile_focus: 0,
            admin: AdminConsole::default(),
            staff,
            toast: None,
        }
    }

    /// The query-string entry point of the status page: jump straight to
    /// the live view for the given session.
    pub fn watch(&mut self, session_id: u64) {
        self.start_charging(session_id);
    }

    // --- refresh ---

    pub fn refresh_data(&mut self) {
        self.needs_refresh = false;
        if self.mode == Mode::Loading {
            self.route_home();
        }
        match self.mode {
            Mode::Map => self.refresh_map(),
            Mode::History => self.refresh_history(),
            Mode::Profile => self.refresh_profile(),
            Mode::Payment => self.refresh_payment(),
            Mode::Admin => {
                match self.admin.refresh(&self.api) {
                    Ok(()) => {
                        if let Some(message) = self.admin.take_toast() {
                            self.set_toast(message, false);
                        }
                    }
                    Err(err) => self.handle_api_error(err),
                }
            }
            Mode::Staff => {
                match self.staff.refresh(&self.api) {
                    Ok(()) => {
                        if let Some(message) = self.staff.take_toast() {
                            self.set_toast(message, false);
                        }
                    }
                    Err(err) => self.handle_api_error(err),
                }
            }
            _ => {}
        }
    }

    fn route_home(&mut self) {
        self.mode = match self.role {
            Some(Role::Admin) => Mode::Admin,
            Some(Role::Staff) => Mode::Staff,
            _ => Mode::Map,
        };
    }

    fn refresh_map(&mut self) {
        self.status = None;
        match self.api.stations() {
            Ok(stations) => {
                self.directory = StationDirectory::from_stations(&stations);
                self.apply_map_filter();
                match self.store.take_booking_result() {
                    Ok(Some(result)) => {
                        if self.directory.apply_booking_result(&result) {
                            self.set_toast("Đặt chỗ thành công!", false);
                        }
                    }
                    Ok(None) => {}
                    Err(err) => warn!(error = %err, "failed to clear booking keys"),
                }
            }
            Err(err) => self.handle_api_error(err),
        }
    }

    fn refresh_history(&mut self) {
        match self.api.charging_history() {
            Ok(sessions) => {
                self.sessions = sessions;
                let len = self.sessions.len();
                if self.session_state.selected().unwrap_or(0) >= len.max(1) {
                    self.session_state.select(Some(0));
                }
            }
            Err(err) => self.handle_api_error(err),
        }
    }

    fn refresh_profile(&mut self) {
        match self.api.profile() {
            Ok(profile) => {
                self.profile_name = profile.full_name;
                self.profile_email = profile.email;
                self.profile_phone = profile.phone.unwrap_or_default();
                self.profile_focus = 0;
            }
            Err(err) => self.handle_api_error(err),
        }
    }

    fn refresh_payment(&mut self) {
        if self.payment.is_none() {
            return;
        }
        match self.api.wallet() {
            Ok(wallet) => {
                if let Some(payment) = self.payment.as_mut() {
                    payment.balance = Some(wallet.balance);
                }
            }
            Err(err) => self.surface_error(err),
        }
    }

    // --- error handling ---

    /// A 401 anywhere clears the stored session and drops back to login;
    /// everything else becomes a dismissable overlay.
    fn handle_api_error(&mut self, err: ApiError) {
        match err {
            ApiError::Unauthorized => self.force_logout(Some(err.to_string())),
            other => {
                self.mode = Mode::Error;
                self.status = Some(other.to_string());
            }
        }
    }

    /// Inline variant for form screens: non-401 errors stay on screen as
    /// a status string instead of taking over the view.
    fn surface_error(&mut self, err: ApiError) {
        match err {
            ApiError::Unauthorized => self.force_logout(Some(err.to_string())),
            other => self.status = Some(other.to_string()),
        }
    }

    fn force_logout(&mut self, message: Option<String>) {
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "failed to clear session store");
        }
        self.api.set_token(None);
        self.role = None;
        self.user_name = None;
        self.payment = None;
        if let Some(mut feed) = self.feed.take() {
            feed.shutdown();
        }
        self.charging = None;
        self.mode = Mode::Login;
        self.status = message;
    }

    // --- key dispatch ---

    pub fn handle_key_event(&mut self, key: KeyEvent) {
        match self.mode {
            Mode::Login => self.handle_login_key(key),
            Mode::Register => self.handle_register_key(key),
            Mode::Map => self.handle_map_key(key),
            Mode::Payment => self.handle_payment_key(key),
            Mode::Charging => self.handle_charging_key(key),
            Mode::History => self.handle_history_key(key),
            Mode::SessionDetail => self.handle_session_detail_key(key),
            Mode::Profile => self.handle_profile_key(key),
            Mode::Admin => self.handle_admin_key(key),
            Mode::Staff => self.handle_staff_key(key),
            Mode::Loading | Mode::Error => self.handle_overlay_key(key),
        }
    }

    /// Drains the live status feed. Called every UI tick.
    pub fn tick(&mut self) {
        let Some(feed) = self.feed.as_ref() else {
            return;
        };
        let events = feed.drain();
        if events.is_empty() {
            return;
        }
        let Some(view) = self.charging.as_mut() else {
            return;
        };
        for event in events {
            match event {
                FeedEvent::Connected => view.connected = true,
                FeedEvent::Disconnected => view.connected = false,
                FeedEvent::Update(update) => view.apply(update),
            }
        }
    }

    // --- login / register ---

    fn handle_login_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab | KeyCode::Down | KeyCode::Up => {
                self.login_focus = match self.login_focus {
                    LoginField::Email => LoginField::Password,
                    LoginField::Password => LoginField::Email,
                };
            }
            KeyCode::Enter => self.submit_login(),
            KeyCode::Backspace => {
                self.active_login_field().pop();
            }
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.status = None;
                self.register_fields = Default::default();
                self.register_focus = 0;
                self.mode = Mode::Register;
            }
            // The station map is public; only booking needs an account.
            KeyCode::Char('g') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.status = None;
                self.mode = Mode::Map;
                self.needs_refresh = true;
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                self.active_login_field().push(ch);
            }
            KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }

    fn active_login_field(&mut self) -> &mut String {
        match self.login_focus {
            LoginField::Email => &mut self.login_email,
            LoginField::Password => &mut self.login_password,
        }
    }

    fn submit_login(&mut self) {
        let email = self.login_email.trim().to_string();
        let password = self.login_password.clone();
        if email.is_empty() || password.is_empty() {
            self.status = Some("Email and password are required.".to_string());
            return;
        }
        match self.api.login(&LoginRequest { email, password }) {
            Ok(auth) => {
                if let Err(err) = self.store.store_auth(&auth) {
                    self.status = Some(format!("Failed to save session: {err}"));
                    return;
                }
                self.api.set_token(Some(auth.access_token.clone()));
                self.role = Some(auth.role);
                self.user_name = Some(auth.user_name.clone());
                self.login_email.clear();
                self.login_password.clear();
                self.status = None;
                self.mode = Mode::Loading;
                self.needs_refresh = true;
            }
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    fn handle_register_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab | KeyCode::Down => {
                self.register_focus = (self.register_focus + 1) % self.register_fields.len();
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.register_focus = if self.register_focus == 0 {
                    self.register_fields.len() - 1
                } else {
                    self.register_focus - 1
                };
            }
            KeyCode::Enter => self.submit_register(),
            KeyCode::Backspace => {
                self.register_fields[self.register_focus].pop();
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                self.register_fields[self.register_focus].push(ch);
            }
            KeyCode::Esc => {
                self.status = None;
                self.mode = Mode::Login;
            }
            _ => {}
        }
    }

    fn submit_register(&mut self) {
        let [name, email, password, phone] = &self.register_fields;
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() || email.is_empty() || password.is_empty() {
            self.status = Some("Name, email and password are required.".to_string());
            return;
        }
        if !email_is_valid(email) {
            self.status = Some("Enter a valid email address.".to_string());
            return;
        }
        let request = RegisterRequest {
            full_name: name.to_string(),
            email: email.to_string(),
            password: password.clone(),
            phone: match phone.trim() {
                "" => None,
                value => Some(value.to_string()),
            },
        };
        match self.api.register(&request) {
            Ok(()) => {
                self.mode = Mode::Login;
                self.status = Some("Account created. Please sign in.".to_string());
            }
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    // --- map ---

    fn handle_map_key(&mut self, key: KeyEvent) {
        if self.show_help {
            self.handle_help_key(key);
            return;
        }
        if self.map_focus == MapFocus::Search {
            match key.code {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Tab | KeyCode::Down => {
                    self.map_focus = MapFocus::List;
                }
                KeyCode::Backspace => {
                    self.search.pop();
                    self.apply_map_filter();
                }
                KeyCode::Char(ch) if !ch.is_control() => {
                    self.search.push(ch);
                    self.apply_map_filter();
                }
                _ => {}
            }
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('/') => self.map_focus = MapFocus::Search,
            KeyCode::Char('r') => self.trigger_refresh(),
            KeyCode::Char('h') => self.show_help = true,
            KeyCode::Char('c') => self.cycle_connector_filter(),
            KeyCode::Char('a') => self.cycle_availability_filter(),
            KeyCode::Char('o') => {
                self.mode = Mode::History;
                self.needs_refresh = true;
            }
            KeyCode::Char('p') => {
                self.mode = Mode::Profile;
                self.needs_refresh = true;
            }
            KeyCode::Char('l') => self.force_logout(Some("Signed out.".to_string())),
            KeyCode::Up => self.select_previous_station(),
            KeyCode::Down => self.select_next_station(),
            KeyCode::Enter => self.book_selected(),
            _ => {}
        }
    }

    pub fn apply_map_filter(&mut self) {
        self.directory.apply_filter(
            &self.search,
            self.connector_filter.as_deref(),
            self.availability_filter,
        );
        let visible = self.directory.visible_count();
        if self.station_state.selected().unwrap_or(0) >= visible.max(1) {
            self.station_state.select(Some(0));
        }
    }

    fn cycle_connector_filter(&mut self) {
        let mut connectors: Vec<String> = self
            .directory
            .entries()
            .iter()
            .map(|entry| entry.connector.clone())
            .collect();
        connectors.sort();
        connectors.dedup();
        if connectors.is_empty() {
            return;
        }
        self.connector_filter = match &self.connector_filter {
            None => Some(connectors[0].clone()),
            Some(current) => match connectors.iter().position(|c| c == current) {
                Some(index) if index + 1 < connectors.len() => {
                    Some(connectors[index + 1].clone())
                }
                _ => None,
            },
        };
        self.apply_map_filter();
    }

    fn cycle_availability_filter(&mut self) {
        self.availability_filter = match self.availability_filter {
            None => Some(Availability::Available),
            Some(Availability::Available) => Some(Availability::Busy),
            Some(Availability::Busy) => None,
        };
        self.apply_map_filter();
    }

    fn select_previous_station(&mut self) {
        let visible = self.directory.visible_count();
        if visible == 0 {
            return;
        }
        let selected = self.station_state.selected().unwrap_or(0);
        let next = if selected == 0 { visible - 1 } else { selected - 1 };
        self.station_state.select(Some(next));
    }

    fn select_next_station(&mut self) {
        let visible = self.directory.visible_count();
        if visible == 0 {
            return;
        }
        let selected = self.station_state.selected().unwrap_or(0);
        let next = if selected + 1 >= visible { 0 } else { selected + 1 };
        self.station_state.select(Some(next));
    }

    fn selected_station_id(&self) -> Option<u64> {
        let index = self.station_state.selected().unwrap_or(0);
        self.directory.visible().nth(index).map(|entry| entry.id)
    }

    fn book_selected(&mut self) {
        let Some(id) = self.selected_station_id() else {
            return;
        };
        if self.role.is_none() {
            self.status = Some("Bạn cần đăng nhập để đặt chỗ.".to_string());
            self.mode = Mode::Login;
            return;
        }
        match self.directory.book(id) {
            Ok(booked) => {
                // The pending flag must be in the store before the view
                // switches; the map applies the outcome on return.
                if let Err(err) = self.store.begin_booking(&booked) {
                    self.set_toast(format!("Failed to save booking: {err}"), true);
                    return;
                }
                self.payment = Some(PaymentState::for_booking(booked));
                self.status = None;
                self.mode = Mode::Payment;
                self.needs_refresh = true;
            }
            Err(err) => self.set_toast(err.to_string(), true),
        }
    }

    // --- payment ---

    fn handle_payment_key(&mut self, key: KeyEvent) {
        if self.payment.is_none() {
            // The booking evaporated; mirror the payment page bailing out.
            self.set_toast(payment::MSG_MISSING_BOOKING, true);
            self.mode = Mode::Loading;
            self.needs_refresh = true;
            return;
        }
        if self.payment.as_ref().is_some_and(|p| p.focus == PaymentFocus::Otp) {
            self.handle_otp_key(key);
            return;
        }
        match key.code {
            KeyCode::Char('1') => self.set_plan(Plan::Flexible),
            KeyCode::Char('2') => self.set_plan(Plan::Single),
            KeyCode::Char('3') => self.set_plan(Plan::Monthly),
            KeyCode::Up | KeyCode::Down => {
                if let Some(payment) = self.payment.as_mut() {
                    let index = Method::ALL
                        .iter()
                        .position(|m| *m == payment.method)
                        .unwrap_or(0);
                    let next = if key.code == KeyCode::Down {
                        (index + 1) % Method::ALL.len()
                    } else {
                        (index + Method::ALL.len() - 1) % Method::ALL.len()
                    };
                    payment.method = Method::ALL[next];
                }
            }
            KeyCode::Enter => self.submit_payment(),
            KeyCode::Char('r') => self.needs_refresh = true,
            KeyCode::Esc => self.cancel_payment(),
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
    }

    fn set_plan(&mut self, plan: Plan) {
        if let Some(payment) = self.payment.as_mut() {
            payment.plan = plan;
        }
    }

    fn handle_otp_key(&mut self, key: KeyEvent) {
        let Some(payment) = self.payment.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char(ch) if ch.is_ascii_digit() && payment.otp.len() < 6 => {
                payment.otp.push(ch);
                if payment.otp.len() == 6 {
                    self.complete_otp_payment();
                }
            }
            KeyCode::Backspace => {
                payment.otp.pop();
            }
            KeyCode::Esc => {
                payment.otp.clear();
                payment.focus = PaymentFocus::Form;
            }
            _ => {}
        }
    }

    fn complete_otp_payment(&mut self) {
        let Some(payment) = self.payment.as_ref() else {
            return;
        };
        let method = payment.method;
        if payment::validate_otp(&payment.otp) {
            self.finish_payment(payment::method_success_message(method));
        } else if let Some(payment) = self.payment.as_mut() {
            payment.otp.clear();
        }
    }

    fn submit_payment(&mut self) {
        let Some(payment) = self.payment.as_mut() else {
            return;
        };
        if payment.method.needs_otp() {
            payment.focus = PaymentFocus::Otp;
            payment.otp.clear();
            return;
        }
        let total = payment.total();
        let balance = payment.balance;
        match balance {
            None => self.set_toast("Wallet balance unavailable. Press r to retry.", true),
            Some(balance) => match payment::wallet_payment(balance, total) {
                WalletOutcome::InsufficientBalance => {
                    // No navigation and no store write on a failed check.
                    self.set_toast(payment::MSG_INSUFFICIENT_BALANCE, true);
                }
                WalletOutcome::Paid { deducted, remaining } => {
                    if let Some(payment) = self.payment.as_mut() {
                        payment.balance = Some(remaining);
                    }
                    self.finish_payment(payment::wallet_success_message(deducted, remaining));
                }
            },
        }
    }

    fn finish_payment(&mut self, message: String) {
        let is_booking = self.payment.as_ref().is_some_and(PaymentState::is_booking);
        if is_booking {
            if let Err(err) = self.store.set_booking_status(BOOKING_SUCCESS) {
                warn!(error = %err, "failed to record payment result");
            }
        }
        self.payment = None;
        self.set_toast(message, false);
        self.mode = Mode::Loading;
        self.needs_refresh = true;
    }

    fn cancel_payment(&mut self) {
        let is_booking = self.payment.as_ref().is_some_and(PaymentState::is_booking);
        if is_booking {
            if let Err(err) = self.store.set_booking_status(BOOKING_CANCEL) {
                warn!(error = %err, "failed to record payment result");
            }
        }
        self.payment = None;
        self.mode = Mode::Loading;
        self.needs_refresh = true;
    }

    // --- charging ---

    fn start_charging(&mut self, session_id: u64) {
        if let Some(mut feed) = self.feed.take() {
            feed.shutdown();
        }
        self.charging = Some(ChargingView::new(session_id));
        self.feed = Some(StatusFeed::connect(
            self.ws_url.clone(),
            session_id.to_string(),
        ));
        self.confirm_stop = false;
        self.mode = Mode::Charging;
    }

    fn handle_charging_key(&mut self, key: KeyEvent) {
        if self.confirm_stop {
            match key.code {
                KeyCode::Char('y') => self.stop_charging(),
                KeyCode::Char('n') | KeyCode::Esc => self.confirm_stop = false,
                _ => {}
            }
            return;
        }
        match key.code {
            KeyCode::Char('s') => self.confirm_stop = true,
            KeyCode::Esc => self.leave_charging(),
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
    }

    fn stop_charging(&mut self) {
        self.confirm_stop = false;
        let Some(session_id) = self.charging.as_ref().map(|view| view.session_id) else {
            return;
        };
        match self.api.stop_charging(session_id) {
            Ok(()) => {
                if let Some(mut feed) = self.feed.take() {
                    feed.shutdown();
                }
                if let Some(view) = self.charging.take() {
                    self.payment = Some(PaymentState::for_session(&view));
                }
                self.set_toast("Đã dừng sạc. Đang chuyển đến thanh toán...", false);
                self.mode = Mode::Payment;
                self.needs_refresh = true;
            }
            Err(ApiError::Unauthorized) => self.handle_api_error(ApiError::Unauthorized),
            Err(err) => {
                warn!(session_id, error = %err, "stop charging failed");
                self.set_toast("Không thể dừng sạc. Vui lòng thử lại.", true);
            }
        }
    }

    fn leave_charging(&mut self) {
        if let Some(mut feed) = self.feed.take() {
            feed.shutdown();
        }
        self.charging = None;
        self.mode = Mode::Loading;
        self.needs_refresh = true;
    }

    // --- history ---

    fn handle_history_key(&mut self, key: KeyEvent) {
        if self.show_help {
            self.handle_help_key(key);
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('r') => self.needs_refresh = true,
            KeyCode::Char('h') => self.show_help = true,
            KeyCode::Char('y') => self.copy_selected_session(),
            KeyCode::Up => self.move_session_selection(-1),
            KeyCode::Down => self.move_session_selection(1),
            KeyCode::Enter => self.open_selected_session(),
            KeyCode::Esc => {
                self.mode = Mode::Loading;
                self.needs_refresh = true;
            }
            _ => {}
        }
    }

    fn move_session_selection(&mut self, delta: i32) {
        let len = self.sessions.len();
        if len == 0 {
            return;
        }
        let selected = self.session_state.selected().unwrap_or(0);
        let next = if delta < 0 {
            if selected == 0 { len - 1 } else { selected - 1 }
        } else if selected + 1 >= len {
            0
        } else {
            selected + 1
        };
        self.session_state.select(Some(next));
    }

    fn open_selected_session(&mut self) {
        let index = self.session_state.selected().unwrap_or(0);
        let Some(session) = self.sessions.get(index) else {
            return;
        };
        let id = session.id;
        if session.status == SessionStatus::Active {
            self.start_charging(id);
            return;
        }
        match self.api.session_detail(id) {
            Ok(detail) => {
                self.session_detail = Some(detail);
                self.mode = Mode::SessionDetail;
            }
            Err(err) => self.handle_api_error(err),
        }
    }

    fn copy_selected_session(&mut self) {
        let index = self.session_state.selected().unwrap_or(0);
        let Some(session) = self.sessions.get(index).cloned() else {
            self.set_toast("No session to copy.", true);
            return;
        };
        self.copy_summary(&session);
    }

    fn copy_summary(&mut self, session: &Session) {
        let text = session_summary(session);
        match Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
            Ok(()) => self.set_toast("Copied session summary.", false),
            Err(err) => self.set_toast(format!("Clipboard error: {err}"), true),
        }
    }

    fn handle_session_detail_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('y') => {
                if let Some(session) = self.session_detail.clone() {
                    self.copy_summary(&session);
                }
            }
            KeyCode::Esc => {
                self.session_detail = None;
                self.mode = Mode::History;
            }
            _ => {}
        }
    }

    // --- profile ---

    fn handle_profile_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab | KeyCode::Down => {
                self.profile_focus = (self.profile_focus + 1) % PROFILE_LABELS.len();
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.profile_focus = if self.profile_focus == 0 {
                    PROFILE_LABELS.len() - 1
                } else {
                    self.profile_focus - 1
                };
            }
            KeyCode::Enter => self.save_profile(),
            KeyCode::Backspace => {
                self.active_profile_field().pop();
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                self.active_profile_field().push(ch);
            }
            KeyCode::Esc => {
                self.status = None;
                self.mode = Mode::Loading;
                self.needs_refresh = true;
            }
            _ => {}
        }
    }

    fn active_profile_field(&mut self) -> &mut String {
        match self.profile_focus {
            0 => &mut self.profile_name,
            1 => &mut self.profile_email,
            _ => &mut self.profile_phone,
        }
    }

    fn save_profile(&mut self) {
        let name = self.profile_name.trim();
        if name.is_empty() {
            self.status = Some("Full name is required.".to_string());
            return;
        }
        let email = self.profile_email.trim();
        if !email_is_valid(email) {
            self.status = Some("Enter a valid email address.".to_string());
            return;
        }
        let profile = Profile {
            full_name: name.to_string(),
            email: email.to_string(),
            phone: match self.profile_phone.trim() {
                "" => None,
                value => Some(value.to_string()),
            },
        };
        match self.api.update_profile(&profile) {
            Ok(()) => {
                self.status = None;
                self.set_toast("Profile updated.", false);
            }
            Err(err) => self.surface_error(err),
        }
    }

    // --- consoles ---

    fn handle_admin_key(&mut self, key: KeyEvent) {
        if self.show_help {
            self.handle_help_key(key);
            return;
        }
        if self.admin.form.is_none() && self.admin.pending_delete.is_none() {
            match key.code {
                KeyCode::Char('q') => {
                    self.should_quit = true;
                    return;
                }
                KeyCode::Char('h') => {
                    self.show_help = true;
                    return;
                }
                KeyCode::Char('l') => {
                    self.force_logout(Some("Signed out.".to_string()));
                    return;
                }
                _ => {}
            }
        }
        let outcome = self.admin.handle_key(key, &self.api);
        self.apply_console_outcome(outcome);
    }

    fn handle_staff_key(&mut self, key: KeyEvent) {
        if self.show_help {
            self.handle_help_key(key);
            return;
        }
        if self.staff.form.is_none() && self.staff.pending_stop.is_none() {
            match key.code {
                KeyCode::Char('q') => {
                    self.should_quit = true;
                    return;
                }
                KeyCode::Char('h') => {
                    self.show_help = true;
                    return;
                }
                KeyCode::Char('l') => {
                    self.force_logout(Some("Signed out.".to_string()));
                    return;
                }
                _ => {}
            }
        }
        let outcome = self.staff.handle_key(key, &self.api);
        self.apply_console_outcome(outcome);
    }

    fn apply_console_outcome(&mut self, outcome: ConsoleOutcome) {
        match outcome {
            ConsoleOutcome::None => {}
            ConsoleOutcome::Toast(message) => self.set_toast(message, false),
            ConsoleOutcome::Refetch => self.needs_refresh = true,
            ConsoleOutcome::Error(err) => self.handle_api_error(err),
            ConsoleOutcome::SelectStaffStation(id) => {
                if let Err(err) = self.store.set_staff_station_id(id) {
                    warn!(error = %err, "failed to remember staff station");
                }
                self.set_toast(format!("Station {id} selected for this shift."), false);
            }
        }
    }

    // --- overlays ---

    fn handle_overlay_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('r') | KeyCode::Enter | KeyCode::Esc => {
                if self.mode == Mode::Error {
                    self.mode = Mode::Loading;
                    self.needs_refresh = true;
                }
            }
            _ => {}
        }
    }

    fn handle_help_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('h') | KeyCode::Esc => self.show_help = false,
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
    }

    fn trigger_refresh(&mut self) {
        self.status = None;
        self.mode = Mode::Loading;
        self.needs_refresh = true;
    }

    // --- toast ---

    pub fn active_toast(&mut self) -> Option<ToastView> {
        let toast = self.toast.as_ref()?;
        if toast.created_at.elapsed() > Duration::from_secs(3) {
            self.toast = None;
            return None;
        }
        Some(ToastView {
            message: toast.message.clone(),
            is_error: toast.is_error,
        })
    }

    fn set_toast(&mut self, message: impl Into<String>, is_error: bool) {
        self.toast = Some(Toast {
            message: message.into(),
            created_at: Instant::now(),
            is_error,
        });
    }
}

pub fn session_summary(session: &Session) -> String {
    format!(
        "Session #{} · {} / {} · {:.2} kWh · {} · {}",
        session.id,
        session.station_name,
        session.charger_name,
        session.energy_consumed,
        payment::format_vnd(session.cost),
        session.status.as_str()
    )
}

fn email_is_valid(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.contains(' ')
}

struct Toast {
    message: String,
    created_at: Instant,
    is_error: bool,
}

pub struct ToastView {
    pub message: String,
    pub is_error: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Charger, ChargerStatus, Station};
    use crate::storage::{BOOKING_PENDING, keys};
    use tempfile::tempdir;

    fn test_app(dir: &tempfile::TempDir) -> App {
        let store = SessionStore::at(dir.path().join("session.json"));
        let api = ApiClient::new("http://localhost:9/api", None);
        App::new(api, store, "ws://localhost:9/ws".to_string())
    }

    fn seeded_station() -> Station {
        Station {
            id: 1,
            name: "Binh Thanh 1".to_string(),
            latitude: 10.82,
            longitude: 106.62,
            address: "123 Nguyen Van Cu".to_string(),
            status: None,
            available_chargers: 1,
            chargers: vec![Charger {
                id: 10,
                station_id: 1,
                name: "DC-01".to_string(),
                connector_type: "CCS".to_string(),
                power_capacity: 50.0,
                price_per_kwh: 3500,
                status: ChargerStatus::Available,
            }],
        }
    }

    #[test]
    fn email_validation_accepts_plausible_addresses() {
        assert!(email_is_valid("lan@example.com"));
        assert!(email_is_valid("a.b@sub.example.vn"));
        assert!(!email_is_valid("lan@example"));
        assert!(!email_is_valid("@example.com"));
        assert!(!email_is_valid("lan example@x.com"));
        assert!(!email_is_valid("lan"));
    }

    #[test]
    fn booking_writes_pending_before_switching_to_payment() {
        let dir = tempdir().unwrap();
        let mut app = test_app(&dir);
        app.role = Some(Role::Driver);
        app.directory = StationDirectory::from_stations(&[seeded_station()]);
        app.apply_map_filter();

        app.book_selected();

        assert_eq!(app.mode, Mode::Payment);
        assert_eq!(
            app.store.booking_status().as_deref(),
            Some(BOOKING_PENDING)
        );
        assert_eq!(app.store.booking_station().map(|s| s.id), Some(1));
    }

    #[test]
    fn booking_without_login_bounces_to_login() {
        let dir = tempdir().unwrap();
        let mut app = test_app(&dir);
        app.directory = StationDirectory::from_stations(&[seeded_station()]);
        app.apply_map_filter();

        app.book_selected();

        assert_eq!(app.mode, Mode::Login);
        assert_eq!(app.store.booking_status(), None);
    }

    #[test]
    fn insufficient_wallet_neither_navigates_nor_writes() {
        let dir = tempdir().unwrap();
        let mut app = test_app(&dir);
        app.role = Some(Role::Driver);
        app.directory = StationDirectory::from_stations(&[seeded_station()]);
        app.apply_map_filter();
        app.book_selected();

        if let Some(payment) = app.payment.as_mut() {
            payment.balance = Some(50_000);
            payment.plan = Plan::Single; // 60 000đ
        }
        app.submit_payment();

        assert_eq!(app.mode, Mode::Payment);
        assert_eq!(app.store.booking_status().as_deref(), Some(BOOKING_PENDING));
        let toast = app.active_toast().expect("alert expected");
        assert!(toast.is_error);
        assert_eq!(toast.message, payment::MSG_INSUFFICIENT_BALANCE);
    }

    #[test]
    fn sufficient_wallet_deducts_and_navigates() {
        let dir = tempdir().unwrap();
        let mut app = test_app(&dir);
        app.role = Some(Role::Driver);
        app.directory = StationDirectory::from_stations(&[seeded_station()]);
        app.apply_map_filter();
        app.book_selected();

        if let Some(payment) = app.payment.as_mut() {
            payment.balance = Some(80_000);
            payment.plan = Plan::Single;
        }
        app.submit_payment();

        assert_eq!(app.mode, Mode::Loading);
        assert!(app.payment.is_none());
        assert_eq!(
            app.store.booking_status().as_deref(),
            Some(BOOKING_SUCCESS)
        );
    }

    #[test]
    fn cancelling_payment_records_cancel() {
        let dir = tempdir().unwrap();
        let mut app = test_app(&dir);
        app.role = Some(Role::Driver);
        app.directory = StationDirectory::from_stations(&[seeded_station()]);
        app.apply_map_filter();
        app.book_selected();

        app.cancel_payment();

        assert_eq!(app.store.booking_status().as_deref(), Some(BOOKING_CANCEL));
        assert!(app.payment.is_none());
    }

    #[test]
    fn force_logout_clears_the_store() {
        let dir = tempdir().unwrap();
        let mut app = test_app(&dir);
        app.store.set(keys::ACCESS_TOKEN, "tok").unwrap();
        app.store.set(keys::USER_ROLE, "ADMIN").unwrap();
        app.role = Some(Role::Admin);

        app.force_logout(Some("Session expired. Please login again.".to_string()));

        assert_eq!(app.mode, Mode::Login);
        assert_eq!(app.role, None);
        assert_eq!(app.store.access_token(), None);
        assert_eq!(app.store.get(keys::USER_ROLE), None);
    }

    #[test]
    fn session_summary_is_copyable_text() {
        let session = Session {
            id: 12,
            station_name: "Binh Thanh 1".to_string(),
            charger_name: "DC-01".to_string(),
            start_time: "2026-02-03T08:00:00Z".to_string(),
            end_time: None,
            soc_start: 20.0,
            soc_end: 80.0,
            energy_consumed: 12.4,
            cost: 43_400,
            status: SessionStatus::Completed,
        };
        assert_eq!(
            session_summary(&session),
            "Session #12 · Binh Thanh 1 / DC-01 · 12.40 kWh · 43.400đ · COMPLETED"
        );
    }

    #[test]
    fn payment_total_prefers_live_session_cost() {
        let mut view = ChargingView::new(9);
        view.cost = 84_500;
        view.station_name = "Quan 1".to_string();
        let payment = PaymentState::for_session(&view);
        assert_eq!(payment.total(), 84_500);

        let booking = PaymentState::for_booking(BookedStation {
            id: 1,
            name: "Binh Thanh 1".to_string(),
            address: "123".to_string(),
            connector: "CCS".to_string(),
            power_kw: 50.0,
            price_per_kwh: 3500,
        });
        assert_eq!(booking.total(), 51_000);
    }
}
