use std::time::{Duration, Instant};

use crate::models::{ChargeState, StatusUpdate};

const ALERT_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryLevel {
    Critical,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone)]
struct Alert {
    message: String,
    shown_at: Instant,
}

/// View state for one live charging session. Updates are applied by
/// direct substitution, last message wins; there is no sequence check, so
/// a stale message overwrites newer numbers. The one exception is the
/// completed badge, which latches and never reverts.
#[derive(Debug, Clone)]
pub struct ChargingView {
    pub session_id: u64,
    pub soc: f64,
    pub energy_kwh: f64,
    pub cost: i64,
    pub time_remaining_min: i64,
    pub power_kw: f64,
    pub station_name: String,
    pub charger_name: String,
    pub start_time: String,
    pub state: ChargeState,
    pub connected: bool,
    completed: bool,
    alert: Option<Alert>,
}

impl ChargingView {
    pub fn new(session_id: u64) -> Self {
        Self {
            session_id,
            soc: 0.0,
            energy_kwh: 0.0,
            cost: 0,
            time_remaining_min: 0,
            power_kw: 0.0,
            station_name: String::new(),
            charger_name: String::new(),
            start_time: String::new(),
            state: ChargeState::Charging,
            connected: false,
            completed: false,
            alert: None,
        }
    }

    pub fn apply(&mut self, update: StatusUpdate) {
        self.soc = update.state_of_charge;
        self.energy_kwh = update.energy_consumed;
        self.cost = update.current_cost;
        self.time_remaining_min = update.time_remaining.max(0);
        self.power_kw = update.power_output;

        if let Some(name) = update.station_name {
            self.station_name = name;
        }
        if let Some(name) = update.charger_name {
            self.charger_name = name;
        }
        if let Some(start) = update.start_time {
            self.start_time = start;
        }
        if let Some(state) = update.status {
            self.state = state;
            if state == ChargeState::Completed {
                self.completed = true;
            }
        }
        if let Some(message) = update.alert_message {
            self.alert = Some(Alert {
                message,
                shown_at: Instant::now(),
            });
        }
    }

    /// The badge latches: once completed, always completed, even if an
    /// out-of-order CHARGING message arrives afterwards.
    pub fn badge_completed(&self) -> bool {
        self.completed
    }

    pub fn battery_level(&self) -> BatteryLevel {
        if self.soc < 20.0 {
            BatteryLevel::Critical
        } else if self.soc < 50.0 {
            BatteryLevel::Low
        } else if self.soc < 80.0 {
            BatteryLevel::Medium
        } else {
            BatteryLevel::High
        }
    }

    pub fn active_alert(&mut self) -> Option<String> {
        let alert = self.alert.as_ref()?;
        if alert.shown_at.elapsed() > ALERT_TTL {
            self.alert = None;
            return None;
        }
        Some(alert.message.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(soc: f64, status: Option<ChargeState>) -> StatusUpdate {
        StatusUpdate {
            state_of_charge: soc,
            status,
            ..StatusUpdate::default()
        }
    }

    #[test]
    fn fields_are_substituted_directly() {
        let mut view = ChargingView::new(17);
        view.apply(StatusUpdate {
            state_of_charge: 55.0,
            energy_consumed: 12.4,
            current_cost: 43_400,
            time_remaining: 28,
            power_output: 49.5,
            station_name: Some("Binh Thanh 1".to_string()),
            charger_name: Some("DC-02".to_string()),
            ..StatusUpdate::default()
        });
        assert_eq!(view.soc, 55.0);
        assert_eq!(view.cost, 43_400);
        assert_eq!(view.station_name, "Binh Thanh 1");
    }

    #[test]
    fn stale_message_overwrites_numeric_fields() {
        let mut view = ChargingView::new(17);
        view.apply(update(60.0, None));
        view.apply(update(55.0, None));
        assert_eq!(view.soc, 55.0);
    }

    #[test]
    fn missing_names_keep_previous_values() {
        let mut view = ChargingView::new(17);
        view.apply(StatusUpdate {
            station_name: Some("Binh Thanh 1".to_string()),
            ..StatusUpdate::default()
        });
        view.apply(update(10.0, None));
        assert_eq!(view.station_name, "Binh Thanh 1");
    }

    #[test]
    fn completed_badge_latches_exactly_once() {
        let mut view = ChargingView::new(17);
        assert!(!view.badge_completed());
        view.apply(update(100.0, Some(ChargeState::Completed)));
        assert!(view.badge_completed());

        // Out-of-order CHARGING message must not revert the badge.
        view.apply(update(98.0, Some(ChargeState::Charging)));
        assert!(view.badge_completed());
        assert_eq!(view.state, ChargeState::Charging);
    }

    #[test]
    fn negative_time_remaining_clamps_to_zero() {
        let mut view = ChargingView::new(17);
        view.apply(StatusUpdate {
            time_remaining: -3,
            ..StatusUpdate::default()
        });
        assert_eq!(view.time_remaining_min, 0);
    }

    #[test]
    fn battery_level_thresholds() {
        let mut view = ChargingView::new(17);
        view.apply(update(10.0, None));
        assert_eq!(view.battery_level(), BatteryLevel::Critical);
        view.apply(update(35.0, None));
        assert_eq!(view.battery_level(), BatteryLevel::Low);
        view.apply(update(65.0, None));
        assert_eq!(view.battery_level(), BatteryLevel::Medium);
        view.apply(update(92.0, None));
        assert_eq!(view.battery_level(), BatteryLevel::High);
    }

    #[test]
    fn alert_message_is_exposed_until_expiry() {
        let mut view = ChargingView::new(17);
        view.apply(StatusUpdate {
            alert_message: Some("Pin gần đầy".to_string()),
            ..StatusUpdate::default()
        });
        assert_eq!(view.active_alert().as_deref(), Some("Pin gần đầy"));
    }
}
