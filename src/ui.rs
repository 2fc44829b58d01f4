use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Cell, Clear, Gauge, List, ListItem, Paragraph, Row, Table, Tabs,
    Wrap,
};

use crate::app::{
    App, LoginField, MapFocus, Mode, PROFILE_LABELS, PaymentFocus, PaymentOrigin, REGISTER_LABELS,
};
use crate::charging::BatteryLevel;
use crate::console::{AdminTab, FormPopup, ReportData, ReportKind, StaffTab};
use crate::models::SessionStatus;
use crate::payment::{Method, Plan, format_vnd};
use crate::stations::Availability;

struct Theme {
    accent: Color,
    highlight: Color,
    muted: Color,
    error: Color,
    success: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Cyan,
            highlight: Color::Yellow,
            muted: Color::DarkGray,
            error: Color::Red,
            success: Color::Green,
        }
    }
}

impl Theme {
    fn title_style(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    fn muted_style(&self) -> Style {
        Style::default().fg(self.muted)
    }

    fn border_style(&self) -> Style {
        Style::default().fg(self.muted)
    }

    fn highlight_style(&self) -> Style {
        Style::default()
            .bg(self.accent)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    }
}

pub fn draw(frame: &mut Frame, app: &mut App) {
    let area = frame.area();
    let theme = Theme::default();

    match app.mode {
        Mode::Login => draw_login(frame, app, area, &theme),
        Mode::Register => draw_register(frame, app, area, &theme),
        Mode::Map => draw_map(frame, app, area, &theme),
        Mode::Payment => draw_payment(frame, app, area, &theme),
        Mode::Charging => draw_charging(frame, app, area, &theme),
        Mode::History => draw_history(frame, app, area, &theme),
        Mode::SessionDetail => draw_session_detail(frame, app, area, &theme),
        Mode::Profile => draw_profile(frame, app, area, &theme),
        Mode::Admin => draw_admin(frame, app, area, &theme),
        Mode::Staff => draw_staff(frame, app, area, &theme),
        Mode::Loading | Mode::Error => draw_blank(frame, area, &theme),
    }

    match app.mode {
        Mode::Loading => draw_overlay(frame, area, "Loading…", &theme),
        Mode::Error => draw_overlay(
            frame,
            area,
            app.status.as_deref().unwrap_or("Unknown error"),
            &theme,
        ),
        _ => {}
    }

    if app.show_help {
        draw_help(frame, area, &theme);
    } else if let Some(toast) = app.active_toast() {
        draw_toast(frame, area, &toast.message, toast.is_error, &theme);
    }
}

fn panel_block(title: &str, theme: &Theme) -> Block<'static> {
    Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme.border_style())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    let vertical = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1]);
    vertical[1]
}

fn draw_blank(frame: &mut Frame, area: Rect, theme: &Theme) {
    frame.render_widget(panel_block("evcharge", theme), area);
}

fn draw_overlay(frame: &mut Frame, area: Rect, message: &str, theme: &Theme) {
    let block = centered_rect(60, 20, area);
    frame.render_widget(Clear, block);
    let paragraph = Paragraph::new(message)
        .alignment(Alignment::Center)
        .block(panel_block("Status", theme))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, block);
}

fn draw_toast(frame: &mut Frame, area: Rect, message: &str, is_error: bool, theme: &Theme) {
    let width = (message.chars().count() as u16 + 6).clamp(24, area.width.saturating_sub(2));
    let height = 3;
    let x = area.x + area.width.saturating_sub(width + 1);
    let y = area.y + area.height.saturating_sub(height + 2);
    let rect = Rect::new(x, y, width, height);

    frame.render_widget(Clear, rect);
    let style = if is_error {
        Style::default().fg(theme.error).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.success).add_modifier(Modifier::BOLD)
    };
    let paragraph = Paragraph::new(Line::from(Span::styled(message.to_string(), style)))
        .alignment(Alignment::Center)
        .block(panel_block("Notice", theme));
    frame.render_widget(paragraph, rect);
}

fn status_line(status: Option<&str>, theme: &Theme) -> Option<Line<'static>> {
    status.map(|message| {
        Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(theme.error),
        ))
    })
}

// --- auth screens ---

fn draw_login(frame: &mut Frame, app: &App, area: Rect, theme: &Theme) {
    draw_blank(frame, area, theme);
    let block = centered_rect(60, 40, area);
    frame.render_widget(Clear, block);

    let field = |label: &str, value: &str, active: bool, mask: bool| {
        let shown = if mask {
            "•".repeat(value.chars().count())
        } else {
            value.to_string()
        };
        Line::from(vec![
            Span::styled(
                format!("{label:<10}"),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            if active {
                Span::styled(shown, Style::default().fg(theme.accent))
            } else {
                Span::raw(shown)
            },
            if active { Span::raw("▌") } else { Span::raw("") },
        ])
    };

    let mut lines = vec![
        Line::from("Sign in to the charging network"),
        Line::from(""),
        field(
            "Email:",
            &app.login_email,
            app.login_focus == LoginField::Email,
            false,
        ),
        field(
            "Password:",
            &app.login_password,
            app.login_focus == LoginField::Password,
            true,
        ),
        Line::from(""),
        Line::from(Span::styled(
            "Tab switch · Enter sign in · Ctrl+r register · Ctrl+g browse map · Esc quit",
            theme.muted_style(),
        )),
    ];
    if let Some(line) = status_line(app.status.as_deref(), theme) {
        lines.push(Line::from(""));
        lines.push(line);
    }

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Left)
        .block(panel_block("Login", theme))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, block);
}

fn draw_register(frame: &mut Frame, app: &App, area: Rect, theme: &Theme) {
    draw_blank(frame, area, theme);
    let block = centered_rect(60, 50, area);
    frame.render_widget(Clear, block);

    let mut lines = vec![Line::from("Create a driver account"), Line::from("")];
    for (index, label) in REGISTER_LABELS.iter().enumerate() {
        let value = &app.register_fields[index];
        let active = app.register_focus == index;
        let shown = if *label == "Password" {
            "•".repeat(value.chars().count())
        } else {
            value.clone()
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("{label:<18}"),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            if active {
                Span::styled(shown, Style::default().fg(theme.accent))
            } else {
                Span::raw(shown)
            },
            if active { Span::raw("▌") } else { Span::raw("") },
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Tab next · Enter create · Esc back to login",
        theme.muted_style(),
    )));
    if let Some(line) = status_line(app.status.as_deref(), theme) {
        lines.push(Line::from(""));
        lines.push(line);
    }

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Left)
        .block(panel_block("Register", theme))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, block);
}

// --- map ---

struct StationRow {
    name: String,
    address: String,
    connector: String,
    power_kw: f64,
    price: i64,
    available: bool,
}

fn draw_map(frame: &mut Frame, app: &mut App, area: Rect, theme: &Theme) {
    let content = area.inner(Margin {
        vertical: 1,
        horizontal: 2,
    });
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(content);

    let user = app
        .user_name
        .clone()
        .unwrap_or_else(|| "Guest".to_string());
    let connector = app
        .connector_filter
        .clone()
        .unwrap_or_else(|| "All".to_string());
    let availability = match app.availability_filter {
        None => "All",
        Some(Availability::Available) => "Available",
        Some(Availability::Busy) => "Busy",
    };
    let header = Line::from(vec![
        Span::styled("Stations", theme.title_style()),
        Span::raw("  "),
        Span::styled("User", theme.muted_style()),
        Span::raw(": "),
        Span::styled(user, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled("Connector", theme.muted_style()),
        Span::raw(format!(": {connector}  ")),
        Span::styled("Status", theme.muted_style()),
        Span::raw(format!(": {availability}")),
    ]);
    frame.render_widget(
        Paragraph::new(header).block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(theme.border_style()),
        ),
        chunks[0],
    );

    let search_style = if app.map_focus == MapFocus::Search {
        Style::default().fg(theme.accent)
    } else {
        theme.muted_style()
    };
    let cursor = if app.map_focus == MapFocus::Search {
        "▌"
    } else {
        ""
    };
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::raw(app.search.clone()),
            Span::raw(cursor),
        ]))
        .block(
            panel_block("Search (name or address)", theme).border_style(search_style),
        ),
        chunks[1],
    );

    let rows: Vec<StationRow> = app
        .directory
        .visible()
        .map(|entry| StationRow {
            name: entry.name.clone(),
            address: entry.address.clone(),
            connector: entry.connector.clone(),
            power_kw: entry.power_kw,
            price: entry.price_per_kwh,
            available: entry.is_available(),
        })
        .collect();

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[2]);

    let items: Vec<ListItem> = rows
        .iter()
        .map(|row| {
            let (glyph, style) = if row.available {
                ("⚡", Style::default().fg(theme.success))
            } else {
                ("🔌", Style::default().fg(theme.error))
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{glyph} "), style),
                Span::styled(
                    row.name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!("  {}", row.connector), theme.muted_style()),
            ]))
        })
        .collect();
    let title = format!("{} trạm", rows.len());
    let list = List::new(items)
        .block(panel_block(&title, theme))
        .highlight_style(theme.highlight_style())
        .highlight_symbol("▍ ");
    frame.render_stateful_widget(list, body[0], &mut app.station_state);

    let detail_lines = match rows.get(app.station_state.selected().unwrap_or(0)) {
        Some(row) => vec![
            Line::from(Span::styled(
                row.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(row.address.clone()),
            Line::from(""),
            Line::from(format!(
                "{} · {:.0} kW · {}/kWh",
                row.connector,
                row.power_kw,
                format_vnd(row.price)
            )),
            Line::from(vec![
                Span::raw("Status: "),
                if row.available {
                    Span::styled("Trống", Style::default().fg(theme.success))
                } else {
                    Span::styled("Đang dùng", Style::default().fg(theme.error))
                },
            ]),
            Line::from(""),
            if row.available {
                Line::from(Span::styled(
                    "Enter để đặt chỗ",
                    Style::default().fg(theme.accent),
                ))
            } else {
                Line::from(Span::styled("Đã đặt chỗ", theme.muted_style()))
            },
        ],
        None => vec![Line::from("No stations match the current filter.")],
    };
    frame.render_widget(
        Paragraph::new(detail_lines)
            .block(panel_block("Station", theme))
            .wrap(Wrap { trim: true }),
        body[1],
    );

    let mut footer = vec![
        Span::styled("/ search", theme.muted_style()),
        Span::raw(" · "),
        Span::styled("c connector", theme.muted_style()),
        Span::raw(" · "),
        Span::styled("a availability", theme.muted_style()),
        Span::raw(" · "),
        Span::styled("Enter book", theme.muted_style()),
        Span::raw(" · "),
        Span::styled("o history", theme.muted_style()),
        Span::raw(" · "),
        Span::styled("p profile", theme.muted_style()),
        Span::raw(" · "),
        Span::styled("h help", theme.muted_style()),
        Span::raw(" · "),
        Span::styled("q quit", theme.muted_style()),
    ];
    if let Some(status) = app.status.as_deref() {
        footer.push(Span::raw("   |   "));
        footer.push(Span::styled(
            status.to_string(),
            Style::default().fg(theme.error),
        ));
    }
    frame.render_widget(
        Paragraph::new(Line::from(footer)).block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(theme.border_style()),
        ),
        chunks[3],
    );
}

// --- payment ---

fn draw_payment(frame: &mut Frame, app: &mut App, area: Rect, theme: &Theme) {
    draw_blank(frame, area, theme);
    let Some(payment) = app.payment.as_ref() else {
        return;
    };

    let block = centered_rect(72, 70, area);
    frame.render_widget(Clear, block);
    let inner = panel_block("Payment", theme);
    frame.render_widget(inner, block);
    let content = block.inner(Margin {
        vertical: 1,
        horizontal: 2,
    });

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(content);

    let mut detail = match &payment.origin {
        PaymentOrigin::Booking(station) => vec![
            Line::from(Span::styled(
                station.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(station.address.clone()),
            Line::from(format!(
                "{} · {:.0} kW · {}/kWh",
                station.connector,
                station.power_kw,
                format_vnd(station.price_per_kwh)
            )),
        ],
        PaymentOrigin::Session {
            session_id,
            station_name,
            charger_name,
            ..
        } => vec![
            Line::from(Span::styled(
                format!("Session #{session_id}"),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("{station_name} / {charger_name}")),
        ],
    };
    detail.push(Line::from(""));
    for (index, plan) in Plan::ALL.iter().enumerate() {
        let marker = if *plan == payment.plan { "●" } else { "○" };
        let style = if *plan == payment.plan {
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        detail.push(Line::from(Span::styled(
            format!(
                "{} {} {} · {}",
                index + 1,
                marker,
                plan.label(),
                format_vnd(plan.amount(payment.session_cost()))
            ),
            style,
        )));
    }
    detail.push(Line::from(""));
    detail.push(Line::from(vec![
        Span::raw("Tổng tiền: "),
        Span::styled(
            format_vnd(payment.total()),
            Style::default().fg(theme.highlight).add_modifier(Modifier::BOLD),
        ),
    ]));
    frame.render_widget(
        Paragraph::new(detail).wrap(Wrap { trim: true }),
        columns[0],
    );

    let balance = payment
        .balance
        .map(format_vnd)
        .unwrap_or_else(|| "…".to_string());
    let mut right = vec![
        Line::from(vec![
            Span::raw("Số dư ví: "),
            Span::styled(balance, Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(""),
    ];
    for method in Method::ALL {
        let marker = if method == payment.method { "●" } else { "○" };
        let style = if method == payment.method {
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        right.push(Line::from(Span::styled(
            format!("{marker} {}", method.label()),
            style,
        )));
    }
    right.push(Line::from(""));
    if payment.focus == PaymentFocus::Otp {
        right.push(Line::from(vec![
            Span::styled("OTP: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("{}▌", payment.otp),
                Style::default().fg(theme.accent),
            ),
        ]));
        right.push(Line::from(Span::styled(
            "Nhập 6 chữ số",
            theme.muted_style(),
        )));
    }
    right.push(Line::from(""));
    right.push(Line::from(Span::styled(
        "1-3 plan · ↑↓ method · Enter pay · Esc cancel",
        theme.muted_style(),
    )));
    if let Some(line) = status_line(app.status.as_deref(), theme) {
        right.push(Line::from(""));
        right.push(line);
    }
    frame.render_widget(
        Paragraph::new(right).wrap(Wrap { trim: true }),
        columns[1],
    );
}

// --- charging ---

fn draw_charging(frame: &mut Frame, app: &mut App, area: Rect, theme: &Theme) {
    let confirm_stop = app.confirm_stop;
    let Some(view) = app.charging.as_mut() else {
        draw_blank(frame, area, theme);
        return;
    };

    let content = area.inner(Margin {
        vertical: 1,
        horizontal: 2,
    });
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(content);

    let connection = if view.connected {
        Span::styled("Kết nối thành công", Style::default().fg(theme.success))
    } else {
        Span::styled(
            "Mất kết nối - Đang thử lại...",
            Style::default().fg(theme.error),
        )
    };
    let header = Line::from(vec![
        Span::styled(
            format!("Charging session #{}", view.session_id),
            theme.title_style(),
        ),
        Span::raw("  "),
        connection,
    ]);
    frame.render_widget(
        Paragraph::new(header).block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(theme.border_style()),
        ),
        chunks[0],
    );

    let gauge_color = match view.battery_level() {
        BatteryLevel::Critical => theme.error,
        BatteryLevel::Low => theme.highlight,
        BatteryLevel::Medium => Color::Blue,
        BatteryLevel::High => theme.success,
    };
    let percent = view.soc.clamp(0.0, 100.0) as u16;
    let gauge = Gauge::default()
        .block(panel_block("Battery", theme))
        .gauge_style(Style::default().fg(gauge_color))
        .percent(percent)
        .label(format!("{:.0}%", view.soc));
    frame.render_widget(gauge, chunks[1]);

    let badge = if view.badge_completed() {
        Span::styled(
            "✔ Hoàn thành",
            Style::default().fg(theme.success).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(
            "⚡ Đang sạc",
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        )
    };
    let mut lines = vec![
        Line::from(badge),
        Line::from(""),
        Line::from(format!(
            "Station:        {} / {}",
            view.station_name, view.charger_name
        )),
        Line::from(format!("Energy:         {:.2} kWh", view.energy_kwh)),
        Line::from(format!("Cost:           {}", format_vnd(view.cost))),
        Line::from(format!("Time remaining: {} min", view.time_remaining_min)),
        Line::from(format!("Power:          {:.1} kW", view.power_kw)),
        Line::from(format!("Started:        {}", view.start_time)),
    ];
    if let Some(alert) = view.active_alert() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            alert,
            Style::default().fg(theme.highlight).add_modifier(Modifier::BOLD),
        )));
    }
    frame.render_widget(
        Paragraph::new(lines)
            .block(panel_block("Live status", theme))
            .wrap(Wrap { trim: true }),
        chunks[2],
    );

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("s stop charging", theme.muted_style()),
            Span::raw(" · "),
            Span::styled("Esc back", theme.muted_style()),
            Span::raw(" · "),
            Span::styled("q quit", theme.muted_style()),
        ]))
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(theme.border_style()),
        ),
        chunks[3],
    );

    if confirm_stop {
        draw_confirm(frame, area, "Bạn có chắc muốn dừng sạc?", theme);
    }
}

fn draw_confirm(frame: &mut Frame, area: Rect, message: &str, theme: &Theme) {
    let block = centered_rect(50, 20, area);
    frame.render_widget(Clear, block);
    let paragraph = Paragraph::new(vec![
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(Span::styled("y confirm · n cancel", theme.muted_style())),
    ])
    .alignment(Alignment::Center)
    .block(panel_block("Confirm", theme))
    .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, block);
}

// --- history ---

fn draw_history(frame: &mut Frame, app: &mut App, area: Rect, theme: &Theme) {
    let content = area.inner(Margin {
        vertical: 1,
        horizontal: 2,
    });
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(content);

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            "Charging history",
            theme.title_style(),
        )))
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(theme.border_style()),
        ),
        chunks[0],
    );

    let items: Vec<ListItem> = app
        .sessions
        .iter()
        .map(|session| {
            let status_style = match session.status {
                SessionStatus::Active => Style::default().fg(theme.accent),
                SessionStatus::Completed => Style::default().fg(theme.success),
                SessionStatus::Stopped => Style::default().fg(theme.highlight),
                SessionStatus::Error => Style::default().fg(theme.error),
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("#{:<5}", session.id),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(
                    "{:<24} {:>7.2} kWh {:>12} ",
                    session.station_name,
                    session.energy_consumed,
                    format_vnd(session.cost)
                )),
                Span::styled(session.status.as_str(), status_style),
            ]))
        })
        .collect();
    let list = List::new(items)
        .block(panel_block("Sessions", theme))
        .highlight_style(theme.highlight_style())
        .highlight_symbol("▍ ");
    frame.render_stateful_widget(list, chunks[1], &mut app.session_state);

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Enter open (live view for ACTIVE)", theme.muted_style()),
            Span::raw(" · "),
            Span::styled("y copy", theme.muted_style()),
            Span::raw(" · "),
            Span::styled("r refresh", theme.muted_style()),
            Span::raw(" · "),
            Span::styled("Esc back", theme.muted_style()),
            Span::raw(" · "),
            Span::styled("q quit", theme.muted_style()),
        ]))
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(theme.border_style()),
        ),
        chunks[2],
    );
}

fn draw_session_detail(frame: &mut Frame, app: &App, area: Rect, theme: &Theme) {
    draw_blank(frame, area, theme);
    let Some(session) = app.session_detail.as_ref() else {
        return;
    };
    let block = centered_rect(60, 60, area);
    frame.render_widget(Clear, block);

    let lines = vec![
        Line::from(Span::styled(
            format!("Session #{}", session.id),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!(
            "Station:   {} / {}",
            session.station_name, session.charger_name
        )),
        Line::from(format!("Started:   {}", session.start_time)),
        Line::from(format!(
            "Ended:     {}",
            session.end_time.as_deref().unwrap_or("—")
        )),
        Line::from(format!(
            "Charge:    {:.0}% → {:.0}%",
            session.soc_start, session.soc_end
        )),
        Line::from(format!("Energy:    {:.2} kWh", session.energy_consumed)),
        Line::from(format!("Cost:      {}", format_vnd(session.cost))),
        Line::from(format!("Status:    {}", session.status.as_str())),
        Line::from(""),
        Line::from(Span::styled("y copy · Esc back", theme.muted_style())),
    ];
    let paragraph = Paragraph::new(lines)
        .block(panel_block("Session detail", theme))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, block);
}

// --- profile ---

fn draw_profile(frame: &mut Frame, app: &App, area: Rect, theme: &Theme) {
    draw_blank(frame, area, theme);
    let block = centered_rect(60, 50, area);
    frame.render_widget(Clear, block);

    let values = [&app.profile_name, &app.profile_email, &app.profile_phone];
    let mut lines = vec![Line::from("Driver profile"), Line::from("")];
    for (index, label) in PROFILE_LABELS.iter().enumerate() {
        let active = app.profile_focus == index;
        lines.push(Line::from(vec![
            Span::styled(
                format!("{label:<12}"),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            if active {
                Span::styled(values[index].clone(), Style::default().fg(theme.accent))
            } else {
                Span::raw(values[index].clone())
            },
            if active { Span::raw("▌") } else { Span::raw("") },
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Tab next · Enter save · Esc back",
        theme.muted_style(),
    )));
    if let Some(line) = status_line(app.status.as_deref(), theme) {
        lines.push(Line::from(""));
        lines.push(line);
    }

    let paragraph = Paragraph::new(lines)
        .block(panel_block("Profile", theme))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, block);
}

// --- admin console ---

fn draw_admin(frame: &mut Frame, app: &mut App, area: Rect, theme: &Theme) {
    let content = area.inner(Margin {
        vertical: 1,
        horizontal: 2,
    });
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(content);

    let titles: Vec<Line> = AdminTab::ALL
        .iter()
        .map(|tab| Line::from(tab.title()))
        .collect();
    let selected = AdminTab::ALL
        .iter()
        .position(|tab| *tab == app.admin.tab)
        .unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .style(theme.muted_style())
        .highlight_style(theme.title_style())
        .divider("|");
    frame.render_widget(tabs, chunks[0]);

    match app.admin.tab {
        AdminTab::Stations => {
            let rows: Vec<String> = app
                .admin
                .stations
                .iter()
                .map(|station| {
                    format!(
                        "{:<5} {:<26} {:<32} {:>3} free",
                        station.id,
                        truncate(&station.name, 25),
                        truncate(&station.address, 31),
                        station.available_chargers
                    )
                })
                .collect();
            draw_console_rows(frame, chunks[1], "Stations", rows, app.admin.error.as_deref(), &mut app.admin.table_state, theme);
        }
        AdminTab::Chargers => {
            let rows: Vec<String> = app
                .admin
                .chargers
                .iter()
                .map(|charger| {
                    format!(
                        "{:<5} {:<16} st {:<5} {:<10} {:>5.0} kW {:>12} {:?}",
                        charger.id,
                        truncate(&charger.name, 15),
                        charger.station_id,
                        truncate(&charger.connector_type, 9),
                        charger.power_capacity,
                        format_vnd(charger.price_per_kwh),
                        charger.status
                    )
                })
                .collect();
            draw_console_rows(frame, chunks[1], "Chargers", rows, app.admin.error.as_deref(), &mut app.admin.table_state, theme);
        }
        AdminTab::Users => {
            let filter = app
                .admin
                .role_filter
                .map(|role| role.as_str())
                .unwrap_or("ALL");
            let rows: Vec<String> = app
                .admin
                .users
                .iter()
                .map(|user| {
                    format!(
                        "{:<5} {:<22} {:<28} {:<9} {:>12} {}",
                        user.id,
                        truncate(&user.full_name, 21),
                        truncate(&user.email, 27),
                        user.role.as_str(),
                        format_vnd(user.wallet_balance),
                        if user.active { "active" } else { "frozen" }
                    )
                })
                .collect();
            let title = format!("Users (role: {filter})");
            draw_console_rows(frame, chunks[1], &title, rows, app.admin.error.as_deref(), &mut app.admin.table_state, theme);
        }
        AdminTab::Staff => {
            let rows: Vec<String> = app
                .admin
                .staff
                .iter()
                .map(|user| {
                    format!(
                        "{:<5} {:<24} {:<30} {}",
                        user.id,
                        truncate(&user.full_name, 23),
                        truncate(&user.email, 29),
                        if user.active { "active" } else { "frozen" }
                    )
                })
                .collect();
            draw_console_rows(frame, chunks[1], "Staff", rows, app.admin.error.as_deref(), &mut app.admin.table_state, theme);
        }
        AdminTab::Statistics => draw_statistics(frame, app, chunks[1], theme),
        AdminTab::Reports => draw_reports(frame, app, chunks[1], theme),
    }

    let mut footer = vec![
        Span::styled("Tab switch", theme.muted_style()),
        Span::raw(" · "),
        Span::styled("n new", theme.muted_style()),
        Span::raw(" · "),
        Span::styled("e edit", theme.muted_style()),
        Span::raw(" · "),
        Span::styled("d delete", theme.muted_style()),
        Span::raw(" · "),
        Span::styled("r refresh", theme.muted_style()),
        Span::raw(" · "),
        Span::styled("l logout", theme.muted_style()),
        Span::raw(" · "),
        Span::styled("q quit", theme.muted_style()),
    ];
    match app.admin.tab {
        AdminTab::Users => {
            footer.push(Span::raw(" · "));
            footer.push(Span::styled("f role filter", theme.muted_style()));
        }
        AdminTab::Statistics => {
            footer.push(Span::raw(" · "));
            footer.push(Span::styled("p period", theme.muted_style()));
        }
        AdminTab::Reports => {
            footer.push(Span::raw(" · "));
            footer.push(Span::styled("Enter run report", theme.muted_style()));
        }
        _ => {}
    }
    frame.render_widget(
        Paragraph::new(Line::from(footer)).block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(theme.border_style()),
        ),
        chunks[2],
    );

    if let Some(form) = app.admin.form.as_ref() {
        draw_form(frame, area, form, theme);
    }
    if let Some(pending) = app.admin.pending_delete {
        draw_confirm(
            frame,
            area,
            &format!("Delete {}? This cannot be undone.", pending.label()),
            theme,
        );
    }
}

fn draw_console_rows(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    rows: Vec<String>,
    error: Option<&str>,
    state: &mut ratatui::widgets::ListState,
    theme: &Theme,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    let items: Vec<ListItem> = if rows.is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "No rows.",
            theme.muted_style(),
        )))]
    } else {
        rows.into_iter()
            .map(|row| ListItem::new(Line::from(row)))
            .collect()
    };
    let list = List::new(items)
        .block(panel_block(title, theme))
        .highlight_style(theme.highlight_style())
        .highlight_symbol("▍ ");
    frame.render_stateful_widget(list, chunks[0], state);

    if let Some(error) = error {
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                error.to_string(),
                Style::default().fg(theme.error),
            ))),
            chunks[1],
        );
    }
}

fn draw_statistics(frame: &mut Frame, app: &mut App, area: Rect, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(0)])
        .split(area);

    let overview_lines = match app.admin.overview {
        Some(overview) => vec![
            Line::from(format!(
                "Stations: {}   Chargers: {}   Users: {}",
                overview.total_stations, overview.total_chargers, overview.total_users
            )),
            Line::from(format!("Active sessions: {}", overview.active_sessions)),
            Line::from(format!(
                "Revenue today: {}   Energy today: {:.1} kWh",
                format_vnd(overview.revenue_today),
                overview.energy_today
            )),
        ],
        None => vec![Line::from("No data yet. Press r to load.")],
    };
    frame.render_widget(
        Paragraph::new(overview_lines)
            .block(panel_block("Overview", theme))
            .wrap(Wrap { trim: true }),
        chunks[0],
    );

    let rows: Vec<String> = app
        .admin
        .revenue
        .iter()
        .map(|point| format!("{:<16} {:>14}", point.label, format_vnd(point.amount)))
        .collect();
    let title = format!("Revenue by {}", app.admin.revenue_period);
    draw_console_rows(
        frame,
        chunks[1],
        &title,
        rows,
        app.admin.error.as_deref(),
        &mut app.admin.table_state,
        theme,
    );
}

fn draw_reports(frame: &mut Frame, app: &mut App, area: Rect, theme: &Theme) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(area);

    let items: Vec<ListItem> = ReportKind::ALL
        .iter()
        .map(|kind| ListItem::new(Line::from(kind.label())))
        .collect();
    let list = List::new(items)
        .block(panel_block("Reports", theme))
        .highlight_style(theme.highlight_style())
        .highlight_symbol("▍ ");
    frame.render_stateful_widget(list, columns[0], &mut app.admin.report_state);

    let lines: Vec<Line> = match &app.admin.report {
        ReportData::None => vec![Line::from("Select a report and press Enter.")],
        ReportData::Summary(summary) => vec![
            Line::from(format!("Sessions:  {}", summary.total_sessions)),
            Line::from(format!("Energy:    {:.1} kWh", summary.total_energy)),
            Line::from(format!("Revenue:   {}", format_vnd(summary.total_revenue))),
            Line::from(format!("New users: {}", summary.new_users)),
        ],
        ReportData::Revenue(points) => points
            .iter()
            .map(|p| Line::from(format!("{:<16} {:>14}", p.label, format_vnd(p.amount))))
            .collect(),
        ReportData::Energy(points) => points
            .iter()
            .map(|p| Line::from(format!("{:<16} {:>10.1} kWh", p.label, p.kwh)))
            .collect(),
        ReportData::UserGrowth(points) => points
            .iter()
            .map(|p| Line::from(format!("{:<16} {:>8}", p.label, p.count)))
            .collect(),
        ReportData::TopStations(stations) => stations
            .iter()
            .map(|s| {
                Line::from(format!(
                    "{:<26} {:>5} sessions {:>14}",
                    truncate(&s.station_name, 25),
                    s.sessions,
                    format_vnd(s.revenue)
                ))
            })
            .collect(),
        ReportData::RecentSessions(sessions) => sessions
            .iter()
            .map(|s| {
                Line::from(format!(
                    "#{:<5} {:<22} {:>7.2} kWh {:>12} {}",
                    s.id,
                    truncate(&s.station_name, 21),
                    s.energy_consumed,
                    format_vnd(s.cost),
                    s.status.as_str()
                ))
            })
            .collect(),
    };
    let mut paragraph_lines = lines;
    if let Some(error) = app.admin.error.as_deref() {
        paragraph_lines.push(Line::from(""));
        paragraph_lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(theme.error),
        )));
    }
    frame.render_widget(
        Paragraph::new(paragraph_lines)
            .block(panel_block("Result", theme))
            .wrap(Wrap { trim: false }),
        columns[1],
    );
}

// --- staff console ---

fn draw_staff(frame: &mut Frame, app: &mut App, area: Rect, theme: &Theme) {
    let content = area.inner(Margin {
        vertical: 1,
        horizontal: 2,
    });
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(content);

    let titles: Vec<Line> = StaffTab::ALL
        .iter()
        .map(|tab| Line::from(tab.title()))
        .collect();
    let selected = StaffTab::ALL
        .iter()
        .position(|tab| *tab == app.staff.tab)
        .unwrap_or(0);
    let station_note = app
        .staff
        .selected_station
        .map(|id| format!("  station #{id}"))
        .unwrap_or_default();
    let tabs = Tabs::new(titles)
        .select(selected)
        .style(theme.muted_style())
        .highlight_style(theme.title_style())
        .divider("|");
    let tab_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(station_note.len() as u16)])
        .split(chunks[0]);
    frame.render_widget(tabs, tab_chunks[0]);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(station_note, theme.muted_style()))),
        tab_chunks[1],
    );

    match app.staff.tab {
        StaffTab::Stations => {
            let rows: Vec<String> = app
                .staff
                .stations
                .iter()
                .map(|station| {
                    format!(
                        "{:<5} {:<26} {:<12} {:>3} free",
                        station.id,
                        truncate(&station.name, 25),
                        station.status.as_deref().unwrap_or("—"),
                        station.available_chargers
                    )
                })
                .collect();
            draw_console_rows(frame, chunks[1], "Stations", rows, app.staff.error.as_deref(), &mut app.staff.table_state, theme);
        }
        StaffTab::Sessions => {
            let rows: Vec<String> = app
                .staff
                .sessions
                .iter()
                .map(|session| {
                    format!(
                        "#{:<5} {:<22} {:>7.2} kWh {:>12} {}",
                        session.id,
                        truncate(&session.station_name, 21),
                        session.energy_consumed,
                        format_vnd(session.cost),
                        session.status.as_str()
                    )
                })
                .collect();
            draw_console_rows(frame, chunks[1], "Sessions this shift", rows, app.staff.error.as_deref(), &mut app.staff.table_state, theme);
        }
        StaffTab::Payments => {
            let rows: Vec<String> = app
                .staff
                .sessions
                .iter()
                .map(|session| {
                    format!(
                        "#{:<5} {:<22} due {:>12} {}",
                        session.id,
                        truncate(&session.station_name, 21),
                        format_vnd(session.cost),
                        session.status.as_str()
                    )
                })
                .collect();
            draw_console_rows(frame, chunks[1], "Cash payments", rows, app.staff.error.as_deref(), &mut app.staff.table_state, theme);
        }
    }

    let mut footer = vec![
        Span::styled("Tab switch", theme.muted_style()),
        Span::raw(" · "),
        Span::styled("r refresh", theme.muted_style()),
        Span::raw(" · "),
        Span::styled("l logout", theme.muted_style()),
        Span::raw(" · "),
        Span::styled("q quit", theme.muted_style()),
    ];
    match app.staff.tab {
        StaffTab::Stations => {
            footer.push(Span::raw(" · "));
            footer.push(Span::styled("Enter select", theme.muted_style()));
            footer.push(Span::raw(" · "));
            footer.push(Span::styled("u cycle status", theme.muted_style()));
        }
        StaffTab::Sessions => {
            footer.push(Span::raw(" · "));
            footer.push(Span::styled("s start", theme.muted_style()));
            footer.push(Span::raw(" · "));
            footer.push(Span::styled("x stop", theme.muted_style()));
        }
        StaffTab::Payments => {
            footer.push(Span::raw(" · "));
            footer.push(Span::styled("Enter confirm cash", theme.muted_style()));
        }
    }
    frame.render_widget(
        Paragraph::new(Line::from(footer)).block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(theme.border_style()),
        ),
        chunks[2],
    );

    if let Some(form) = app.staff.form.as_ref() {
        draw_form(frame, area, form, theme);
    }
    if let Some(session_id) = app.staff.pending_stop {
        draw_confirm(
            frame,
            area,
            &format!("Stop session #{session_id}?"),
            theme,
        );
    }
}

// --- shared popups ---

fn draw_form(frame: &mut Frame, area: Rect, form: &FormPopup, theme: &Theme) {
    let height = (form.fields.len() as u16 * 2 + 8).min(area.height.saturating_sub(2));
    let percent_y = ((height as u32 * 100) / area.height.max(1) as u32).clamp(30, 90) as u16;
    let block = centered_rect(60, percent_y, area);
    frame.render_widget(Clear, block);

    let mut lines = Vec::new();
    for (index, field) in form.fields.iter().enumerate() {
        let active = index == form.active;
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<16}", field.label),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            if active {
                Span::styled(field.value.clone(), Style::default().fg(theme.accent))
            } else {
                Span::raw(field.value.clone())
            },
            if active { Span::raw("▌") } else { Span::raw("") },
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Tab next · Enter submit · Esc cancel",
        theme.muted_style(),
    )));
    if let Some(error) = form.error.as_deref() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(theme.error),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(panel_block(&form.title, theme))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, block);
}

fn draw_help(frame: &mut Frame, area: Rect, theme: &Theme) {
    let block = centered_rect(70, 70, area);
    frame.render_widget(Clear, block);

    let header_style = Style::default().add_modifier(Modifier::BOLD).fg(theme.accent);
    let key_style = Style::default().fg(theme.highlight);

    let rows = vec![
        Row::new(vec![Cell::from(Span::styled("Map", header_style)), Cell::from("")]),
        Row::new(vec![
            Cell::from(Span::styled("/", key_style)),
            Cell::from("Search stations by name or address"),
        ]),
        Row::new(vec![
            Cell::from(Span::styled("c / a", key_style)),
            Cell::from("Cycle connector / availability filter"),
        ]),
        Row::new(vec![
            Cell::from(Span::styled("Enter", key_style)),
            Cell::from("Book the selected station"),
        ]),
        Row::new(vec![
            Cell::from(Span::styled("o / p", key_style)),
            Cell::from("Charging history / profile"),
        ]),
        Row::new(vec![Cell::from(""), Cell::from("")]),
        Row::new(vec![
            Cell::from(Span::styled("Charging", header_style)),
            Cell::from(""),
        ]),
        Row::new(vec![
            Cell::from(Span::styled("s", key_style)),
            Cell::from("Stop charging and go to payment"),
        ]),
        Row::new(vec![Cell::from(""), Cell::from("")]),
        Row::new(vec![
            Cell::from(Span::styled("Consoles", header_style)),
            Cell::from(""),
        ]),
        Row::new(vec![
            Cell::from(Span::styled("Tab / 1-6", key_style)),
            Cell::from("Switch tabs"),
        ]),
        Row::new(vec![
            Cell::from(Span::styled("n / e / d", key_style)),
            Cell::from("Create / edit / delete the selected row"),
        ]),
        Row::new(vec![
            Cell::from(Span::styled("f, p", key_style)),
            Cell::from("Role filter (users), revenue period (statistics)"),
        ]),
        Row::new(vec![Cell::from(""), Cell::from("")]),
        Row::new(vec![
            Cell::from(Span::styled("Everywhere", header_style)),
            Cell::from(""),
        ]),
        Row::new(vec![
            Cell::from(Span::styled("r", key_style)),
            Cell::from("Refresh from the server"),
        ]),
        Row::new(vec![
            Cell::from(Span::styled("l", key_style)),
            Cell::from("Sign out"),
        ]),
        Row::new(vec![
            Cell::from(Span::styled("q", key_style)),
            Cell::from("Quit"),
        ]),
    ];

    let table = Table::new(rows, [Constraint::Length(14), Constraint::Min(10)])
        .block(panel_block("Help (h or Esc to close)", theme));
    frame.render_widget(table, block);
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        let mut out: String = value.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
