//! Payment simulation for the booking flow. Amounts are VND. No real
//! payment rail is involved and the OTP has no delivery channel.

pub const MSG_INSUFFICIENT_BALANCE: &str = "Số dư ví không đủ!";
pub const MSG_MISSING_BOOKING: &str = "Không có thông tin trạm sạc. Vui lòng đặt lại.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    Flexible,
    Single,
    Monthly,
}

impl Plan {
    pub const ALL: [Plan; 3] = [Plan::Flexible, Plan::Single, Plan::Monthly];

    pub fn label(&self) -> &'static str {
        match self {
            Plan::Flexible => "Gói Linh Hoạt",
            Plan::Single => "Gói Một Lần",
            Plan::Monthly => "Gói Tháng",
        }
    }

    /// The flexible plan bills the actual session cost; the placeholder
    /// applies when payment is reached from a map booking, where no
    /// session exists yet.
    pub fn amount(&self, session_cost: Option<i64>) -> i64 {
        match self {
            Plan::Flexible => session_cost.unwrap_or(51_000),
            Plan::Single => 60_000,
            Plan::Monthly => 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Wallet,
    Bank,
    Card,
}

impl Method {
    pub const ALL: [Method; 3] = [Method::Wallet, Method::Bank, Method::Card];

    pub fn label(&self) -> &'static str {
        match self {
            Method::Wallet => "Ví EV",
            Method::Bank => "Ngân hàng",
            Method::Card => "Thẻ tín dụng",
        }
    }

    pub fn needs_otp(&self) -> bool {
        !matches!(self, Method::Wallet)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletOutcome {
    Paid { deducted: i64, remaining: i64 },
    InsufficientBalance,
}

pub fn wallet_payment(balance: i64, total: i64) -> WalletOutcome {
    if balance >= total {
        WalletOutcome::Paid {
            deducted: total,
            remaining: balance - total,
        }
    } else {
        WalletOutcome::InsufficientBalance
    }
}

/// The simulated OTP accepts exactly six digits.
pub fn validate_otp(input: &str) -> bool {
    input.len() == 6 && input.chars().all(|ch| ch.is_ascii_digit())
}

pub fn wallet_success_message(deducted: i64, remaining: i64) -> String {
    format!(
        "Thanh toán thành công bằng Ví EV! Đã trừ: {} · Số dư còn lại: {}",
        format_vnd(deducted),
        format_vnd(remaining)
    )
}

pub fn method_success_message(method: Method) -> String {
    format!("Thanh toán thành công bằng {}!", method.label())
}

/// VND with dot thousands separators, e.g. 51000 -> "51.000đ".
pub fn format_vnd(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-{grouped}đ")
    } else {
        format!("{grouped}đ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_balance_is_rejected() {
        assert_eq!(
            wallet_payment(50_000, 60_000),
            WalletOutcome::InsufficientBalance
        );
    }

    #[test]
    fn sufficient_balance_deducts_the_total() {
        assert_eq!(
            wallet_payment(80_000, 60_000),
            WalletOutcome::Paid {
                deducted: 60_000,
                remaining: 20_000
            }
        );
        assert_eq!(
            wallet_payment(60_000, 60_000),
            WalletOutcome::Paid {
                deducted: 60_000,
                remaining: 0
            }
        );
    }

    #[test]
    fn otp_requires_exactly_six_digits() {
        assert!(validate_otp("123456"));
        assert!(!validate_otp("12345"));
        assert!(!validate_otp("1234567"));
        assert!(!validate_otp("12345a"));
        assert!(!validate_otp(""));
    }

    #[test]
    fn plan_amounts_match_the_price_table() {
        assert_eq!(Plan::Single.amount(None), 60_000);
        assert_eq!(Plan::Monthly.amount(None), 1_000_000);
        assert_eq!(Plan::Flexible.amount(None), 51_000);
        assert_eq!(Plan::Flexible.amount(Some(84_500)), 84_500);
        assert_eq!(Plan::Single.amount(Some(84_500)), 60_000);
    }

    #[test]
    fn vnd_formatting_groups_thousands_with_dots() {
        assert_eq!(format_vnd(0), "0đ");
        assert_eq!(format_vnd(500), "500đ");
        assert_eq!(format_vnd(51_000), "51.000đ");
        assert_eq!(format_vnd(1_000_000), "1.000.000đ");
        assert_eq!(format_vnd(-3_500), "-3.500đ");
    }
}
