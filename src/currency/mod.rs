use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::progressive::ProgressionSide;

/// ISO 4217 currency representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CurrencyCode(pub String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new("ZMW")
    }
}

/// Locale-aware formatting preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocaleConfig {
    pub language_tag: String,
    pub decimal_separator: char,
    pub grouping_separator: char,
    #[serde(default)]
    pub currency: CurrencyCode,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            language_tag: "en-ZM".into(),
            decimal_separator: '.',
            grouping_separator: ',',
            currency: CurrencyCode::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FormatOptions {
    pub currency_display: CurrencyDisplay,
    pub negative_style: NegativeStyle,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum NegativeStyle {
    #[default]
    Sign,
    Parentheses,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CurrencyDisplay {
    #[default]
    Symbol,
    Code,
}

pub fn symbol_for(code: &str) -> String {
    match code {
        "ZMW" | "ZMK" => "K".into(),
        "USD" => "$".into(),
        "EUR" => "€".into(),
        "GBP" => "£".into(),
        _ => code.into(),
    }
}

pub fn minor_units_for(code: &str) -> u32 {
    match code {
        "JPY" => 0,
        "KWD" | "BHD" => 3,
        _ => 2,
    }
}

/// Rounds half away from zero to `precision` places and groups the integer part.
pub fn format_number(locale: &LocaleConfig, value: Decimal, precision: u32) -> String {
    let mut rounded =
        value.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(precision);
    let body = rounded.to_string();
    let (sign, unsigned) = match body.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", body.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned, None),
    };
    let mut out = format!("{}{}", sign, group_digits(int_part, locale.grouping_separator));
    if let Some(frac) = frac_part {
        out.push(locale.decimal_separator);
        out.push_str(frac);
    }
    out
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::new();
    for (count, ch) in digits.chars().rev().enumerate() {
        if count != 0 && count % 3 == 0 {
            grouped.insert(0, separator);
        }
        grouped.insert(0, ch);
    }
    grouped
}

pub fn format_currency_value(
    amount: Decimal,
    code: &CurrencyCode,
    locale: &LocaleConfig,
    options: &FormatOptions,
) -> String {
    let precision = minor_units_for(code.as_str());
    let mut body = format_number(locale, amount.abs(), precision);
    // Rounding can turn a tiny negative into zero; never print "-0.00".
    if amount.is_sign_negative() && body.chars().any(|c| c.is_ascii_digit() && c != '0') {
        body = match options.negative_style {
            NegativeStyle::Sign => format!("-{body}"),
            NegativeStyle::Parentheses => format!("({body})"),
        };
    }
    match options.currency_display {
        CurrencyDisplay::Symbol => format!("{} {}", symbol_for(code.as_str()), body),
        CurrencyDisplay::Code => format!("{} {}", code.as_str(), body),
    }
}

/// `K 1,234.50` style rendering in the locale's currency.
pub fn format_amount(amount: Decimal, locale: &LocaleConfig) -> String {
    format_currency_value(amount, &locale.currency, locale, &FormatOptions::default())
}

/// Explicitly signed delta, e.g. `+K 70.00` or `-K 100.00`.
pub fn format_delta(delta: Decimal, locale: &LocaleConfig) -> String {
    let sign = if delta.is_sign_negative() && !delta.is_zero() {
        "-"
    } else {
        "+"
    };
    format!("{}{}", sign, format_amount(delta.abs(), locale))
}

/// One side of a transfer step: just the signed amount when the account had
/// not moved yet, otherwise `before → after`.
pub fn format_progression(
    before: Decimal,
    after: Decimal,
    amount: Decimal,
    side: ProgressionSide,
    locale: &LocaleConfig,
) -> String {
    if before.is_zero() {
        let signed = match side {
            ProgressionSide::From => -amount.abs(),
            ProgressionSide::To => amount.abs(),
        };
        return format_amount(signed, locale);
    }
    format!(
        "{} → {}",
        format_amount(before, locale),
        format_amount(after, locale)
    )
}
