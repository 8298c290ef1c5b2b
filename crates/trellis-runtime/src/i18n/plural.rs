//! Plural categories per locale.
//!
//! Rules follow the CLDR cardinal rules, evaluated on the operands of the
//! number as written: `n` absolute value, `i` integer digits, `v` count of
//! visible fraction digits.

/// CLDR plural category.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PluralCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::One => "one",
            Self::Two => "two",
            Self::Few => "few",
            Self::Many => "many",
            Self::Other => "other",
        }
    }
}

struct Operands {
    n: f64,
    i: u64,
    v: usize,
}

impl Operands {
    fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let n: f64 = value.parse().ok()?;
        if !n.is_finite() {
            return None;
        }
        let digits = value.trim_start_matches(['-', '+']);
        let v = digits.split_once('.').map_or(0, |(_, frac)| frac.len());
        Some(Self {
            n: n.abs(),
            i: n.abs().trunc() as u64,
            v,
        })
    }

    fn is_integer(&self) -> bool {
        self.n.fract() == 0.0
    }
}

/// Language part of a locale id: `en-US`, `en_US` and `EN` all give `en`.
fn language(locale: &str) -> String {
    locale
        .split(['-', '_'])
        .next()
        .unwrap_or("en")
        .to_ascii_lowercase()
}

/// Plural category of `value` (a number as text) in `locale`.
///
/// Text that does not parse as a number is `other`; unknown locales use
/// the English rule.
pub fn get_plural_case(value: &str, locale: &str) -> PluralCategory {
    let Some(ops) = Operands::parse(value) else {
        return PluralCategory::Other;
    };
    let (i, v) = (ops.i, ops.v);
    match language(locale).as_str() {
        "ja" | "zh" | "ko" => PluralCategory::Other,
        "fr" => {
            if i <= 1 {
                PluralCategory::One
            } else if v == 0 && i != 0 && i % 1_000_000 == 0 {
                PluralCategory::Many
            } else {
                PluralCategory::Other
            }
        }
        "pt" => {
            if i <= 1 {
                PluralCategory::One
            } else {
                PluralCategory::Other
            }
        }
        "es" => {
            if ops.n == 1.0 {
                PluralCategory::One
            } else {
                PluralCategory::Other
            }
        }
        "ru" | "uk" => slavic(i, v),
        "pl" => {
            if i == 1 && v == 0 {
                PluralCategory::One
            } else if v == 0 && (2..=4).contains(&(i % 10)) && !(12..=14).contains(&(i % 100)) {
                PluralCategory::Few
            } else if v == 0 {
                PluralCategory::Many
            } else {
                PluralCategory::Other
            }
        }
        "cs" => {
            if i == 1 && v == 0 {
                PluralCategory::One
            } else if (2..=4).contains(&i) && v == 0 {
                PluralCategory::Few
            } else if v != 0 {
                PluralCategory::Many
            } else {
                PluralCategory::Other
            }
        }
        "ar" => arabic(&ops),
        _ => {
            if i == 1 && v == 0 {
                PluralCategory::One
            } else {
                PluralCategory::Other
            }
        }
    }
}

fn slavic(i: u64, v: usize) -> PluralCategory {
    if v != 0 {
        return PluralCategory::Other;
    }
    let (m10, m100) = (i % 10, i % 100);
    if m10 == 1 && m100 != 11 {
        PluralCategory::One
    } else if (2..=4).contains(&m10) && !(12..=14).contains(&m100) {
        PluralCategory::Few
    } else {
        PluralCategory::Many
    }
}

fn arabic(ops: &Operands) -> PluralCategory {
    if !ops.is_integer() {
        return PluralCategory::Other;
    }
    let n = ops.i;
    match (n, n % 100) {
        (0, _) => PluralCategory::Zero,
        (1, _) => PluralCategory::One,
        (2, _) => PluralCategory::Two,
        (_, 3..=10) => PluralCategory::Few,
        (_, 11..=99) => PluralCategory::Many,
        _ => PluralCategory::Other,
    }
}
