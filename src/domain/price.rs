//! Free-text price parsing for crawled listings.

/// Words crawlers use for giveaways.
const FREE_MARKERS: [&str; 3] = ["무료", "free", "나눔"];

/// Parses a crawled price string into whole currency units.
///
/// Only the first run of digits counts, so `"12,900원 (배송비 3,000원)"` parses
/// as 12900 and `"17,800원 (무료배송)"` as 17800. A giveaway marker yields
/// `Some(0)` only when the text carries no amount; otherwise `None`.
pub fn parse_price(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    match first_amount(trimmed) {
        Amount::Found(value) => Some(value),
        Amount::Overflow => None,
        Amount::Absent => {
            let lowered = trimmed.to_lowercase();
            FREE_MARKERS
                .iter()
                .any(|marker| lowered.contains(marker))
                .then_some(0)
        }
    }
}

enum Amount {
    Found(i64),
    Overflow,
    Absent,
}

fn first_amount(text: &str) -> Amount {
    let mut value: i64 = 0;
    let mut seen_digit = false;
    for ch in text.chars() {
        match ch {
            '0'..='9' => {
                let digit = i64::from(ch as u8 - b'0');
                match value.checked_mul(10).and_then(|v| v.checked_add(digit)) {
                    Some(next) => value = next,
                    None => return Amount::Overflow,
                }
                seen_digit = true;
            }
            ',' if seen_digit => {}
            _ if seen_digit => break,
            _ => {}
        }
    }

    if seen_digit {
        Amount::Found(value)
    } else {
        Amount::Absent
    }
}
