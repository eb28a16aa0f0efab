//! Spoken announcement text for a call.
//!
//! Numbers are read with Sino-Korean numerals, one group per place value:
//! `256` becomes `이백 오십 육`, `123` becomes `일백 이십 삼`.

use crate::model::{OrderNumber, OrderType};

const DIGITS: [&str; 10] = ["", "일", "이", "삼", "사", "오", "육", "칠", "팔", "구"];

/// Reads `n` in Korean. Values outside `0..=999` fall back to decimal digits.
pub fn number_to_korean(n: u32) -> String {
    if n == 0 {
        return "영".to_string();
    }
    if n > 999 {
        return n.to_string();
    }

    let mut parts: Vec<String> = Vec::with_capacity(3);

    let hundreds = (n / 100) as usize;
    if hundreds > 0 {
        parts.push(format!("{}백", DIGITS[hundreds]));
    }

    let tens = ((n % 100) / 10) as usize;
    match tens {
        0 => {}
        1 => parts.push("십".to_string()),
        t => parts.push(format!("{}십", DIGITS[t])),
    }

    let ones = (n % 10) as usize;
    if ones > 0 {
        parts.push(DIGITS[ones].to_string());
    }

    parts.join(" ")
}

fn order_type_label(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Takeout => "포장",
        OrderType::DineIn => "매장",
    }
}

/// Text spoken for a call, e.g. `포장 십 이번 고객님`.
pub fn announcement_text(order_type: OrderType, number: OrderNumber) -> String {
    format!(
        "{} {}번 고객님",
        order_type_label(order_type),
        number_to_korean(number.get() as u32)
    )
}
