//! Cache key layout.

pub fn balance(identity_key: &str) -> String {
    identity_key.to_string()
}

pub fn seat_claim(round_id: i64, seat: i16) -> String {
    format!("{round_id}:{seat}")
}

pub fn seat_order(round_id: i64) -> String {
    format!("{round_id}:seats")
}

pub fn taken_seats(table_id: &str) -> String {
    format!("{table_id}:taken_seats")
}

pub fn dealer_name(table_id: &str) -> String {
    format!("{table_id}:dealer_name")
}

pub fn merchant_config(merchant_id: &str, table_id: &str) -> String {
    format!("{merchant_id}:{table_id}")
}

pub fn repeat_data(identity_key: &str, round_id: i64) -> String {
    format!("{identity_key}:{round_id}")
}
