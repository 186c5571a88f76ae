//! Seat numbering. Players bet on odd seats; the even seat right after one is
//! reserved for the second hand of a split.

use crate::errors::domain::{DomainError, ValidationKind};

pub const BETTING_SEATS: [i16; 7] = [1, 3, 5, 7, 9, 11, 13];

pub fn is_betting_seat(seat: i16) -> bool {
    BETTING_SEATS.contains(&seat)
}

pub fn ensure_betting_seat(seat: i16) -> Result<i16, DomainError> {
    if is_betting_seat(seat) {
        Ok(seat)
    } else {
        Err(DomainError::validation(
            ValidationKind::InvalidSeat,
            "Seat number is out of range",
        ))
    }
}

/// Seat that receives the second hand when `seat` splits.
pub fn split_seat(seat: i16) -> i16 {
    seat + 1
}

pub fn is_split_seat(seat: i16) -> bool {
    seat % 2 == 0
}

/// Betting seat that owns `seat` (itself for odd seats).
pub fn owner_seat(seat: i16) -> i16 {
    if is_split_seat(seat) {
        seat - 1
    } else {
        seat
    }
}

/// Insert a split seat into a turn order right after the seat it came from.
pub fn insert_split_seat(order: &mut Vec<i16>, seat: i16) {
    let sibling = split_seat(seat);
    if order.contains(&sibling) {
        return;
    }
    match order.iter().position(|s| *s == seat) {
        Some(idx) => order.insert(idx + 1, sibling),
        None => order.push(sibling),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_odd_seats_take_bets() {
        for seat in BETTING_SEATS {
            assert!(ensure_betting_seat(seat).is_ok());
        }
        for seat in [0, 2, 14, 15, -1] {
            assert!(ensure_betting_seat(seat).is_err());
        }
    }

    #[test]
    fn split_seat_joins_order_after_origin() {
        let mut order = vec![1, 5, 9];
        insert_split_seat(&mut order, 5);
        assert_eq!(order, vec![1, 5, 6, 9]);
        insert_split_seat(&mut order, 5);
        assert_eq!(order, vec![1, 5, 6, 9]);
        assert_eq!(owner_seat(6), 5);
        assert_eq!(owner_seat(9), 9);
    }
}
