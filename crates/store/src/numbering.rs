//! Order number allocation.

use common::OrderNumber;

/// Computes the number for the next order from the most recently inserted
/// one.
///
/// Callers must hold the store's checkout critical section so that the read
/// of `last` and the insert of the result are not interleaved with another
/// checkout.
pub fn next_order_number(last: Option<&OrderNumber>) -> OrderNumber {
    if let Some(last) = last
        && !last.is_well_formed()
    {
        tracing::warn!(
            last = %last,
            floor = OrderNumber::FALLBACK_FLOOR,
            "stored order number has no numeric suffix, restarting from floor"
        );
        metrics::counter!("order_number_fallbacks_total").increment(1);
    }
    OrderNumber::next_after(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_order_number() {
        assert_eq!(next_order_number(None).as_str(), "SO1001");
    }

    #[test]
    fn test_successor() {
        let last = OrderNumber::new("SO1015");
        assert_eq!(next_order_number(Some(&last)).as_str(), "SO1016");
    }

    #[test]
    fn test_malformed_falls_back() {
        let last = OrderNumber::new("SO10x6");
        assert_eq!(next_order_number(Some(&last)).as_str(), "SO1001");
    }
}
