use std::time::{Duration, Instant};

use alloy_primitives::U256;

/// 0.0001 ether, added to every quote before it funds a message.
pub const DEFAULT_SAFETY_MARGIN_WEI: U256 = U256::from_limbs([100_000_000_000_000, 0, 0, 0]);

/// How long a quote may be used after it was taken.
pub const DEFAULT_STALENESS_WINDOW: Duration = Duration::from_secs(60);

/// Native fee the bridge charges to deliver one message, as quoted at `quoted_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeQuote {
    pub native_fee_wei: U256,
    pub dst_bridge_chain_code: u16,
    pub quoted_at: Instant,
}

/// Source of the current time for staleness checks.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    pub safety_margin_wei: U256,
    pub staleness_window: Duration,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            safety_margin_wei: DEFAULT_SAFETY_MARGIN_WEI,
            staleness_window: DEFAULT_STALENESS_WINDOW,
        }
    }
}

impl FeePolicy {
    /// Whether `quote` is older than the staleness window at `now`.
    pub fn is_stale(&self, quote: &FeeQuote, now: Instant) -> bool {
        match quote.quoted_at.checked_add(self.staleness_window) {
            Some(expires_at) => now > expires_at,
            None => false,
        }
    }

    /// The value to attach to the message: the quote plus the safety margin.
    pub fn funded_fee(&self, quote: &FeeQuote) -> U256 {
        quote.native_fee_wei.saturating_add(self.safety_margin_wei)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote() -> FeeQuote {
        FeeQuote {
            native_fee_wei: U256::from(5_000u64),
            dst_bridge_chain_code: 10214,
            quoted_at: Instant::now(),
        }
    }

    #[test]
    fn margin_is_one_ten_thousandth_ether() {
        assert_eq!(
            DEFAULT_SAFETY_MARGIN_WEI,
            U256::from(10u64).pow(U256::from(14))
        );
        let quote = quote();
        let policy = FeePolicy::default();
        assert_eq!(
            policy.funded_fee(&quote),
            quote.native_fee_wei + DEFAULT_SAFETY_MARGIN_WEI
        );
        assert!(policy.funded_fee(&quote) >= quote.native_fee_wei);
    }

    #[test]
    fn stale_only_after_window() {
        let quote = quote();
        let policy = FeePolicy::default();
        assert!(!policy.is_stale(&quote, quote.quoted_at));
        assert!(!policy.is_stale(&quote, quote.quoted_at + DEFAULT_STALENESS_WINDOW));
        assert!(policy.is_stale(
            &quote,
            quote.quoted_at + DEFAULT_STALENESS_WINDOW + Duration::from_millis(1)
        ));
    }
}
