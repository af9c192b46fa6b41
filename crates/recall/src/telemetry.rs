// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured log events of [`MemoCache`](crate::MemoCache), emitted through `tracing` when the
//! `logs` feature is enabled.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheActivity {
    Hit,
    Miss,
    Inserted,
}

impl CacheActivity {
    #[cfg_attr(not(any(feature = "logs", test)), expect(dead_code, reason = "only logged with the `logs` feature"))]
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::Miss => "cache.miss",
            Self::Inserted => "cache.inserted",
        }
    }
}

#[cfg(feature = "logs")]
pub(crate) fn emit(cache_name: &'static str, activity: CacheActivity) {
    let activity_name = activity.as_str();

    // Tracing level must be constant, so the level is selected through a macro.
    macro_rules! emit_event {
        ($level:ident) => {
            tracing::$level!(cache.name = cache_name, cache.activity = activity_name, "cache.event")
        };
    }

    match activity {
        CacheActivity::Hit | CacheActivity::Miss => emit_event!(debug),
        CacheActivity::Inserted => emit_event!(trace),
    }
}

#[cfg(not(feature = "logs"))]
#[inline]
pub(crate) const fn emit(_cache_name: &'static str, _activity: CacheActivity) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_names() {
        assert_eq!(CacheActivity::Hit.as_str(), "cache.hit");
        assert_eq!(CacheActivity::Miss.as_str(), "cache.miss");
        assert_eq!(CacheActivity::Inserted.as_str(), "cache.inserted");
    }

    #[cfg(feature = "logs")]
    #[test]
    fn events_carry_name_and_activity() {
        use crate::testing::LogCapture;

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        emit("fib", CacheActivity::Miss);

        capture.assert_contains("cache.event");
        capture.assert_contains("cache.name=\"fib\"");
        capture.assert_contains("cache.activity=\"cache.miss\"");
        capture.assert_contains("DEBUG");
    }

    #[cfg(feature = "logs")]
    #[test]
    fn inserts_are_traced() {
        use crate::testing::LogCapture;

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        emit("fib", CacheActivity::Inserted);

        capture.assert_contains("TRACE");
        capture.assert_contains("cache.inserted");
    }

    #[cfg(not(feature = "logs"))]
    #[test]
    fn emit_is_a_no_op_without_logs() {
        emit("fib", CacheActivity::Hit);
    }
}
