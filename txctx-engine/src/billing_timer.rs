//! A pausable, monotone CPU-time accumulator running alongside wall time.
//! `pause`/`resume` bracket any operation the transaction should not be
//! charged for, such as subjective validation performed between VM
//! invocations.

use txctx_core::error::DeadlineExceptionKind;
use txctx_core::primitives::{Microseconds, TimePoint};

/// The timer's mutable state, embedded in `TransactionContext`. Kept as its
/// own small struct so pause/resume can be unit-tested in isolation from
/// the rest of the context, the way `magicblock-bank::bank_helpers` isolates
/// pure helpers from `Bank` itself.
#[derive(Debug, Clone, Copy)]
pub struct BillingTimer {
    /// Virtual start of the billing window. Zero means paused.
    pub pseudo_start: TimePoint,
    /// Accumulated CPU across every paused interval so far.
    pub billed_time: Microseconds,
    /// Maximum CPU the timer may accrue before `billing_timer_exception_code`
    /// would fire, set once by `init` and never widened.
    pub billing_timer_duration_limit: Microseconds,
    pub deadline: TimePoint,
    pub deadline_exception_code: DeadlineExceptionKind,
    pub billing_timer_exception_code: DeadlineExceptionKind,
    /// If set, the timer never runs: `update_billed_cpu_time` always
    /// returns this figure and pause/resume are no-ops.
    pub explicit_billed_cpu_time: Option<Microseconds>,
}

impl BillingTimer {
    pub fn paused(&self) -> bool {
        self.pseudo_start.is_zero()
    }

    /// No-op when explicit or already paused; otherwise freezes
    /// `billed_time` and forces the deadline exception code to the caller's
    /// hard wall-clock deadline, since that is the only thing that can still
    /// fire while billing is suspended.
    pub fn pause(&mut self, now: TimePoint) {
        if self.explicit_billed_cpu_time.is_some() || self.paused() {
            return;
        }
        self.billed_time = now - self.pseudo_start;
        self.deadline_exception_code = DeadlineExceptionKind::DeadlineException;
        self.pseudo_start = TimePoint::ZERO;
    }

    /// No-op when explicit or already running; otherwise rebases
    /// `pseudo_start` from the accumulated `billed_time` and recomputes the
    /// deadline against the caller's hard deadline.
    pub fn resume(&mut self, now: TimePoint, caller_deadline: TimePoint) {
        if self.explicit_billed_cpu_time.is_some() || !self.paused() {
            return;
        }
        self.pseudo_start = now.saturating_sub(self.billed_time);
        if self.pseudo_start + self.billing_timer_duration_limit <= caller_deadline {
            self.deadline = self.pseudo_start + self.billing_timer_duration_limit;
            self.deadline_exception_code = self.billing_timer_exception_code;
        } else {
            self.deadline = caller_deadline;
            self.deadline_exception_code = DeadlineExceptionKind::DeadlineException;
        }
    }

    /// Either the caller-provided figure, or the elapsed unpaused time
    /// floored at the protocol minimum.
    pub fn update_billed_cpu_time(
        &self,
        now: TimePoint,
        min_tx_cpu_usage: Microseconds,
    ) -> Microseconds {
        if let Some(explicit) = self.explicit_billed_cpu_time {
            return explicit;
        }
        (now - self.pseudo_start).max(min_tx_cpu_usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer() -> BillingTimer {
        BillingTimer {
            pseudo_start: TimePoint(0),
            billed_time: Microseconds::ZERO,
            billing_timer_duration_limit: Microseconds(100),
            deadline: TimePoint(100),
            deadline_exception_code: DeadlineExceptionKind::BlockCpuUsageExceeded,
            billing_timer_exception_code: DeadlineExceptionKind::BlockCpuUsageExceeded,
            explicit_billed_cpu_time: None,
        }
    }

    #[test]
    fn pause_then_resume_rebases_deadline() {
        let mut t = timer();
        t.pause(TimePoint(20));
        assert_eq!(t.billed_time, Microseconds(20));
        assert!(t.paused());

        t.resume(TimePoint(50), TimePoint(u64::MAX));
        assert_eq!(t.pseudo_start, TimePoint(30));
        assert_eq!(t.deadline, TimePoint(130));
    }

    #[test]
    fn pause_resume_idempotent() {
        let mut a = timer();
        a.pause(TimePoint(10));
        a.pause(TimePoint(10));
        a.resume(TimePoint(10), TimePoint(u64::MAX));
        a.resume(TimePoint(10), TimePoint(u64::MAX));

        let mut b = timer();
        b.pause(TimePoint(10));
        b.resume(TimePoint(10), TimePoint(u64::MAX));

        assert_eq!(a.pseudo_start, b.pseudo_start);
        assert_eq!(a.billed_time, b.billed_time);
        assert_eq!(a.deadline, b.deadline);
    }

    #[test]
    fn resume_falls_back_to_caller_deadline_when_tighter() {
        let mut t = timer();
        t.billing_timer_duration_limit = Microseconds(1_000);
        t.pause(TimePoint(0));
        t.resume(TimePoint(0), TimePoint(5));
        assert_eq!(t.deadline, TimePoint(5));
        assert_eq!(t.deadline_exception_code, DeadlineExceptionKind::DeadlineException);
    }

    #[test]
    fn explicit_billed_time_short_circuits_pause_resume() {
        let mut t = timer();
        t.explicit_billed_cpu_time = Some(Microseconds(30_000));
        t.pause(TimePoint(20));
        assert!(!t.paused(), "pause must be a no-op under explicit billing");
        t.resume(TimePoint(20), TimePoint(u64::MAX));
        assert_eq!(
            t.update_billed_cpu_time(TimePoint(999), Microseconds(100)),
            Microseconds(30_000)
        );
    }
}
