//! Reference documentation for the burn-rate alerting model.

/// Explains multiwindow burn-rate alerting, printed by `margin explain burn-rate`.
pub fn explain_burn_rate() -> &'static str {
    "\
Burn rate measures how fast a service is consuming its error budget.

A burn rate of 1 means the budget is being spent exactly at the rate that
would exhaust it at the end of the compliance window. A burn rate of 14.4
over a 30 day window spends the whole budget in about 2 days.

Each SLO gets two burn-rate alerts:

  fast-burn   windows 5m and 1h, threshold 14.4, severity page
              Catches sharp incidents that would exhaust the budget in
              hours. Both windows must exceed the threshold, which keeps
              short metric blips from paging anyone.

  slow-burn   windows 30m and 6h, threshold 6.0, severity ticket
              Catches sustained low-grade burn that would exhaust the
              budget in days. This files a ticket instead of paging.

The two-window form is the multiwindow, multi-burn-rate pattern from the
SRE workbook: the long window confirms the burn is real, the short window
makes the alert reset quickly once the incident is over.

Per-SLO overrides in the spec replace a profile wholesale: both windows
and the threshold must be given together.\n"
}
