#![allow(unused)]
use std::cell::RefCell;
use std::time::Duration;

/// One entry per pipeline stage of the PIC step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Deposit,
    FieldSolve,
    Push,
    Relocate,
    Inject,
}

impl Stage {
    const ALL: [Stage; 5] = [
        Stage::Deposit,
        Stage::FieldSolve,
        Stage::Push,
        Stage::Relocate,
        Stage::Inject,
    ];

    fn label(self) -> &'static str {
        match self {
            Stage::Deposit => "Distribute charge",
            Stage::FieldSolve => "Field solve",
            Stage::Push => "Push particles",
            Stage::Relocate => "Relocate particles",
            Stage::Inject => "Inject particles",
        }
    }
}

#[derive(Default, Clone)]
pub struct TimingStats {
    pub stage_times: [Vec<Duration>; 5],
    pub total_time: Duration,
}

impl TimingStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(feature = "timing")]
    pub fn print_summary(&self) {
        if self.stage_times.iter().all(|t| t.is_empty()) {
            return;
        }

        let accounted: Duration = self.stage_times.iter().flatten().sum();
        let overhead = self.total_time.saturating_sub(accounted);

        println!("\n{}", "=".repeat(60));
        println!("{:^60}", "STEP TIMING SUMMARY");
        println!("{}", "=".repeat(60));
        println!(
            "Total simulation time:         {:.3}s",
            self.total_time.as_secs_f64()
        );
        println!("{}", "-".repeat(60));
        for (i, stage) in Stage::ALL.iter().enumerate() {
            let times = &self.stage_times[i];
            if times.is_empty() {
                continue;
            }
            let total: Duration = times.iter().sum();
            println!(
                "  {:<22} {:>9.3}s   (avg: {:>9.3}ms)",
                stage.label(),
                total.as_secs_f64(),
                total.as_secs_f64() * 1000.0 / times.len() as f64
            );
        }
        println!("{}", "=".repeat(60));
        println!(
            "Overhead/Other:                {:>9.3}ms\n",
            overhead.as_secs_f64() * 1000.0
        );
    }

    #[cfg(not(feature = "timing"))]
    pub fn print_summary(&self) {}
}

#[cfg(feature = "timing")]
thread_local! {
    static TIMING_STATS: RefCell<TimingStats> = RefCell::new(TimingStats::new());
}

#[cfg(feature = "timing")]
pub fn reset_timing() {
    TIMING_STATS.with(|stats| {
        *stats.borrow_mut() = TimingStats::new();
    });
}

#[cfg(not(feature = "timing"))]
pub fn reset_timing() {}

#[cfg(feature = "timing")]
pub fn record_stage<F, R>(stage: Stage, f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = std::time::Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    TIMING_STATS.with(|stats| {
        stats.borrow_mut().stage_times[stage as usize].push(elapsed);
    });
    result
}

#[cfg(not(feature = "timing"))]
pub fn record_stage<F, R>(_stage: Stage, f: F) -> R
where
    F: FnOnce() -> R,
{
    f()
}

#[cfg(feature = "timing")]
pub fn finalize_and_print(total_time: Duration) {
    TIMING_STATS.with(|stats| {
        let mut s = stats.borrow_mut();
        s.total_time = total_time;
        s.print_summary();
    });
}

#[cfg(not(feature = "timing"))]
pub fn finalize_and_print(_total_time: Duration) {}
