//! Scan command with progress reporting

use indicatif::{ProgressBar, ProgressStyle};
use radc_core::bus::CancelToken;
use radc_core::command::Command;
use radc_core::session::Outcome;
use radc_core::voltage::AdcSample;

use super::{print_outcome, print_sample, DynSession};

fn create_progress_bar(total: u64) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} samples {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Run a scan that stops early once `cancel` fires
///
/// The token is re-armed first, so a cancellation left over from an
/// earlier scan does not end this one.
pub fn run_scan<F>(session: &mut DynSession, cancel: &CancelToken, on_sample: F) -> radc_core::Result<Outcome>
where
    F: FnMut(AdcSample),
{
    cancel.reset();
    session.execute(Command::Scan, Some(cancel), on_sample)
}

/// Run one scan, showing a progress bar or printing every sample
pub fn cmd_scan(
    session: &mut DynSession,
    cancel: &CancelToken,
    show_progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let total = session.cycle().scan_samples();
    let digits = session.digits();
    let mut voltages = Vec::with_capacity(total);

    let outcome = if show_progress {
        let pb = create_progress_bar(total as u64).unwrap_or_else(|_| ProgressBar::new(total as u64));
        let outcome = run_scan(session, cancel, |sample| {
            voltages.push(sample.voltage);
            if let Ok(v) = sample.display(digits) {
                pb.set_message(format!("{} V", v));
            }
            pb.inc(1);
        });
        pb.finish_and_clear();
        outcome?
    } else {
        let mut samples = Vec::with_capacity(total);
        let outcome = run_scan(session, cancel, |sample| samples.push(sample));
        for sample in &samples {
            voltages.push(sample.voltage);
            print_sample(session, sample)?;
        }
        outcome?
    };

    print_outcome(session, &outcome)?;
    if let (Outcome::Scan(_), Some(summary)) = (&outcome, Summary::of(&voltages)) {
        println!(
            "min {} V, max {} V, mean {} V",
            radc_core::voltage::format_display(summary.min, digits)?,
            radc_core::voltage::format_display(summary.max, digits)?,
            radc_core::voltage::format_display(summary.mean, digits)?,
        );
    }
    Ok(())
}

struct Summary {
    min: f32,
    max: f32,
    mean: f32,
}

impl Summary {
    fn of(voltages: &[f32]) -> Option<Self> {
        if voltages.is_empty() {
            return None;
        }
        let min = voltages.iter().copied().fold(f32::INFINITY, f32::min);
        let max = voltages.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mean = voltages.iter().map(|&v| v as f64).sum::<f64>() / voltages.len() as f64;
        Some(Self {
            min,
            max,
            mean: mean as f32,
        })
    }
}
