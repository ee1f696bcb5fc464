//! `play`: mount a scheduler and render it to the terminal.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;

use crate::cli::args::PlayArgs;
use crate::cli::commands::{Shutdown, resolve_config};
use crate::error::SequencerError;
use crate::fortune::FortuneResult;
use crate::observability::{Event, EventEmitter, StopReason, init_metrics};
use crate::phase::{PhaseScheduler, SchedulerSnapshot};
use crate::presentation::{FortuneTone, PresentationBinder, StatusMessages, Visibility, animation_title};

/// Plays the sequence until every requested run completes or shutdown is
/// requested.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, the events file
/// cannot be created, or the metrics endpoint cannot be started.
pub async fn run(args: &PlayArgs, quiet: bool, shutdown: &Shutdown) -> Result<(), SequencerError> {
    if let Some(port) = args.metrics_port {
        init_metrics(Some(port))?;
        tracing::info!(port, "Prometheus metrics endpoint started");
    }

    let mut config = resolve_config(args.config.as_deref(), args.preset)?;
    if args.reduced_motion {
        config.reduced_motion = true;
    }

    let events_to_stdout = args.events.as_deref() == Some(Path::new("-"));
    let emitter = Arc::new(match args.events.as_deref() {
        None => EventEmitter::noop(),
        Some(_) if events_to_stdout => EventEmitter::stdout(),
        Some(path) => EventEmitter::from_file(path)?,
    });
    let render = !quiet && !events_to_stdout;

    let fortune = FortuneResult::new(args.magnitude, args.label.clone());
    let view = View {
        binder: config.binder(),
        messages: config.status_messages.clone(),
        magnitude: fortune.magnitude,
    };

    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let options = config
        .scheduler_options()
        .on_phase_change({
            let emitter = Arc::clone(&emitter);
            move |phase| {
                emitter.emit(Event::PhaseEntered {
                    timestamp: Utc::now(),
                    phase,
                    phase_index: phase.index(),
                });
            }
        })
        .on_complete(move || {
            let _ = done_tx.send(());
        });

    if render {
        println!("{}", animation_title(&args.omikuji_type));
    }

    let scheduler = PhaseScheduler::new(config.table.clone(), options)?;
    emitter.emit(Event::SequenceStarted {
        timestamp: Utc::now(),
        generation: scheduler.generation(),
        total_ms: millis(scheduler.table().total_duration()),
        reduced_motion: config.reduced_motion,
    });

    let mut updates = WatchStream::new(scheduler.subscribe());
    let mut last: Option<SchedulerSnapshot> = None;
    let mut completed_runs: u64 = 0;

    let reason = loop {
        tokio::select! {
            biased;

            reason = shutdown.triggered() => break reason,
            Some(snapshot) = updates.next() => {
                if let Some(prev) = last {
                    if snapshot.message_index > prev.message_index {
                        emitter.emit(Event::MessageAdvanced {
                            timestamp: Utc::now(),
                            message_index: snapshot.message_index,
                            message: view.messages.message_at(snapshot.message_index).map(str::to_owned),
                        });
                    }
                }
                if render && view.is_visible_change(last, snapshot) {
                    println!("{}", view.status_line(snapshot));
                }
                last = Some(snapshot);
            }
            Some(()) = done_rx.recv() => {
                completed_runs += 1;
                emitter.emit(Event::SequenceCompleted {
                    timestamp: Utc::now(),
                    generation: scheduler.generation(),
                    reduced_motion: config.reduced_motion && completed_runs == 1,
                });
                if render {
                    println!("{}", view.result_line(&fortune));
                }
                if completed_runs > u64::from(args.replay) {
                    break StopReason::Completed;
                }
                scheduler.restart();
                emitter.emit(Event::SequenceRestarted {
                    timestamp: Utc::now(),
                    generation: scheduler.generation(),
                });
            }
        }
    };

    scheduler.shutdown();
    emitter.emit(Event::SequenceStopped {
        timestamp: Utc::now(),
        reason,
        completed_runs,
    });
    tracing::info!(?reason, completed_runs, "playback stopped");
    Ok(())
}

fn millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Terminal rendering of scheduler snapshots.
struct View {
    binder: PresentationBinder,
    messages: StatusMessages,
    magnitude: i32,
}

impl View {
    /// Returns `true` if the phase or the clamped message text changed.
    fn is_visible_change(&self, last: Option<SchedulerSnapshot>, next: SchedulerSnapshot) -> bool {
        last.is_none_or(|prev| {
            prev.phase != next.phase
                || self.messages.message_at(prev.message_index)
                    != self.messages.message_at(next.message_index)
        })
    }

    fn status_line(&self, snapshot: SchedulerSnapshot) -> String {
        let visibility = self.binder.bind(snapshot.phase, self.magnitude);
        let message = self
            .messages
            .message_at(snapshot.message_index)
            .unwrap_or_default();
        format!(
            "[{:<15}] {:<28} | {}",
            snapshot.phase.as_str(),
            message,
            elements(&visibility).join(" ")
        )
    }

    fn result_line(&self, fortune: &FortuneResult) -> String {
        match fortune.tone(self.binder.thresholds()) {
            FortuneTone::ExceptionallyGood => format!("*** {fortune} ***"),
            FortuneTone::ExceptionallyBad => format!("!!! {fortune} !!!"),
            FortuneTone::Ordinary => fortune.to_string(),
        }
    }
}

/// Names of the visible decorative elements.
fn elements(visibility: &Visibility) -> Vec<&'static str> {
    let mut out = Vec::new();
    if visibility.gate {
        out.push("gate");
    }
    if visibility.path_background {
        out.push("path");
    }
    if visibility.container {
        out.push(if visibility.container_shaking {
            "container(shaking)"
        } else {
            "container"
        });
    }
    if visibility.stick {
        out.push("stick");
    }
    if visibility.special_effects {
        out.push(match visibility.tone {
            FortuneTone::ExceptionallyBad => "effects(bad)",
            _ => "effects(good)",
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::Phase;

    fn view(magnitude: i32) -> View {
        View {
            binder: PresentationBinder::default(),
            messages: StatusMessages::default(),
            magnitude,
        }
    }

    fn snapshot(phase: Phase, message_index: usize) -> SchedulerSnapshot {
        SchedulerSnapshot {
            phase,
            is_complete: false,
            message_index,
        }
    }

    #[test]
    fn test_status_line_lists_elements() {
        let line = view(0).status_line(snapshot(Phase::ContainerShake, 1));
        assert!(line.starts_with("[container-shake"));
        assert!(line.contains("Pulling karma-repo..."));
        assert!(line.ends_with("path container(shaking)"));
    }

    #[test]
    fn test_status_line_effects_at_reveal() {
        let line = view(4).status_line(snapshot(Phase::Reveal, 50));
        assert!(line.contains("Deployment Successful."));
        assert!(line.ends_with("container stick effects(good)"));

        let line = view(-2).status_line(snapshot(Phase::Reveal, 0));
        assert!(line.ends_with("effects(bad)"));
    }

    #[test]
    fn test_clamped_message_is_not_a_visible_change() {
        let v = view(0);
        assert!(v.is_visible_change(None, snapshot(Phase::GatePass, 0)));
        assert!(v.is_visible_change(
            Some(snapshot(Phase::GatePass, 0)),
            snapshot(Phase::GatePass, 1)
        ));
        assert!(!v.is_visible_change(
            Some(snapshot(Phase::Reveal, 7)),
            snapshot(Phase::Reveal, 8)
        ));
    }

    #[test]
    fn test_result_line_marks_exceptional_fortunes() {
        let v = view(0);
        assert_eq!(v.result_line(&FortuneResult::new(4, "大吉")), "*** 大吉 (+4) ***");
        assert_eq!(v.result_line(&FortuneResult::new(-2, "大凶")), "!!! 大凶 (-2) !!!");
        assert_eq!(v.result_line(&FortuneResult::new(1, "吉")), "吉 (+1)");
    }
}
