use std::fmt::{self, Write};

use crate::telemetry::{MetricEvent, TelemetrySnapshot};

use super::state::HttpState;

pub fn render_prometheus_metrics(state: &HttpState, snapshot: &TelemetrySnapshot) -> String {
    PrometheusWriter::new(state, snapshot).render()
}

struct PrometheusWriter<'a> {
    state: &'a HttpState,
    snapshot: &'a TelemetrySnapshot,
    output: String,
    latest_tilt: Option<(f64, f64, usize)>,
    calibrations: u64,
    recomputed_stops: u64,
    caller_stops: u64,
    last_error_code: Option<i32>,
}

impl<'a> PrometheusWriter<'a> {
    fn new(state: &'a HttpState, snapshot: &'a TelemetrySnapshot) -> Self {
        let mut latest_tilt = None;
        let mut calibrations = 0;
        let mut recomputed_stops = 0;
        let mut caller_stops = 0;
        let mut last_error_code = None;

        for event in &snapshot.recent {
            match event {
                MetricEvent::Evaluation { .. } => {}
                MetricEvent::TiltWindow {
                    avg_deg,
                    max_deg,
                    sample_count,
                } => latest_tilt = Some((*avg_deg, *max_deg, *sample_count)),
                MetricEvent::CalibrationActivated { .. } => calibrations += 1,
                MetricEvent::SessionStopped { recomputed, .. } => {
                    if *recomputed {
                        recomputed_stops += 1;
                    } else {
                        caller_stops += 1;
                    }
                }
                MetricEvent::Error { code, .. } => last_error_code = Some(*code),
            }
        }

        Self {
            state,
            snapshot,
            output: String::new(),
            latest_tilt,
            calibrations,
            recomputed_stops,
            caller_stops,
            last_error_code,
        }
    }

    fn render(mut self) -> String {
        self.write_event_counters();
        self.write_uptime();
        self.write_evaluations();
        self.write_tilt_window();
        self.write_recent_activity();
        self.write_error_flag();
        self.output
    }

    fn write_event_counters(&mut self) {
        header(
            &mut self.output,
            "posture_events_total",
            "Total telemetry events emitted",
            "counter",
        );
        line(
            &mut self.output,
            format_args!("posture_events_total {}", self.snapshot.total_events),
        );

        header(
            &mut self.output,
            "posture_events_dropped_total",
            "Telemetry events evicted from history",
            "counter",
        );
        line(
            &mut self.output,
            format_args!(
                "posture_events_dropped_total {}",
                self.snapshot.dropped_events
            ),
        );
    }

    fn write_uptime(&mut self) {
        header(
            &mut self.output,
            "posture_uptime_ms",
            "HTTP server uptime",
            "counter",
        );
        line(
            &mut self.output,
            format_args!("posture_uptime_ms {}", self.state.uptime_ms()),
        );
    }

    fn write_evaluations(&mut self) {
        header(
            &mut self.output,
            "posture_evaluations_total",
            "Posture evaluations by alert level",
            "counter",
        );
        for (level, count) in &self.snapshot.alert_counts {
            let _ = writeln!(
                &mut self.output,
                "posture_evaluations_total{{level=\"{}\"}} {}",
                level, count
            );
        }
    }

    fn write_tilt_window(&mut self) {
        if let Some((avg, max, samples)) = self.latest_tilt {
            header(
                &mut self.output,
                "posture_tilt_avg_deg",
                "Average tilt over the rolling window",
                "gauge",
            );
            line(
                &mut self.output,
                format_args!("posture_tilt_avg_deg {:.4}", avg),
            );

            header(
                &mut self.output,
                "posture_tilt_max_deg",
                "Max tilt over the rolling window",
                "gauge",
            );
            line(
                &mut self.output,
                format_args!("posture_tilt_max_deg {:.4}", max),
            );

            header(
                &mut self.output,
                "posture_tilt_samples",
                "Samples in the rolling tilt window",
                "gauge",
            );
            line(
                &mut self.output,
                format_args!("posture_tilt_samples {}", samples),
            );
        }
    }

    fn write_recent_activity(&mut self) {
        header(
            &mut self.output,
            "posture_recent_calibrations",
            "Calibration activations in telemetry history",
            "gauge",
        );
        line(
            &mut self.output,
            format_args!("posture_recent_calibrations {}", self.calibrations),
        );

        header(
            &mut self.output,
            "posture_recent_session_stops",
            "Session stops in telemetry history by summary source",
            "gauge",
        );
        line(
            &mut self.output,
            format_args!(
                "posture_recent_session_stops{{source=\"samples\"}} {}",
                self.recomputed_stops
            ),
        );
        line(
            &mut self.output,
            format_args!(
                "posture_recent_session_stops{{source=\"caller\"}} {}",
                self.caller_stops
            ),
        );
    }

    fn write_error_flag(&mut self) {
        match self.last_error_code {
            Some(code) => line(
                &mut self.output,
                format_args!("posture_last_error{{code=\"{}\"}} 1", code),
            ),
            None => line(
                &mut self.output,
                format_args!("posture_last_error{{code=\"none\"}} 0"),
            ),
        }
    }
}

fn line(output: &mut String, args: fmt::Arguments<'_>) {
    // Writing into a String cannot fail.
    let _ = output.write_fmt(args);
    output.push('\n');
}

fn header(output: &mut String, name: &str, help: &str, kind: &str) {
    line(output, format_args!("# HELP {} {}", name, help));
    line(output, format_args!("# TYPE {} {}", name, kind));
}
