use std::time::{Duration, Instant};
use std::collections::HashMap;

use tracing::debug;

#[derive(Debug, Clone)]
pub struct StepTiming {
    pub name: String,
    pub duration: Duration,
}

/// Accumulated durations of the processing stages of a frame (or of a whole replay).
#[derive(Debug, Clone, Default)]
pub struct StageTimings {
    steps: Vec<StepTiming>,
    step_map: HashMap<String, Duration>,
}

impl StageTimings {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            step_map: HashMap::new(),
        }
    }

    pub fn add_step(&mut self, name: impl Into<String>, duration: Duration) {
        let name = name.into();
        self.steps.push(StepTiming {
            name: name.clone(),
            duration,
        });
        *self.step_map.entry(name).or_insert(Duration::ZERO) += duration;
    }

    /// Folds every step of `other` into this one.
    pub fn merge(&mut self, other: &StageTimings) {
        for step in &other.steps {
            self.add_step(step.name.clone(), step.duration);
        }
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }

    pub fn get_step(&self, name: &str) -> Option<Duration> {
        self.step_map.get(name).copied()
    }

    pub fn steps(&self) -> &[StepTiming] {
        &self.steps
    }

    /// One line per distinct stage, with its share of the total.
    pub fn summary_lines(&self) -> Vec<String> {
        let total = self.total_duration();
        let mut names: Vec<&String> = self.step_map.keys().collect();
        names.sort();

        let mut lines: Vec<String> = names
            .into_iter()
            .map(|name| {
                let duration = self.step_map[name];
                let percentage = if total.as_secs_f64() > 0.0 {
                    (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
                } else {
                    0.0
                };
                format!(
                    "{:<30} {:>12.3}ms ({:>5.1}%)",
                    name,
                    duration.as_secs_f64() * 1000.0,
                    percentage
                )
            })
            .collect();
        lines.push(format!("{:<30} {:>12.3}ms", "Total", total.as_secs_f64() * 1000.0));
        lines
    }

    pub fn log_summary(&self) {
        for line in self.summary_lines() {
            debug!("{}", line);
        }
    }
}

pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    pub fn stop(self) -> (String, Duration) {
        (self.name, self.start.elapsed())
    }
}
