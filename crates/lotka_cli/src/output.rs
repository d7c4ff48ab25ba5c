use lotka_core::analysis::{extrema, invariant_drift, peak_lag, spectral_period};
use lotka_core::equilibrium::{linearize, linearized_period};
use lotka_core::harvest::HarvestRun;
use lotka_core::sweep::{OrbitRun, SweepRun};
use lotka_core::trajectory::Sample;
use lotka_core::{
    approximate_period, equilibrium, is_biologically_valid, Termination, Trajectory,
};

pub const SWEEP_HEADER: &str = "value,prey_eq,predator_eq,period,valid,status";
pub const ORBIT_HEADER: &str = "prey0,predator0,invariant,period,valid,status";

fn render_samples(samples: &[Sample]) -> String {
    let mut csv = String::from("time,prey,predator\n");
    for sample in samples {
        csv.push_str(&format!(
            "{},{},{}\n",
            sample.time, sample.state.prey, sample.state.predator
        ));
    }
    csv
}

pub fn render_csv(trajectory: &Trajectory) -> String {
    render_samples(trajectory.samples())
}

/// Both harvest segments on one time axis; the harvest time appears twice.
pub fn render_harvest_csv(run: &HarvestRun) -> String {
    render_samples(&run.samples())
}

fn describe_termination(termination: Termination) -> String {
    match termination {
        Termination::Completed => "completed".to_string(),
        Termination::Truncated { reason, time } => format!("truncated ({reason:?} at t = {time})"),
    }
}

fn describe_optional(value: Option<f64>) -> String {
    value.map_or_else(|| "undefined".to_string(), |v| format!("{v:.4}"))
}

fn status(trajectory: &Trajectory) -> &'static str {
    if trajectory.is_truncated() {
        "truncated"
    } else {
        "completed"
    }
}

pub fn render_summary(trajectory: &Trajectory) -> String {
    let parameters = trajectory.parameters();
    let mut text = String::new();

    text.push_str(&format!("samples:            {}\n", trajectory.len()));
    text.push_str(&format!(
        "status:             {}\n",
        describe_termination(trajectory.termination())
    ));
    if let Ok(point) = equilibrium(parameters) {
        let linear = linearize(point, parameters);
        text.push_str(&format!(
            "equilibrium:        prey = {:.4}, predator = {:.4} ({:?})\n",
            point.prey, point.predator, linear.kind
        ));
    }
    if let Ok(period) = linearized_period(parameters) {
        text.push_str(&format!("linearized period:  {period:.4}\n"));
    }
    text.push_str(&format!(
        "period (crossings): {}\n",
        describe_optional(approximate_period(trajectory))
    ));
    text.push_str(&format!(
        "period (spectral):  {}\n",
        describe_optional(spectral_period(trajectory))
    ));
    text.push_str(&format!(
        "peak lag:           {}\n",
        describe_optional(peak_lag(trajectory))
    ));
    text.push_str(&format!(
        "biologically valid: {}\n",
        is_biologically_valid(trajectory)
    ));
    match invariant_drift(trajectory) {
        Ok(drift) => text.push_str(&format!("invariant drift:    {drift:.3e}\n")),
        Err(err) => text.push_str(&format!("invariant drift:    n/a ({err})\n")),
    }
    if let Some(range) = extrema(trajectory) {
        text.push_str(&format!(
            "prey range:         [{:.4}, {:.4}]\n",
            range.prey_min, range.prey_max
        ));
        text.push_str(&format!(
            "predator range:     [{:.4}, {:.4}]\n",
            range.predator_min, range.predator_max
        ));
    }
    text
}

pub fn render_harvest_summary(run: &HarvestRun) -> String {
    let mut text = format!(
        "harvest at t = {}: prey x {}, predators x {}\n",
        run.harvest.time, run.harvest.prey_factor, run.harvest.predator_factor
    );
    match (run.pre_harvest_state(), run.restart_state()) {
        (Some(before), Some(after)) => {
            text.push_str(&format!(
                "populations:        ({:.4}, {:.4}) -> ({:.4}, {:.4})\n",
                before.prey, before.predator, after.prey, after.predator
            ));
        }
        _ => text.push_str(&format!(
            "first segment:      {}\n",
            describe_termination(run.before.termination())
        )),
    }
    match run.invariant_shift() {
        Some(Ok(shift)) => text.push_str(&format!("invariant shift:    {shift:.4}\n")),
        Some(Err(err)) => text.push_str(&format!("invariant shift:    n/a ({err})\n")),
        None => {}
    }
    if let Some(after) = &run.after {
        text.push_str(&format!(
            "period after:       {}\n",
            describe_optional(approximate_period(after))
        ));
    }
    text.push_str(&format!(
        "period undisturbed: {}\n",
        describe_optional(approximate_period(&run.reference))
    ));
    text
}

pub fn sweep_row(run: &SweepRun) -> String {
    format!(
        "{},{},{},{},{},{}",
        run.value,
        run.equilibrium.prey,
        run.equilibrium.predator,
        run.period.map_or_else(String::new, |p| p.to_string()),
        is_biologically_valid(&run.trajectory),
        status(&run.trajectory)
    )
}

pub fn orbit_row(run: &OrbitRun) -> String {
    format!(
        "{},{},{},{},{},{}",
        run.initial.prey,
        run.initial.predator,
        run.invariant.map_or_else(String::new, |h| h.to_string()),
        run.period.map_or_else(String::new, |p| p.to_string()),
        is_biologically_valid(&run.trajectory),
        status(&run.trajectory)
    )
}
