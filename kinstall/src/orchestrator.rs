use kinstall_api::Component;
use kinstall_api::Installer;
use kinstall_api::ObservabilityEnabler;
use kinstall_api::SkipSet;

use crate::errors::OrchestratorError;

use std::fmt;

/*
 * What a failed step means for the rest of the run: networking failures
 * are logged and the run carries on, the other components stop it.
 */
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FailurePolicy {
    ContinueOnError,
    AbortOnError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    Skipped,
    Failed(String),
}

impl fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
	match self {
	    InstallOutcome::Installed => f.write_str("installed"),
	    InstallOutcome::Skipped => f.write_str("skipped"),
	    InstallOutcome::Failed(reason) => write!(f, "failed: {}", reason),
	}
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub steps: Vec<(Component, InstallOutcome)>,

    /* None when the overlay was never attempted */
    pub observability: Option<InstallOutcome>,
}

impl InstallReport {

    pub fn outcome(&self, component: Component) -> Option<&InstallOutcome> {
	self.steps.iter()
	    .find(|(c, _)| *c == component)
	    .map(|(_, outcome)| outcome)
    }

    pub fn log_summary(&self) {
	for (component, outcome) in &self.steps {
	    log::info!("{:<18} {}", component.to_string(), outcome);
	}
	if let Some(outcome) = &self.observability {
	    log::info!("{:<18} {}", "observability", outcome);
	}
    }
}

pub struct Step {
    installer: Box<dyn Installer>,
    policy: FailurePolicy,
    rollback_on_failure: bool,
    follow_up: Option<Box<dyn ObservabilityEnabler>>,
}

impl Step {

    pub fn new(installer: Box<dyn Installer>, policy: FailurePolicy) -> Self {
	Self{
	    installer,
	    policy,
	    rollback_on_failure: false,
	    follow_up: None,
	}
    }

    pub fn with_rollback(mut self) -> Self {
	self.rollback_on_failure = true;
	self
    }

    /* runs only after a successful install; its failure is only logged */
    pub fn with_follow_up(mut self, follow_up: Box<dyn ObservabilityEnabler>) -> Self {
	self.follow_up = Some(follow_up);
	self
    }

    pub fn component(&self) -> Component {
	self.installer.component()
    }

    pub fn policy(&self) -> FailurePolicy {
	self.policy
    }
}

/*
 * Orchestrator walks its step table in order, one installer at a time.
 * There are no retries; only the networking step rolls itself back.
 */
pub struct Orchestrator {
    steps: Vec<Step>,
}

impl Orchestrator {

    pub fn new(steps: Vec<Step>) -> Self {
	Self{ steps }
    }

    /* The fixed networking -> security agent -> discovery engine table */
    pub fn standard(networking: Box<dyn Installer>,
		    observability: Box<dyn ObservabilityEnabler>,
		    security_agent: Box<dyn Installer>,
		    discovery_engine: Box<dyn Installer>) -> Self {
	Self::new(vec![
	    Step::new(networking, FailurePolicy::ContinueOnError)
		.with_rollback()
		.with_follow_up(observability),
	    Step::new(security_agent, FailurePolicy::AbortOnError),
	    Step::new(discovery_engine, FailurePolicy::AbortOnError),
	])
    }

    pub fn steps(&self) -> &[Step] {
	&self.steps
    }

    pub async fn run(&self, skip: &SkipSet) -> Result<InstallReport, OrchestratorError> {
	let mut report = InstallReport::default();

	for step in &self.steps {
	    let component = step.component();

	    if skip.contains(component) {
		log::warn!("Skipping {} installation", component);
		report.steps.push((component, InstallOutcome::Skipped));
		continue;
	    }

	    log::info!("Installing {} ...", component);
	    if let Err(err) = step.installer.install().await {
		if step.policy == FailurePolicy::AbortOnError {
		    return Err(OrchestratorError::Installer{ component, source: err });
		}

		if step.rollback_on_failure {
		    if let Err(rollback_err) = step.installer.rollback_installation().await {
			log::error!("Unable to roll back {}: {}", component, rollback_err);
		    }
		}
		log::error!("Unable to install {}: {}", component, err);
		report.steps.push((component, InstallOutcome::Failed(err.to_string())));
		continue;
	    }
	    report.steps.push((component, InstallOutcome::Installed));

	    if let Some(follow_up) = &step.follow_up {
		let outcome = match follow_up.enable().await {
		    Ok(()) => InstallOutcome::Installed,
		    Err(err) => {
			log::error!("Unable to enable observability: {}", err);
			InstallOutcome::Failed(err.to_string())
		    }
		};
		report.observability = Some(outcome);
	    }
	}

	Ok(report)
    }
}
