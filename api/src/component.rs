use std::fmt;
use std::str::FromStr;

/*
 * Component is the closed vocabulary of everything kinstall knows how to
 * install. Both the --skip validation and the orchestrator step table
 * are keyed by it, so the accepted strings live in exactly one place.
 */
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Component {
    /* the CNI agent, plus its observability overlay */
    Networking,

    /* the runtime-security enforcement daemonset */
    SecurityAgent,

    /* the workload discovery deployment */
    DiscoveryEngine,
}

impl Component {

    /* in install order */
    pub const ALL: [Component; 3] = [
	Component::Networking,
	Component::SecurityAgent,
	Component::DiscoveryEngine,
    ];

    pub fn name(&self) -> &'static str {
	match self {
	    Component::Networking => "networking",
	    Component::SecurityAgent => "security-agent",
	    Component::DiscoveryEngine => "discovery-engine",
	}
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
	f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownComponent(pub String);

impl FromStr for Component {
    type Err = UnknownComponent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
	Component::ALL.into_iter()
	    .find(|c| c.name() == s)
	    .ok_or_else(|| UnknownComponent(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
	for component in Component::ALL {
	    assert_eq!(component.name().parse::<Component>(), Ok(component));
	    assert_eq!(component.to_string(), component.name());
	}
    }

    #[test]
    fn legacy_and_mis_cased_names_are_unknown() {
	for name in ["cilium", "kubearmor", "discoveryengine", "Networking", " networking", ""] {
	    assert_eq!(name.parse::<Component>(), Err(UnknownComponent(name.to_string())));
	}
    }

    #[test]
    fn all_is_in_install_order() {
	let names: Vec<&str> = Component::ALL.iter().map(|c| c.name()).collect();
	assert_eq!(names, vec!["networking", "security-agent", "discovery-engine"]);
    }
}
