use crate::component::Component;
use crate::errors::ValidationError;
use std::collections::BTreeSet;

/*
 * SkipSet holds the components the user asked us not to install. It can
 * only be built through validate(), so every member is a known component.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipSet {
    components: BTreeSet<Component>,
}

impl SkipSet {

    /*
     * Validates the raw --skip values in order, failing on the first one
     * that isn't part of the component vocabulary.
     */
    pub fn validate<S: AsRef<str>>(requested: &[S]) -> Result<SkipSet, ValidationError> {
	let mut components = BTreeSet::new();

	for name in requested {
	    let name = name.as_ref();
	    match name.parse::<Component>() {
		Ok(component) => { components.insert(component); },
		Err(_) => return Err(ValidationError::InvalidSkip(name.to_string())),
	    }
	}

	Ok(SkipSet{ components })
    }

    pub fn contains(&self, component: Component) -> bool {
	self.components.contains(&component)
    }
}
