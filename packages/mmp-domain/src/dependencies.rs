use std::collections::{HashMap, HashSet, VecDeque};

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyError {
	SelfDependency { action_item_id: Uuid },
	/// The target is not one of the meeting's action items.
	ForeignItem { action_item_id: Uuid },
	Cycle,
}
impl std::fmt::Display for DependencyError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::SelfDependency { action_item_id } =>
				write!(f, "Action item {action_item_id} cannot depend on itself."),
			Self::ForeignItem { action_item_id } =>
				write!(f, "Action item {action_item_id} does not belong to this meeting."),
			Self::Cycle => f.write_str("Action item dependencies must not form a cycle."),
		}
	}
}

/// Checks `(item, depends_on)` edges against the meeting's action items: both ends must be
/// known, no item may depend on itself, and the graph must be acyclic.
pub fn validate(items: &[Uuid], edges: &[(Uuid, Uuid)]) -> Result<(), DependencyError> {
	let known: HashSet<Uuid> = items.iter().copied().collect();
	let mut indegree: HashMap<Uuid, usize> = known.iter().map(|id| (*id, 0)).collect();
	let mut outgoing: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
	let mut unique = HashSet::new();

	for &(item, depends_on) in edges {
		for id in [item, depends_on] {
			if !known.contains(&id) {
				return Err(DependencyError::ForeignItem { action_item_id: id });
			}
		}

		if item == depends_on {
			return Err(DependencyError::SelfDependency { action_item_id: item });
		}
		if !unique.insert((item, depends_on)) {
			continue;
		}

		outgoing.entry(depends_on).or_default().push(item);
		*indegree.entry(item).or_default() += 1;
	}

	let mut ready: VecDeque<Uuid> =
		indegree.iter().filter(|(_, degree)| **degree == 0).map(|(id, _)| *id).collect();
	let mut visited = 0;

	while let Some(id) = ready.pop_front() {
		visited += 1;

		for next in outgoing.get(&id).into_iter().flatten() {
			if let Some(degree) = indegree.get_mut(next) {
				*degree -= 1;

				if *degree == 0 {
					ready.push_back(*next);
				}
			}
		}
	}

	if visited == known.len() { Ok(()) } else { Err(DependencyError::Cycle) }
}
