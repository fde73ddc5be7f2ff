#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderError {
	OutOfRange { index: usize, len: usize },
}
impl std::fmt::Display for ReorderError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::OutOfRange { index, len } =>
				write!(f, "Index {index} is out of range for a list of {len} items."),
		}
	}
}

/// Moves the element at `from` so that it ends up at `to`, shifting the elements in between by
/// one. Both indices address the list as it is before the move.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<(), ReorderError> {
	let len = items.len();

	for index in [from, to] {
		if index >= len {
			return Err(ReorderError::OutOfRange { index, len });
		}
	}

	if from == to {
		return Ok(());
	}

	let item = items.remove(from);

	items.insert(to, item);

	Ok(())
}
