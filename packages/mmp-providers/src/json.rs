//! Pulls a JSON document out of model text, which often arrives wrapped in prose or a markdown
//! code fence.

use serde_json::Value;

use crate::{Error, Result};

pub fn extract_json(content: &str) -> Result<Value> {
	let trimmed = content.trim();

	if let Ok(value) = serde_json::from_str(trimmed) {
		return Ok(value);
	}
	if let Some(fenced) = fenced_block(trimmed)
		&& let Ok(value) = serde_json::from_str(fenced)
	{
		return Ok(value);
	}

	for (open, close) in [('{', '}'), ('[', ']')] {
		if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close))
			&& start < end
			&& let Ok(value) = serde_json::from_str(&trimmed[start..=end])
		{
			return Ok(value);
		}
	}

	Err(Error::InvalidResponse { message: "Model content does not contain valid JSON.".to_string() })
}

fn fenced_block(content: &str) -> Option<&str> {
	let start = content.find("```")?;
	let after_fence = &content[start + 3..];
	let body_start = after_fence.find('\n')? + 1;
	let body = &after_fence[body_start..];
	let end = body.find("```")?;

	Some(body[..end].trim())
}
