//! Course view payloads returned by `/sws/rest/enrolment/course/view`.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Query parameter value for the undergraduate program post used by course lookups.
pub const DEFAULT_POST_CODE: &str = "ASCRSHBSC";

/// Teaching method of a course meeting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TeachMethod {
	Lecture,
	Tutorial,
	Practical,
	Other(String),
}

impl TeachMethod {
	pub fn as_str(&self) -> &str {
		match self {
			Self::Lecture => "LEC",
			Self::Tutorial => "TUT",
			Self::Practical => "PRA",
			Self::Other(code) => code,
		}
	}
}

impl Default for TeachMethod {
	fn default() -> Self {
		Self::Other(String::new())
	}
}

impl From<String> for TeachMethod {
	fn from(code: String) -> Self {
		match code.as_str() {
			"LEC" => Self::Lecture,
			"TUT" => Self::Tutorial,
			"PRA" => Self::Practical,
			_ => Self::Other(code),
		}
	}
}

impl From<TeachMethod> for String {
	fn from(method: TeachMethod) -> Self {
		method.as_str().to_string()
	}
}

impl fmt::Display for TeachMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Top-level envelope of a course view response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseViewResponse {
	#[serde(default)]
	pub messages: Option<Messages>,
	#[serde(default)]
	pub response_object: Option<CourseView>,
}

impl CourseViewResponse {
	/// Application-level errors reported by the service, rendered as text.
	pub fn errors(&self) -> Vec<String> {
		self.messages
			.as_ref()
			.map(|m| m.errors.iter().map(render_message).collect())
			.unwrap_or_default()
	}

	/// Section meetings, if the payload carries any meeting data.
	pub fn meetings(&self) -> Option<&[Meeting]> {
		self.response_object.as_ref()?.meetings.as_deref()
	}
}

fn render_message(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		Value::Object(map) => map
			.get("message")
			.and_then(Value::as_str)
			.map(str::to_string)
			.unwrap_or_else(|| value.to_string()),
		other => other.to_string(),
	}
}

/// Message lists attached to a response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Messages {
	#[serde(default)]
	pub errors: Vec<Value>,
	#[serde(default)]
	pub warnings: Vec<Value>,
}

/// Course body of a view response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseView {
	#[serde(default)]
	pub code: Option<String>,
	#[serde(default)]
	pub meetings: Option<Vec<Meeting>>,
}

/// A single section meeting with its capacity figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
	#[serde(default, deserialize_with = "null_as_default")]
	pub teach_method: TeachMethod,
	#[serde(default, deserialize_with = "null_as_default")]
	pub section_no: String,
	#[serde(default, deserialize_with = "null_as_default")]
	pub display_name: String,
	#[serde(default, deserialize_with = "null_as_default")]
	pub enrollment_space_available: i64,
	#[serde(default, deserialize_with = "null_as_default")]
	pub total_space: i64,
}

/// Reads an explicit `null` as the field's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
	use super::*;

	const SAMPLE: &str = r#"{
  "messages": {"errors": [], "warnings": []},
  "responseObject": {
    "code": "CSC108H1",
    "meetings": [
      {"teachMethod": "LEC", "sectionNo": "0101", "displayName": "LEC0101", "enrollmentSpaceAvailable": 0, "totalSpace": 200},
      {"teachMethod": "TUT", "sectionNo": "0201", "displayName": "TUT0201", "enrollmentSpaceAvailable": 4, "totalSpace": 30, "extra": true},
      {"teachMethod": "SEM", "sectionNo": "0001"}
    ]
  }
}"#;

	#[test]
	fn parses_meetings_and_ignores_unknown_fields() {
		let response: CourseViewResponse = serde_json::from_str(SAMPLE).unwrap();
		let meetings = response.meetings().unwrap();

		assert_eq!(meetings.len(), 3);
		assert_eq!(meetings[0].teach_method, TeachMethod::Lecture);
		assert_eq!(meetings[1].enrollment_space_available, 4);
		assert_eq!(meetings[2].teach_method, TeachMethod::Other("SEM".into()));
		assert_eq!(meetings[2].total_space, 0);
		assert!(response.errors().is_empty());
	}

	#[test]
	fn null_fields_read_as_defaults() {
		let meeting: Meeting = serde_json::from_str(
			r#"{"teachMethod": "PRA", "sectionNo": "0001", "displayName": null, "enrollmentSpaceAvailable": null, "totalSpace": null}"#,
		)
		.unwrap();
		assert_eq!(meeting.teach_method, TeachMethod::Practical);
		assert_eq!(meeting.display_name, "");
		assert_eq!(meeting.enrollment_space_available, 0);
		assert_eq!(meeting.total_space, 0);

		let meeting: Meeting = serde_json::from_str(r#"{"teachMethod": null, "sectionNo": null}"#).unwrap();
		assert_eq!(meeting.teach_method, TeachMethod::Other(String::new()));
		assert_eq!(meeting.section_no, "");
	}

	#[test]
	fn renders_string_and_object_errors() {
		let response: CourseViewResponse =
			serde_json::from_str(r#"{"messages":{"errors":["Course not offered",{"code":"E1","message":"Closed"}]}}"#).unwrap();

		assert_eq!(response.errors(), vec!["Course not offered".to_string(), "Closed".to_string()]);
		assert!(response.meetings().is_none());
	}

	#[test]
	fn teach_method_round_trips_as_code() {
		assert_eq!(serde_json::to_string(&TeachMethod::Tutorial).unwrap(), r#""TUT""#);
		assert_eq!(TeachMethod::Practical.to_string(), "PRA");
	}
}
