use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: u64,

    pub text: String,

    #[serde(default)]
    pub completed: bool,

    /// Originating user for remotely seeded tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<u64>,
}

impl Task {
    pub fn new_pending(id: u64, text: String) -> Self {
        Self {
            id,
            text,
            completed: false,
            owner: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_tasks_have_no_owner_in_json() {
        let task = Task::new_pending(7, "Buy milk".to_string());
        let json = serde_json::to_string(&task).expect("serialize");
        assert_eq!(json, r#"{"id":7,"text":"Buy milk","completed":false}"#);
    }

    #[test]
    fn completed_defaults_to_false_when_missing() {
        let task: Task = serde_json::from_str(r#"{"id":1,"text":"A"}"#).expect("deserialize");
        assert!(!task.completed);
        assert_eq!(task.owner, None);
    }
}
