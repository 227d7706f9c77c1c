use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnbindStatus {
    Pending,
    Cancelled,
    Completed,
}

impl UnbindStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnbindStatus::Pending => "pending",
            UnbindStatus::Cancelled => "cancelled",
            UnbindStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(UnbindStatus::Pending),
            "cancelled" => Some(UnbindStatus::Cancelled),
            "completed" => Some(UnbindStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnbindRequest {
    pub id: String,
    pub space_id: String,
    pub requested_by: String,
    pub requested_at: String,
    pub expires_at: String,
    pub status: UnbindStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in [
            UnbindStatus::Pending,
            UnbindStatus::Cancelled,
            UnbindStatus::Completed,
        ] {
            assert_eq!(UnbindStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(UnbindStatus::parse("expired"), None);
    }
}
