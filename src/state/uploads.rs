use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Contract,
    Tasks,
}

impl UploadKind {
    pub fn label(self) -> &'static str {
        match self {
            UploadKind::Contract => "DOCX",
            UploadKind::Tasks => "XLSX",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    NotUploaded,
    Uploading,
    Uploaded,
}

/// One upload slot: the in-flight flag plus the last successfully parsed
/// value. Status is derived from the pair so contradictory combinations
/// cannot be represented. A failed retry keeps the previous parsed value.
#[derive(Debug, Clone, Default)]
pub struct UploadSlot {
    uploading: bool,
    parsed: Option<Value>,
}

impl UploadSlot {
    pub fn status(&self) -> UploadStatus {
        if self.uploading {
            UploadStatus::Uploading
        } else if self.parsed.is_some() {
            UploadStatus::Uploaded
        } else {
            UploadStatus::NotUploaded
        }
    }

    pub fn begin(&mut self) {
        self.uploading = true;
    }

    pub fn complete(&mut self, value: Value) {
        self.uploading = false;
        self.parsed = Some(value);
    }

    pub fn fail(&mut self) {
        self.uploading = false;
    }

    pub fn is_uploaded(&self) -> bool {
        !self.uploading && self.parsed.is_some()
    }

    pub fn parsed(&self) -> Option<&Value> {
        self.parsed.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_follows_lifecycle() {
        let mut slot = UploadSlot::default();
        assert_eq!(slot.status(), UploadStatus::NotUploaded);

        slot.begin();
        assert_eq!(slot.status(), UploadStatus::Uploading);
        assert!(!slot.is_uploaded());

        slot.complete(json!({"content": []}));
        assert_eq!(slot.status(), UploadStatus::Uploaded);
        assert!(slot.is_uploaded());
    }

    #[test]
    fn test_failed_retry_keeps_previous_value() {
        let mut slot = UploadSlot::default();
        slot.begin();
        slot.complete(json!({"content": "v1"}));

        slot.begin();
        slot.fail();
        assert_eq!(slot.status(), UploadStatus::Uploaded);
        assert_eq!(slot.parsed(), Some(&json!({"content": "v1"})));
    }

    #[test]
    fn test_first_failure_leaves_slot_empty() {
        let mut slot = UploadSlot::default();
        slot.begin();
        slot.fail();
        assert_eq!(slot.status(), UploadStatus::NotUploaded);
        assert!(slot.parsed().is_none());
    }
}
