use async_trait::async_trait;

use super::{ImageInput, VisionProvider};
use crate::error::ProviderError;

const CANNED_REPLY: &str = "\
**Vehicle Identification**
Make: Maruti Suzuki
Model: Swift
Year: 2019
Trim: VXi
Identification confidence: 85%

**Damage Assessment**
Damage Type: Dent
Severity: Moderate
Damage confidence: 80%
Description: Medium dent on the front left door with minor paint transfer.

**Repair Cost Estimate**
Conservative: ₹12,000
Comprehensive: ₹18,500

```json
{\"regions\": [{\"id\": \"region_1\", \"x\": 22, \"y\": 38, \"width\": 18, \"height\": 14,
  \"damageType\": \"Dent\", \"severity\": \"moderate\", \"confidence\": 0.8}]}
```
";

#[derive(Debug, Clone)]
enum Behavior {
    Reply(String),
    QuotaExceeded,
    Fail(String),
}

/// Offline provider for development and tests.
#[derive(Debug, Clone)]
pub struct MockProvider {
    behavior: Behavior,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Always answers with a fixed, fully labelled damage report.
    #[must_use]
    pub fn new() -> Self {
        Self::with_reply(CANNED_REPLY)
    }

    #[must_use]
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::Reply(reply.into()),
        }
    }

    #[must_use]
    pub fn quota_exhausted() -> Self {
        Self {
            behavior: Behavior::QuotaExceeded,
        }
    }

    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::Fail(message.into()),
        }
    }
}

#[async_trait]
impl VisionProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(&self, _prompt: &str, _image: ImageInput<'_>) -> Result<String, ProviderError> {
        match &self.behavior {
            Behavior::Reply(text) => Ok(text.clone()),
            Behavior::QuotaExceeded => Err(ProviderError::QuotaExceeded(
                "mock provider configured as exhausted".to_string(),
            )),
            Behavior::Fail(message) => Err(ProviderError::Upstream {
                status: Some(500),
                message: message.clone(),
            }),
        }
    }
}
