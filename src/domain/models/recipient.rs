use serde::{Deserialize, Serialize};

use crate::domain::value_objects::RecipientId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipient {
    pub id: RecipientId,
    pub name: String,
    pub bot: bool,
}

impl Recipient {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: RecipientId(id),
            name: name.into(),
            bot: false,
        }
    }

    /// Automated accounts never receive a blast.
    pub fn is_reachable(&self) -> bool {
        !self.bot
    }
}
