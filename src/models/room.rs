use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    #[serde(alias = "_id")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub cinema_id: Option<i64>,
    #[serde(default)]
    pub capacity: Option<u32>,
}
