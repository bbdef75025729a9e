use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupChange {
    Created { name: String },
    Updated { name: String },
    Renamed { from: String, to: String },
    Removed { name: String },
    Imported { name: String },
    MembersErased { addon_ids: Vec<String> },
}

#[async_trait]
pub trait GroupEventPublisher: Send + Sync {
    async fn publish(&self, change: &GroupChange) -> anyhow::Result<()>;
}
