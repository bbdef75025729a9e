use crate::application::services::group_repository::GroupRepositoryError;

#[derive(thiserror::Error, Debug)]
pub enum GroupCommandError {
    #[error("prompt failed")]
    Prompt(#[source] anyhow::Error),
    #[error(transparent)]
    Repository(#[from] GroupRepositoryError),
}
